#![allow(clippy::unwrap_used)]
// Integration tests for the generic forwarding pipeline using wiremock.

use std::time::Duration;

use bytes::Bytes;
use indexmap::IndexMap;
use pretty_assertions::assert_eq;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use boardwalk_api::{
    Error, ProxyRequest, ResponseBody, ThingsBoardClient, TransportConfig, collapse_query,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, ThingsBoardClient) {
    let server = MockServer::start().await;
    let client = ThingsBoardClient::with_client(reqwest::Client::new(), Some(server.uri()), None);
    (server, client)
}

fn get_request(client: &ThingsBoardClient, upstream_path: &str) -> ProxyRequest {
    client
        .translate(
            "GET",
            upstream_path,
            IndexMap::new(),
            &HeaderMap::new(),
            &Bytes::new(),
        )
        .unwrap()
}

// ── Response relay ──────────────────────────────────────────────────

#[tokio::test]
async fn test_forward_relays_success_json() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/auth/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": {"id": "u-1", "entityType": "USER"},
            "email": "tenant@example.com"
        })))
        .mount(&server)
        .await;

    let relayed = client.forward(get_request(&client, "api/auth/user")).await.unwrap();

    assert_eq!(relayed.status.as_u16(), 200);
    match relayed.body {
        ResponseBody::Json(ref body) => assert_eq!(body["email"], "tenant@example.com"),
        ref other => panic!("expected JSON body, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_forward_relays_error_status_verbatim() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/device/nope"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "status": 404,
            "message": "Requested item wasn't found!"
        })))
        .mount(&server)
        .await;

    let relayed = client.forward(get_request(&client, "api/device/nope")).await.unwrap();

    assert_eq!(relayed.status.as_u16(), 404);
    match relayed.body {
        ResponseBody::Json(ref body) => {
            assert_eq!(body["message"], "Requested item wasn't found!");
        }
        ref other => panic!("expected JSON body, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_forward_strips_framing_headers() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/ping"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("pong")
                .insert_header("x-upstream-build", "3.6.4"),
        )
        .mount(&server)
        .await;

    let relayed = client.forward(get_request(&client, "api/ping")).await.unwrap();

    assert!(relayed.headers.get("content-length").is_none());
    assert!(relayed.headers.get("transfer-encoding").is_none());
    assert_eq!(
        relayed.headers.get("x-upstream-build").unwrap().to_str().unwrap(),
        "3.6.4"
    );
    assert!(matches!(relayed.body, ResponseBody::Text(ref text) if text == "pong"));
}

#[tokio::test]
async fn test_forward_falls_back_to_text_for_invalid_json() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/ping"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            b"<html>login page</html>".to_vec(),
            "application/json",
        ))
        .mount(&server)
        .await;

    let relayed = client.forward(get_request(&client, "api/ping")).await.unwrap();

    assert!(
        matches!(relayed.body, ResponseBody::Text(ref text) if text == "<html>login page</html>")
    );
}

// ── Wire-level translation checks ───────────────────────────────────

#[tokio::test]
async fn test_relay_reencodes_collapsed_query() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/tenant/devices"))
        .and(query_param("page", "2"))
        .and(query_param("textSearch", "pump"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let query = collapse_query(Some("page=0&textSearch=pump&page=2"));
    let request = client
        .translate("GET", "api/tenant/devices", query, &HeaderMap::new(), &Bytes::new())
        .unwrap();
    let relayed = client.forward(request).await.unwrap();

    assert_eq!(relayed.status.as_u16(), 200);
}

#[tokio::test]
async fn test_relay_overrides_authorization_on_the_wire() {
    let server = MockServer::start().await;
    let client = ThingsBoardClient::with_client(
        reqwest::Client::new(),
        Some(server.uri()),
        Some(SecretString::from("service-jwt".to_owned())),
    );

    Mock::given(method("GET"))
        .and(path("/api/auth/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let mut inbound = HeaderMap::new();
    inbound.insert(AUTHORIZATION, HeaderValue::from_static("Basic caller-creds"));
    let request = client
        .translate("GET", "api/auth/user", IndexMap::new(), &inbound, &Bytes::new())
        .unwrap();
    client.forward(request).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(
        requests[0].headers.get("authorization").unwrap().to_str().unwrap(),
        "Bearer service-jwt"
    );
}

#[tokio::test]
async fn test_relay_drops_hop_headers_on_the_wire() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/ping"))
        .respond_with(ResponseTemplate::new(200).set_body_string("pong"))
        .mount(&server)
        .await;

    let mut inbound = HeaderMap::new();
    inbound.insert("host", HeaderValue::from_static("wrapper.internal"));
    inbound.insert("connection", HeaderValue::from_static("close"));
    inbound.insert("content-length", HeaderValue::from_static("999"));
    inbound.insert("x-request-id", HeaderValue::from_static("req-7"));

    let request = client
        .translate("GET", "api/ping", IndexMap::new(), &inbound, &Bytes::new())
        .unwrap();
    client.forward(request).await.unwrap();

    let received = &server.received_requests().await.unwrap()[0];

    // The HTTP client sets its own host; the inbound one must not leak.
    let host = received.headers.get("host").unwrap().to_str().unwrap();
    assert_ne!(host, "wrapper.internal");
    assert!(received.headers.get("connection").is_none_or(|v| v != "close"));
    assert!(received.headers.get("content-length").is_none_or(|v| v != "999"));
    assert_eq!(
        received.headers.get("x-request-id").unwrap().to_str().unwrap(),
        "req-7"
    );
}

// ── Body relay ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_json_request_body_is_reserialized() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/rpc/oneway/dev-42"))
        .and(body_json(json!({"method": "setPower", "params": true})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut inbound = HeaderMap::new();
    inbound.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    let body = Bytes::from_static(br#"{"method": "setPower", "params": true}"#);

    let request = client
        .translate("POST", "api/rpc/oneway/dev-42", IndexMap::new(), &inbound, &body)
        .unwrap();
    let relayed = client.forward(request).await.unwrap();

    assert_eq!(relayed.status.as_u16(), 200);
}

#[tokio::test]
async fn test_unparseable_json_body_forwards_empty() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/rpc/oneway/dev-42"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let mut inbound = HeaderMap::new();
    inbound.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    let body = Bytes::from_static(b"{truncated");

    let request = client
        .translate("POST", "api/rpc/oneway/dev-42", IndexMap::new(), &inbound, &body)
        .unwrap();
    client.forward(request).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].body.is_empty());
}

#[tokio::test]
async fn test_raw_body_forwards_verbatim() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/image"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let mut inbound = HeaderMap::new();
    inbound.insert(CONTENT_TYPE, HeaderValue::from_static("application/octet-stream"));
    let body = Bytes::from_static(&[0x89, 0x50, 0x4e, 0x47]);

    let request = client
        .translate("POST", "api/image", IndexMap::new(), &inbound, &body)
        .unwrap();
    client.forward(request).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests[0].body, vec![0x89, 0x50, 0x4e, 0x47]);
    assert_eq!(
        requests[0].headers.get("content-type").unwrap().to_str().unwrap(),
        "application/octet-stream"
    );
}

// ── Failure modes ───────────────────────────────────────────────────

#[tokio::test]
async fn test_timeout_is_a_transport_error() {
    let server = MockServer::start().await;
    let transport = TransportConfig {
        timeout: Duration::from_millis(200),
        ..TransportConfig::default()
    };
    let client = ThingsBoardClient::new(Some(server.uri()), None, &transport).unwrap();

    Mock::given(method("GET"))
        .and(path("/api/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let result = client.forward(get_request(&client, "api/slow")).await;

    match result {
        Err(Error::Transport(ref e)) => assert!(e.is_timeout()),
        other => panic!("expected Transport timeout, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_connection_refused_is_a_transport_error() {
    // Grab a free port, then close it so nothing is listening.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = ThingsBoardClient::with_client(
        reqwest::Client::new(),
        Some(format!("http://{addr}")),
        None,
    );

    let result = client.forward(get_request(&client, "api/ping")).await;

    match result {
        Err(ref err @ Error::Transport(_)) => assert!(err.is_transient()),
        other => panic!("expected Transport error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_unsupported_method_never_reaches_upstream() {
    let (server, client) = setup().await;

    let result = client.translate(
        "TRACE",
        "api/ping",
        IndexMap::new(),
        &HeaderMap::new(),
        &Bytes::new(),
    );

    assert!(matches!(result, Err(Error::UnsupportedMethod(_))));
    assert!(server.received_requests().await.unwrap().is_empty());
}
