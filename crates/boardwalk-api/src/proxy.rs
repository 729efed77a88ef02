// Generic request forwarding
//
// Translation is pure (verb check, URL rebase, header filtering, body
// selection) and testable without a network; forwarding performs the
// single upstream round trip. Upstream HTTP errors are not errors here,
// the relayed response carries them verbatim.

use bytes::Bytes;
use indexmap::IndexMap;
use reqwest::StatusCode;
use reqwest::header::{self, HeaderMap};
use serde_json::Value;
use tracing::debug;
use url::form_urlencoded;

use crate::client::ThingsBoardClient;
use crate::error::Error;

const APPLICATION_JSON: &str = "application/json";

// ── Verb set ─────────────────────────────────────────────────────────

/// The HTTP methods the relay will forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl ProxyMethod {
    /// Parse a method name, any case. Unknown names are rejected here,
    /// before any upstream I/O happens.
    pub fn from_name(name: &str) -> Result<Self, Error> {
        match name.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            _ => Err(Error::UnsupportedMethod(name.to_owned())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }

    fn as_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Patch => reqwest::Method::PATCH,
            Self::Delete => reqwest::Method::DELETE,
            Self::Head => reqwest::Method::HEAD,
            Self::Options => reqwest::Method::OPTIONS,
        }
    }
}

// ── Request and response shapes ──────────────────────────────────────

/// Body selected for the outbound request.
#[derive(Debug, Clone)]
pub enum ProxyBody {
    /// Parsed JSON, re-serialized on send.
    Json(Value),
    /// Verbatim bytes for non-JSON payloads.
    Raw(Bytes),
    /// No body.
    Empty,
}

impl ProxyBody {
    /// Pick the outbound body from the inbound content type and bytes.
    ///
    /// A JSON content type means the bytes are parsed; a body that claims
    /// JSON but does not parse is dropped silently and the request goes
    /// out empty. Anything else is forwarded untouched.
    pub fn from_parts(content_type: Option<&str>, raw: &Bytes) -> Self {
        if content_type.is_some_and(is_json_content_type) {
            return serde_json::from_slice(raw).map_or(Self::Empty, Self::Json);
        }
        if raw.is_empty() {
            Self::Empty
        } else {
            Self::Raw(raw.clone())
        }
    }
}

/// A fully translated upstream request, ready to send.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub method: ProxyMethod,
    pub url: String,
    pub query: IndexMap<String, String>,
    pub headers: HeaderMap,
    pub body: ProxyBody,
}

/// The upstream response after relay reshaping.
#[derive(Debug)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: ResponseBody,
}

/// Relayed body: JSON when the upstream said JSON and it parsed, text
/// otherwise.
#[derive(Debug)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

// ── Pure helpers ─────────────────────────────────────────────────────

/// True when a content type names JSON, in any case, with or without
/// parameters (`application/json; charset=UTF-8`).
fn is_json_content_type(value: &str) -> bool {
    value
        .get(..APPLICATION_JSON.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(APPLICATION_JSON))
}

/// Collapse a raw query string into single-valued pairs.
///
/// Repeated keys keep only the last value; first-appearance order is
/// preserved for the rest.
pub fn collapse_query(raw: Option<&str>) -> IndexMap<String, String> {
    let mut pairs = IndexMap::new();
    for (key, value) in form_urlencoded::parse(raw.unwrap_or_default().as_bytes()) {
        pairs.insert(key.into_owned(), value.into_owned());
    }
    pairs
}

/// Copy inbound headers, dropping the hop-level set the upstream must
/// never see. Name comparison is case-insensitive by construction and
/// duplicate values are preserved.
fn filter_request_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut outbound = HeaderMap::new();
    for (name, value) in inbound {
        if *name == header::HOST || *name == header::CONTENT_LENGTH || *name == header::CONNECTION
        {
            continue;
        }
        outbound.append(name, value.clone());
    }
    outbound
}

// ── Pipeline ─────────────────────────────────────────────────────────

impl ThingsBoardClient {
    /// Translate an inbound wrapper request into an upstream request.
    ///
    /// Fails before any I/O when the verb is outside the relay set or no
    /// base URL is configured. Hop-level headers (`host`,
    /// `content-length`, `connection`) are dropped, and a configured API
    /// token overwrites any forwarded `authorization` header. Without a
    /// token the caller's `authorization` passes through untouched.
    pub fn translate(
        &self,
        method: &str,
        path: &str,
        query: IndexMap<String, String>,
        headers: &HeaderMap,
        body: &Bytes,
    ) -> Result<ProxyRequest, Error> {
        let method = ProxyMethod::from_name(method)?;
        let url = self.upstream_url(path)?;

        let mut outbound = filter_request_headers(headers);
        if let Some(value) = self.bearer_header()? {
            outbound.insert(header::AUTHORIZATION, value);
        }

        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());
        let body = ProxyBody::from_parts(content_type, body);

        Ok(ProxyRequest {
            method,
            url,
            query,
            headers: outbound,
            body,
        })
    }

    /// Send a translated request and reshape the upstream response.
    ///
    /// Upstream 4xx/5xx are relayed, not errors; only transport failures
    /// (connect, timeout, TLS) surface as `Error::Transport`. Framing
    /// headers (`transfer-encoding`, `content-length`,
    /// `content-encoding`) are stripped because the relay re-frames the
    /// body it passes on.
    pub async fn forward(&self, request: ProxyRequest) -> Result<ProxyResponse, Error> {
        let ProxyRequest {
            method,
            url,
            query,
            headers,
            body,
        } = request;
        debug!("{} {url}", method.as_str());

        let mut builder = self.http().request(method.as_reqwest(), &url).headers(headers);
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        builder = match body {
            ProxyBody::Json(ref value) => builder.json(value),
            ProxyBody::Raw(bytes) => builder.body(bytes),
            ProxyBody::Empty => builder,
        };

        let resp = builder.send().await.map_err(Error::Transport)?;

        let status = resp.status();
        let mut headers = resp.headers().clone();
        headers.remove(header::TRANSFER_ENCODING);
        headers.remove(header::CONTENT_LENGTH);
        headers.remove(header::CONTENT_ENCODING);

        let upstream_json = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(is_json_content_type);
        let text = resp.text().await.map_err(Error::Transport)?;

        let body = if upstream_json {
            match serde_json::from_str(&text) {
                Ok(value) => ResponseBody::Json(value),
                Err(_) => ResponseBody::Text(text),
            }
        } else {
            ResponseBody::Text(text)
        };

        Ok(ProxyResponse {
            status,
            headers,
            body,
        })
    }
}
