// ThingsBoard REST client
//
// Wraps `reqwest::Client` with lazy base-URL resolution, bearer-token
// injection, and the typed convenience endpoints the wrapper surface
// exposes. The generic forwarding pipeline lives in `proxy.rs` as
// inherent methods on this client.

use indexmap::IndexMap;
use reqwest::header::{self, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::Error;
use crate::transport::TransportConfig;
use crate::types::{DevicePage, LatestValue, TimeseriesEntry};

// ── Error response shape from ThingsBoard ────────────────────────────

#[derive(serde::Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for a ThingsBoard instance.
///
/// The base URL is optional at construction and checked on every call, so
/// the service can boot unconfigured and fail only when an upstream
/// operation is actually exercised.
pub struct ThingsBoardClient {
    http: reqwest::Client,
    base_url: Option<String>,
    token: Option<SecretString>,
}

impl ThingsBoardClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build a client from connection settings and transport options.
    pub fn new(
        base_url: Option<String>,
        token: Option<SecretString>,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    /// Wrap a pre-built `reqwest::Client` (caller controls the transport).
    pub fn with_client(
        http: reqwest::Client,
        base_url: Option<String>,
        token: Option<SecretString>,
    ) -> Self {
        Self {
            http,
            base_url,
            token,
        }
    }

    /// The underlying HTTP client.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Join a relative path onto the configured base URL.
    ///
    /// Strips at most one trailing slash from the base and one leading
    /// slash from the path, so `http://tb:9090/` + `/api/auth` and
    /// `http://tb:9090` + `api/auth` produce the same URL. No other
    /// normalisation or encoding happens; the path is caller data.
    pub fn upstream_url(&self, path: &str) -> Result<String, Error> {
        let base = self.base_url.as_deref().ok_or(Error::MissingBaseUrl)?;
        if base.is_empty() {
            return Err(Error::MissingBaseUrl);
        }

        let base = base.strip_suffix('/').unwrap_or(base);
        let path = path.strip_prefix('/').unwrap_or(path);
        Ok(format!("{base}/{path}"))
    }

    // ── Auth ─────────────────────────────────────────────────────────

    /// Header value for the configured API token, if any.
    ///
    /// Empty tokens count as absent. The value is marked sensitive so it
    /// never shows up in debug output.
    pub(crate) fn bearer_header(&self) -> Result<Option<HeaderValue>, Error> {
        let Some(token) = self.token.as_ref() else {
            return Ok(None);
        };
        let secret = token.expose_secret();
        if secret.is_empty() {
            return Ok(None);
        }

        let mut value = HeaderValue::from_str(&format!("Bearer {secret}"))
            .map_err(|_| Error::InvalidHeader {
                name: "authorization",
            })?;
        value.set_sensitive(true);
        Ok(Some(value))
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Authenticated GET returning a decoded JSON body.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, Error> {
        let url = self.upstream_url(path)?;
        debug!("GET {url} params={params:?}");

        let mut builder = self.http.get(&url).query(params);
        if let Some(value) = self.bearer_header()? {
            builder = builder.header(header::AUTHORIZATION, value);
        }

        let resp = builder.send().await.map_err(Error::Transport)?;
        self.handle_response(resp).await
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await.map_err(Error::Transport)?;
            serde_json::from_str(&body).map_err(|e| {
                let preview: String = body.chars().take(200).collect();
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                }
            })
        } else {
            Err(self.upstream_error(status, resp).await)
        }
    }

    /// Extract the `message` field from a ThingsBoard error body, falling
    /// back to the raw body, then to the status line.
    async fn upstream_error(&self, status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
        let raw = resp.text().await.unwrap_or_default();

        let message = match serde_json::from_str::<ErrorResponse>(&raw) {
            Ok(ErrorResponse {
                message: Some(message),
            }) => message,
            _ if raw.is_empty() => status.to_string(),
            _ => raw,
        };

        Error::UpstreamStatus {
            status: status.as_u16(),
            message,
        }
    }

    // ━━ Convenience endpoints ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// One page of the tenant's devices, newest first.
    ///
    /// `GET /api/tenant/devices` sorted by `createdTime` descending.
    /// Device entries are relayed as opaque JSON; only the paging
    /// envelope is decoded.
    pub async fn tenant_devices(&self, page_size: u64, page: u64) -> Result<DevicePage, Error> {
        self.get_json(
            "api/tenant/devices",
            &[
                ("pageSize", page_size.to_string()),
                ("page", page.to_string()),
                ("sortProperty", "createdTime".to_owned()),
                ("sortOrder", "DESC".to_owned()),
            ],
        )
        .await
    }

    /// Latest telemetry sample per key for one device.
    ///
    /// `GET /api/plugins/telemetry/DEVICE/{device_id}/values/timeseries`.
    /// ThingsBoard returns the full series per key; only the most recent
    /// sample survives, renamed from `{ts, value}` to `{timestamp, value}`.
    /// Pass `keys` (comma-separated) to restrict the result server-side;
    /// `None` or an empty string means all keys. The device id is
    /// interpolated as given, bad ids are rejected upstream.
    pub async fn latest_telemetry(
        &self,
        device_id: &str,
        keys: Option<&str>,
    ) -> Result<IndexMap<String, LatestValue>, Error> {
        let path = format!("api/plugins/telemetry/DEVICE/{device_id}/values/timeseries");

        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(keys) = keys {
            if !keys.trim().is_empty() {
                params.push(("keys", keys.to_owned()));
            }
        }

        let series: IndexMap<String, Value> = self.get_json(&path, &params).await?;
        latest_per_key(series)
    }
}

// ── Series reduction ─────────────────────────────────────────────────

/// Reduce full series data to the newest sample per key.
///
/// Keys whose value is not a non-empty array are skipped. A final sample
/// that is not a `{ts, value}` object is a deserialization error.
fn latest_per_key(series: IndexMap<String, Value>) -> Result<IndexMap<String, LatestValue>, Error> {
    let mut latest = IndexMap::new();

    for (key, value) in series {
        let Value::Array(mut samples) = value else {
            continue;
        };
        let Some(last) = samples.pop() else {
            continue;
        };

        let entry: TimeseriesEntry =
            serde_json::from_value(last.clone()).map_err(|e| Error::Deserialization {
                message: format!("telemetry sample for key {key:?}: {e}"),
                body: last.to_string(),
            })?;

        latest.insert(
            key,
            LatestValue {
                value: entry.value,
                timestamp: entry.ts,
            },
        );
    }

    Ok(latest)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn client(base_url: Option<&str>, token: Option<&str>) -> ThingsBoardClient {
        ThingsBoardClient::with_client(
            reqwest::Client::new(),
            base_url.map(str::to_owned),
            token.map(|t| SecretString::from(t.to_owned())),
        )
    }

    // ── URL join ─────────────────────────────────────────────────────

    #[test]
    fn upstream_url_joins_with_single_slash() {
        let expected = "http://tb:9090/api/auth/login";
        for (base, path) in [
            ("http://tb:9090", "api/auth/login"),
            ("http://tb:9090/", "api/auth/login"),
            ("http://tb:9090", "/api/auth/login"),
            ("http://tb:9090/", "/api/auth/login"),
        ] {
            assert_eq!(client(Some(base), None).upstream_url(path).unwrap(), expected);
        }
    }

    #[test]
    fn upstream_url_strips_at_most_one_slash() {
        let c = client(Some("http://tb:9090//"), None);
        assert_eq!(c.upstream_url("//x").unwrap(), "http://tb:9090///x");
    }

    #[test]
    fn upstream_url_requires_base() {
        assert!(matches!(
            client(None, None).upstream_url("api/auth"),
            Err(Error::MissingBaseUrl)
        ));
        assert!(matches!(
            client(Some(""), None).upstream_url("api/auth"),
            Err(Error::MissingBaseUrl)
        ));
    }

    // ── Bearer header ────────────────────────────────────────────────

    #[test]
    fn bearer_header_formats_token() {
        let value = client(None, Some("tb-jwt")).bearer_header().unwrap().unwrap();
        assert_eq!(value.to_str().unwrap(), "Bearer tb-jwt");
        assert!(value.is_sensitive());
    }

    #[test]
    fn bearer_header_treats_empty_token_as_absent() {
        assert!(client(None, Some("")).bearer_header().unwrap().is_none());
        assert!(client(None, None).bearer_header().unwrap().is_none());
    }

    // ── Series reduction ─────────────────────────────────────────────

    fn series(value: Value) -> IndexMap<String, Value> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn latest_per_key_picks_last_sample() {
        let latest = latest_per_key(series(json!({
            "temperature": [
                {"ts": 1000, "value": "21.0"},
                {"ts": 2000, "value": "23.4"}
            ]
        })))
        .unwrap();

        assert_eq!(
            latest.get("temperature").unwrap(),
            &LatestValue {
                value: json!("23.4"),
                timestamp: 2000,
            }
        );
    }

    #[test]
    fn latest_per_key_skips_empty_and_non_array_values() {
        let latest = latest_per_key(series(json!({
            "empty": [],
            "scalar": 7,
            "humidity": [{"ts": 3000, "value": 55}]
        })))
        .unwrap();

        assert_eq!(latest.len(), 1);
        assert_eq!(latest.get("humidity").unwrap().timestamp, 3000);
    }

    #[test]
    fn latest_per_key_rejects_malformed_sample() {
        let result = latest_per_key(series(json!({
            "temperature": [{"value": "no ts field"}]
        })));

        assert!(matches!(result, Err(Error::Deserialization { .. })));
    }

    #[test]
    fn latest_per_key_preserves_key_order() {
        // Built by hand: `json!` objects sort their keys.
        let mut input = IndexMap::new();
        input.insert("b".to_owned(), json!([{"ts": 1, "value": 1}]));
        input.insert("a".to_owned(), json!([{"ts": 2, "value": 2}]));

        let latest = latest_per_key(input).unwrap();

        let keys: Vec<&str> = latest.keys().map(String::as_str).collect();
        assert_eq!(keys, ["b", "a"]);
    }
}
