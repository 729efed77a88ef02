use thiserror::Error;

/// Top-level error type for the `boardwalk-api` crate.
///
/// Covers every failure mode of the wrapper core: missing configuration,
/// request translation, transport, upstream rejections, and response
/// decoding. The HTTP surface maps these onto status codes.
#[derive(Debug, Error)]
pub enum Error {
    // ── Configuration ───────────────────────────────────────────────
    /// No ThingsBoard base URL is configured. Checked lazily, on the
    /// first call that actually needs the upstream.
    #[error("ThingsBoard base URL is not configured")]
    MissingBaseUrl,

    // ── Translation ─────────────────────────────────────────────────
    /// Inbound verb outside the relayable set. Raised before any I/O.
    #[error("unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    /// A configured value could not be encoded as the named header.
    #[error("invalid value for {name} header")]
    InvalidHeader { name: &'static str },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, timeout, TLS, etc.)
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    // ── Upstream ────────────────────────────────────────────────────
    /// Non-2xx from ThingsBoard on a typed convenience call. The generic
    /// relay never produces this; it forwards error statuses verbatim.
    #[error("upstream returned HTTP {status}: {message}")]
    UpstreamStatus { status: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` when the upstream itself failed (reachability or an
    /// explicit error status), as opposed to local misconfiguration or a
    /// malformed response.
    pub fn is_upstream_failure(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::UpstreamStatus { .. })
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}
