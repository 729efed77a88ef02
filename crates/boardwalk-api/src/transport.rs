// Shared transport configuration for building `reqwest::Client` instances.
//
// One pooled client serves both the typed convenience calls and the
// generic relay; all requests inherit the same timeout and TLS settings.

use std::time::Duration;

/// Transport options for the upstream HTTP client.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Per-request ceiling covering connect, write, and read.
    pub timeout: Duration,
    /// Accept any certificate (for self-signed ThingsBoard installs).
    pub accept_invalid_certs: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            accept_invalid_certs: false,
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent("boardwalk/0.1.0");

        if self.accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }

        builder.build().map_err(crate::error::Error::Transport)
    }
}
