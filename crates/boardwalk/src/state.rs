use std::sync::Arc;

use boardwalk_api::ThingsBoardClient;

use crate::store::DeviceStore;

/// Shared handler state, cheap to clone per request.
#[derive(Clone)]
pub struct AppState {
    /// Upstream client: one pooled connection set for every handler.
    pub upstream: Arc<ThingsBoardClient>,
    /// The local registry.
    pub devices: DeviceStore,
}

impl AppState {
    pub fn new(upstream: ThingsBoardClient) -> Self {
        Self {
            upstream: Arc::new(upstream),
            devices: DeviceStore::new(),
        }
    }
}
