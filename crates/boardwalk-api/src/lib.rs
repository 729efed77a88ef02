// boardwalk-api: Async client and request-forwarding core for ThingsBoard

pub mod client;
pub mod error;
pub mod proxy;
pub mod transport;
pub mod types;

pub use client::ThingsBoardClient;
pub use error::Error;
pub use proxy::{ProxyBody, ProxyMethod, ProxyRequest, ProxyResponse, ResponseBody, collapse_query};
pub use transport::TransportConfig;
pub use types::{DevicePage, LatestValue, TimeseriesEntry};
