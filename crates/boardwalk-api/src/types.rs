// Wire types for the ThingsBoard endpoints the typed wrappers use.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One page of `GET /api/tenant/devices`.
///
/// Only the paging envelope is typed; device entries stay opaque JSON so
/// upstream schema drift never breaks the relay. A response missing either
/// field decodes as an empty page.
#[derive(Debug, Clone, Deserialize)]
pub struct DevicePage {
    #[serde(default)]
    pub data: Vec<Value>,

    #[serde(default, rename = "totalElements")]
    pub total_elements: i64,
}

/// One `{ts, value}` sample from the timeseries endpoint. `ts` is epoch
/// milliseconds; `value` is whatever the device reported (often a string).
#[derive(Debug, Clone, Deserialize)]
pub struct TimeseriesEntry {
    pub ts: i64,
    pub value: Value,
}

/// Newest sample for one telemetry key, in the local response shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatestValue {
    pub value: Value,
    pub timestamp: i64,
}
