// ── Local device registry ──
//
// In-process concurrent storage, no persistence. These records are the
// wrapper's own bookkeeping; the devices ThingsBoard knows about are
// reached through `boardwalk_api` instead.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A locally registered device record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Concurrent device map keyed by id. Cloning shares the storage.
#[derive(Debug, Clone, Default)]
pub struct DeviceStore {
    devices: Arc<DashMap<Uuid, Device>>,
}

impl DeviceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a record. The id and creation timestamp are assigned here.
    pub fn insert(&self, name: String) -> Device {
        let device = Device {
            id: Uuid::new_v4(),
            name,
            created_at: Utc::now(),
        };
        self.devices.insert(device.id, device.clone());
        device
    }

    pub fn get(&self, id: Uuid) -> Option<Device> {
        self.devices.get(&id).map(|r| r.value().clone())
    }

    /// All records, newest first.
    pub fn list(&self) -> Vec<Device> {
        let mut all: Vec<Device> = self.devices.iter().map(|r| r.value().clone()).collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all
    }

    /// Replace a record's name. Returns the updated record if it existed.
    pub fn rename(&self, id: Uuid, name: String) -> Option<Device> {
        self.devices.get_mut(&id).map(|mut entry| {
            entry.name = name;
            entry.value().clone()
        })
    }

    /// Remove a record, returning it if it existed.
    pub fn remove(&self, id: Uuid) -> Option<Device> {
        self.devices.remove(&id).map(|(_, device)| device)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
