use std::collections::HashMap;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;

use tracing::info;

use super::Device;

/// Registry of all devices known to the controller.
///
/// Cloning is cheap and every clone shares the same map, so one registry is
/// built at startup and handed to both the initializer and the HTTP API.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    devices: Arc<RwLock<HashMap<String, Arc<dyn Device>>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device under its own id, replacing any previous device
    /// with the same id.
    pub fn register(&self, device: Arc<dyn Device>) {
        let id = device.id().to_string();
        {
            let mut devices = self.devices.write().unwrap_or_else(PoisonError::into_inner);
            devices.insert(id.clone(), device);
        }
        info!(device_id = %id, "Device registered");
    }

    /// Look up a device by id.
    pub fn get(&self, id: &str) -> Option<Arc<dyn Device>> {
        self.devices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.devices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .devices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    /// Handles to every registered device, sorted by id.
    pub fn snapshot(&self) -> Vec<Arc<dyn Device>> {
        let mut devices: Vec<Arc<dyn Device>> = self
            .devices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        devices.sort_by(|a, b| a.id().cmp(b.id()));
        devices
    }
}
