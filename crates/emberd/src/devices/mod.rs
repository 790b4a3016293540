//! Device abstraction for emberd
//!
//! Every controllable device implements the [`Device`] trait. Devices are
//! constructed once at startup and handed to the [`Registry`], which is the
//! only long-lived holder of them.

mod registry;
mod thermostat;

use async_trait::async_trait;
use serde::Serialize;

pub use registry::Registry;
pub use thermostat::MockThermostat;

/// Power state reported by a device.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    strum::Display,
    strum::AsRefStr,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DeviceStatus {
    On,
    Off,
}

impl From<bool> for DeviceStatus {
    fn from(on: bool) -> Self {
        if on {
            DeviceStatus::On
        } else {
            DeviceStatus::Off
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("device {id} is unreachable at {address}")]
    Unreachable { id: String, address: String },

    #[error("device {id} rejected command: {message}")]
    Command { id: String, message: String },
}

/// Capability set shared by all devices.
#[async_trait]
pub trait Device: Send + Sync {
    /// Identifier the device is registered under. Never changes.
    fn id(&self) -> &str;

    async fn turn_on(&self) -> Result<(), DeviceError>;

    async fn turn_off(&self) -> Result<(), DeviceError>;

    fn status(&self) -> DeviceStatus;
}

impl std::fmt::Debug for dyn Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("id", &self.id())
            .field("status", &self.status())
            .finish()
    }
}
