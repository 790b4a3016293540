use std::net::IpAddr;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use tracing::info;

use super::Device;
use super::DeviceError;
use super::DeviceStatus;

/// Stand-in for a real networked thermostat.
///
/// Commands always succeed and only flip the in-memory power state.
#[derive(Debug)]
pub struct MockThermostat {
    id: String,
    model: String,
    address: IpAddr,
    on: AtomicBool,
}

impl MockThermostat {
    pub fn new(id: impl Into<String>, model: impl Into<String>, address: IpAddr) -> Self {
        Self {
            id: id.into(),
            model: model.into(),
            address,
            on: AtomicBool::new(false),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn address(&self) -> IpAddr {
        self.address
    }
}

#[async_trait]
impl Device for MockThermostat {
    fn id(&self) -> &str {
        &self.id
    }

    async fn turn_on(&self) -> Result<(), DeviceError> {
        info!(device_id = %self.id, address = %self.address, "Turning thermostat ON");
        self.on.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn turn_off(&self) -> Result<(), DeviceError> {
        info!(device_id = %self.id, address = %self.address, "Turning thermostat OFF");
        self.on.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn status(&self) -> DeviceStatus {
        DeviceStatus::from(self.on.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;

    fn downstairs() -> MockThermostat {
        MockThermostat::new(
            "downstairs",
            "honeywell_t5+",
            IpAddr::V4(Ipv4Addr::new(192, 168, 1, 42)),
        )
    }

    #[test]
    fn test_starts_off() {
        let thermostat = downstairs();
        assert_eq!(thermostat.status(), DeviceStatus::Off);
        assert_eq!(thermostat.id(), "downstairs");
        assert_eq!(thermostat.model(), "honeywell_t5+");
        assert_eq!(thermostat.address().to_string(), "192.168.1.42");
    }

    #[tokio::test]
    async fn test_turn_on_then_off() {
        let thermostat = downstairs();

        thermostat.turn_on().await.unwrap();
        assert_eq!(thermostat.status(), DeviceStatus::On);
        assert_eq!(thermostat.status().to_string(), "on");

        thermostat.turn_off().await.unwrap();
        assert_eq!(thermostat.status(), DeviceStatus::Off);
        assert_eq!(thermostat.status().to_string(), "off");
    }

    #[tokio::test]
    async fn test_commands_are_idempotent() {
        let thermostat = downstairs();

        thermostat.turn_on().await.unwrap();
        thermostat.turn_on().await.unwrap();
        assert_eq!(thermostat.status(), DeviceStatus::On);

        thermostat.turn_off().await.unwrap();
        thermostat.turn_off().await.unwrap();
        assert_eq!(thermostat.status(), DeviceStatus::Off);
    }
}
