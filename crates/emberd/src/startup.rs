//! Device initialization from configuration.

use std::sync::Arc;

use tracing::error;
use tracing::info;

use crate::config::ThermostatConfig;
use crate::devices::MockThermostat;
use crate::devices::Registry;
use crate::discovery::ArpTable;
use crate::discovery::find_ip_by_mac;

/// Resolve and register every configured thermostat.
///
/// Each thermostat is handled independently: one whose address can't be
/// resolved is logged and skipped. Returns the configs of the thermostats
/// that were registered, with their resolved address filled in.
pub async fn register_thermostats(
    thermostats: &[ThermostatConfig],
    registry: &Registry,
    arp: &dyn ArpTable,
) -> Vec<ThermostatConfig> {
    info!("Initializing devices...");

    let mut registered = Vec::with_capacity(thermostats.len());
    for thermostat in thermostats {
        let ip = match find_ip_by_mac(arp, &thermostat.mac_id).await {
            Ok(ip) => ip,
            Err(e) => {
                error!(
                    device_id = %thermostat.id,
                    mac = %thermostat.mac_id,
                    error = %e,
                    "Could not find IP for thermostat"
                );
                continue;
            }
        };

        let resolved = ThermostatConfig {
            address: Some(ip),
            ..thermostat.clone()
        };
        registry.register(Arc::new(MockThermostat::new(
            resolved.id.clone(),
            resolved.model.clone(),
            ip,
        )));
        registered.push(resolved);
    }

    info!(
        "Initialized {} of {} configured thermostats",
        registered.len(),
        thermostats.len()
    );
    registered
}
