pub mod api;
pub mod config;
pub mod devices;
pub mod discovery;
pub mod startup;

pub use config::Config;
pub use config::Diagnostic;
pub use config::LogLevel;
pub use config::format_diagnostics;
pub use devices::Device;
pub use devices::DeviceStatus;
pub use devices::Registry;
