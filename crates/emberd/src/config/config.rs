//! Configuration file parsing and structures.
//!
//! emberd reads a single YAML document describing logging, the HTTP API
//! listener, how to read the ARP table and which thermostats to control.

use std::collections::HashMap;
use std::net::IpAddr;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::filter::Targets;

use super::diagnostics::Diagnostic;
use super::diagnostics::Error;
use super::diagnostics::ParseError;
use super::diagnostics::SourceInfo;
use super::diagnostics::ValidationError;
use super::diagnostics::Warning;
use super::diagnostics::format_diagnostics;
use crate::discovery::is_valid_mac;

/// Top-level configuration structure
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub discovery: DiscoveryConfig,

    #[serde(default)]
    pub thermostats: Vec<ThermostatConfig>,
}

#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default)]
    pub level: LogLevel,

    /// Per-target levels, e.g. `tower_http: debug`
    #[serde(default)]
    pub overrides: HashMap<String, LogLevel>,
}

impl LoggingConfig {
    /// Build the subscriber filter: `level` everywhere, `overrides` per target
    pub fn filter(&self) -> Targets {
        Targets::new()
            .with_default(LevelFilter::from(self.level))
            .with_targets(
                self.overrides
                    .iter()
                    .map(|(target, level)| (target.clone(), LevelFilter::from(*level))),
            )
    }
}

fn default_listen() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// HTTP API listener
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            port: default_port(),
        }
    }
}

fn default_arp_command() -> String {
    "arp".to_string()
}

fn default_arp_args() -> Vec<String> {
    vec!["-a".to_string()]
}

/// How the ARP table is read when resolving MAC addresses
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryConfig {
    #[serde(default = "default_arp_command")]
    pub arp_command: String,

    #[serde(default = "default_arp_args")]
    pub arp_args: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            arp_command: default_arp_command(),
            arp_args: default_arp_args(),
        }
    }
}

/// A configured thermostat
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ThermostatConfig {
    pub id: String,

    #[serde(default)]
    pub model: String,

    /// Hardware address used to find the thermostat on the network
    pub mac_id: String,

    /// Filled in at startup from the ARP table; never read from the file
    #[serde(skip)]
    pub address: Option<IpAddr>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Invalid config file {path}:\n{report}")]
    Invalid { path: PathBuf, report: String },
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// Returns the config together with any warnings. Parse and validation
    /// errors are rendered into [`ConfigError::Invalid`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<(Self, Vec<Diagnostic>), ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;

        Self::from_source(SourceInfo {
            file_path: path.to_path_buf(),
            content,
        })
    }

    /// Parse and validate configuration from already-read source text
    pub fn from_source(source: SourceInfo) -> Result<(Self, Vec<Diagnostic>), ConfigError> {
        let mut diagnostics = Vec::new();

        let config = if is_blank(&source.content) {
            diagnostics.push(Diagnostic::Warning(Warning::EmptyConfig {
                file_path: source.file_path.clone(),
            }));
            Config::default()
        } else {
            match serde_yaml::from_str::<Config>(&source.content) {
                Ok(config) => config,
                Err(e) => {
                    let path = source.file_path.clone();
                    let diagnostic =
                        Diagnostic::Error(Error::Parse(ParseError::from_yaml(&e, source)));
                    return Err(ConfigError::Invalid {
                        path,
                        report: format_diagnostics(&[diagnostic]),
                    });
                }
            }
        };

        diagnostics.extend(config.validate());

        if diagnostics.iter().any(|d| d.is_error()) {
            Err(ConfigError::Invalid {
                path: source.file_path,
                report: format_diagnostics(&diagnostics),
            })
        } else {
            Ok((config, diagnostics))
        }
    }

    /// Check cross-field constraints the deserializer can't express
    fn validate(&self) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        let mut counts: HashMap<&str, usize> = HashMap::new();

        for (idx, thermostat) in self.thermostats.iter().enumerate() {
            if thermostat.id.trim().is_empty() {
                diagnostics.push(Diagnostic::Error(Error::Validation(ValidationError {
                    field_path: format!("thermostats[{}].id", idx),
                    message: "thermostat id must not be empty".to_string(),
                })));
                continue;
            }

            *counts.entry(thermostat.id.as_str()).or_default() += 1;

            if !is_valid_mac(&thermostat.mac_id) {
                diagnostics.push(Diagnostic::Warning(Warning::MalformedMac {
                    id: thermostat.id.clone(),
                    mac: thermostat.mac_id.clone(),
                }));
            }
        }

        let mut duplicates: Vec<(&str, usize)> =
            counts.into_iter().filter(|(_, count)| *count > 1).collect();
        duplicates.sort();
        diagnostics.extend(duplicates.into_iter().map(|(id, count)| {
            Diagnostic::Warning(Warning::DuplicateDevice {
                id: id.to_string(),
                count,
            })
        }));

        diagnostics
    }
}

/// Whether the document has no content besides whitespace and comments
fn is_blank(content: &str) -> bool {
    content.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#') || line == "---"
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;
    use tracing::Level;

    use super::*;

    fn parse(yaml: &str) -> Result<(Config, Vec<Diagnostic>), ConfigError> {
        Config::from_source(SourceInfo {
            file_path: PathBuf::from("config.yaml"),
            content: yaml.to_string(),
        })
    }

    #[test]
    fn test_parse_minimal_config() {
        let yaml = r#"
thermostats:
  - id: "downstairs"
    model: "honeywell_t5+"
    mac_id: "5C:FC:E1:7C:24:06"
"#;

        let (config, diagnostics) = parse(yaml).unwrap();
        assert!(diagnostics.is_empty());
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.api.listen, "0.0.0.0");
        assert_eq!(config.api.port, 8080);
        assert_eq!(config.discovery.arp_command, "arp");
        assert_eq!(config.discovery.arp_args, vec!["-a"]);
        assert_eq!(
            config.thermostats,
            vec![ThermostatConfig {
                id: "downstairs".to_string(),
                model: "honeywell_t5+".to_string(),
                mac_id: "5C:FC:E1:7C:24:06".to_string(),
                address: None,
            }]
        );
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
logging:
  level: debug
  overrides:
    tower_http: trace
api:
  listen: 127.0.0.1
  port: 9090
discovery:
  arp_command: /usr/sbin/arp
  arp_args: ["-a", "-n"]
thermostats:
  - id: upstairs
    mac_id: 5c:fc:e1:7c:24:07
"#;

        let (config, diagnostics) = parse(yaml).unwrap();
        assert!(diagnostics.is_empty());
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(
            config.logging.overrides.get("tower_http"),
            Some(&LogLevel::Trace)
        );
        assert_eq!(config.api.listen, "127.0.0.1");
        assert_eq!(config.api.port, 9090);
        assert_eq!(config.discovery.arp_command, "/usr/sbin/arp");
        assert_eq!(config.discovery.arp_args, vec!["-a", "-n"]);
        assert_eq!(config.thermostats[0].model, "");
    }

    #[test]
    fn test_address_is_not_read_from_file() {
        let yaml = r#"
thermostats:
  - id: downstairs
    mac_id: 5C:FC:E1:7C:24:06
    address: 10.0.0.1
"#;

        let (config, _) = parse(yaml).unwrap();
        assert_eq!(config.thermostats[0].address, None);
    }

    #[test]
    fn test_empty_config_warns() {
        let (config, diagnostics) = parse("# nothing configured yet\n\n").unwrap();
        assert!(config.thermostats.is_empty());
        assert_eq!(diagnostics.len(), 1);
        assert!(matches!(
            diagnostics[0],
            Diagnostic::Warning(Warning::EmptyConfig { .. })
        ));
    }

    #[test]
    fn test_parse_error_is_fatal() {
        let yaml = r#"
thermostats:
  - id: downstairs
    model: honeywell_t5+
"#;

        let err = parse(yaml).unwrap_err();
        match err {
            ConfigError::Invalid { path, report } => {
                assert_eq!(path, PathBuf::from("config.yaml"));
                assert!(report.contains("mac_id"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_invalid_log_level_is_fatal() {
        let yaml = "logging:\n  level: loud\n";
        assert!(matches!(parse(yaml), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_empty_id_is_fatal() {
        let yaml = r#"
thermostats:
  - id: ""
    mac_id: 5C:FC:E1:7C:24:06
"#;

        let err = parse(yaml).unwrap_err();
        assert!(err.to_string().contains("thermostats[0].id"));
    }

    #[test]
    fn test_duplicate_ids_and_bad_mac_warn() {
        let yaml = r#"
thermostats:
  - id: downstairs
    mac_id: 5C:FC:E1:7C:24:06
  - id: downstairs
    mac_id: not-a-mac
"#;

        let (config, diagnostics) = parse(yaml).unwrap();
        assert_eq!(config.thermostats.len(), 2);
        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics.iter().all(|d| d.is_warning()));
        assert!(diagnostics.iter().any(|d| matches!(
            d,
            Diagnostic::Warning(Warning::MalformedMac { mac, .. }) if mac == "not-a-mac"
        )));
        assert!(diagnostics.iter().any(|d| matches!(
            d,
            Diagnostic::Warning(Warning::DuplicateDevice { id, count: 2 }) if id == "downstairs"
        )));
    }

    #[test]
    fn test_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        fs::write(
            &path,
            r#"
thermostats:
  - id: "downstairs"
    model: "honeywell_t5+"
    mac_id: "5C:FC:E1:7C:24:06"
"#,
        )
        .unwrap();

        let (config, _) = Config::from_file(&path).unwrap();
        assert_eq!(config.thermostats.len(), 1);
        assert_eq!(config.thermostats[0].id, "downstairs");
    }

    #[test]
    fn test_from_file_missing() {
        let temp_dir = TempDir::new().unwrap();
        let err = Config::from_file(temp_dir.path().join("missing.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(..)));
    }

    #[test]
    fn test_log_level_filter() {
        assert_eq!(LevelFilter::from(LogLevel::Warn), LevelFilter::WARN);
        assert_eq!(LevelFilter::from(LogLevel::default()), LevelFilter::INFO);
    }

    #[test]
    fn test_logging_filter_applies_overrides() {
        let yaml = r#"
logging:
  level: warn
  overrides:
    tower_http: debug
    "emberd::discovery": trace
"#;

        let (config, _) = parse(yaml).unwrap();
        let filter = config.logging.filter();

        assert!(filter.would_enable("emberd::api", &Level::WARN));
        assert!(!filter.would_enable("emberd::api", &Level::INFO));
        assert!(filter.would_enable("tower_http::trace", &Level::DEBUG));
        assert!(!filter.would_enable("tower_http::trace", &Level::TRACE));
        assert!(filter.would_enable("emberd::discovery", &Level::TRACE));
    }

    #[test]
    fn test_logging_filter_defaults_to_info() {
        let filter = LoggingConfig::default().filter();

        assert!(filter.would_enable("emberd", &Level::INFO));
        assert!(!filter.would_enable("emberd", &Level::DEBUG));
    }

    #[test]
    fn test_parse_error_report_keeps_message_after_non_ascii() {
        let err = parse("# ééééé\nthermostats:\n  - id: u\n    mac_id: [\n").unwrap_err();
        match err {
            ConfigError::Invalid { report, .. } => {
                assert!(report.contains("Failed to parse config"));
                assert!(report.contains("expected a string"));
            }
            other => panic!("expected Invalid, got {other:?}"),
        }
    }
}
