//! MAC address to IP address resolution
//!
//! Configured devices are identified by hardware address. Their network
//! address is looked up by scanning the host's ARP table, read through the
//! [`ArpTable`] trait so tests can supply canned output.

use std::net::IpAddr;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::config::DiscoveryConfig;

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("invalid MAC address '{mac}'")]
    InvalidMac { mac: String },

    #[error("failed to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("MAC {mac} not found")]
    NotFound { mac: String },
}

/// Source of ARP table text.
#[async_trait]
pub trait ArpTable: Send + Sync {
    /// Return the current ARP table as line-oriented text.
    async fn dump(&self) -> Result<String, ResolveError>;
}

/// Reads the ARP table by running a host command (`arp -a` by default).
#[derive(Debug, Clone)]
pub struct SystemArpTable {
    program: String,
    args: Vec<String>,
}

impl SystemArpTable {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl Default for SystemArpTable {
    fn default() -> Self {
        Self::new("arp", vec!["-a".to_string()])
    }
}

impl From<&DiscoveryConfig> for SystemArpTable {
    fn from(config: &DiscoveryConfig) -> Self {
        Self::new(config.arp_command.clone(), config.arp_args.clone())
    }
}

#[async_trait]
impl ArpTable for SystemArpTable {
    async fn dump(&self) -> Result<String, ResolveError> {
        debug!("Running {} {:?}", self.program, self.args);

        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .await
            .map_err(|e| ResolveError::Spawn {
                program: self.program.clone(),
                source: e,
            })?;

        if !output.status.success() {
            return Err(ResolveError::CommandFailed {
                program: self.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// ARP table with fixed contents
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockArpTable {
    pub output: String,
    pub fail: bool,
}

#[cfg(test)]
impl MockArpTable {
    pub fn new(output: &str) -> Self {
        Self {
            output: output.to_string(),
            fail: false,
        }
    }

    /// A table whose command always fails to start
    pub fn failing() -> Self {
        Self {
            output: String::new(),
            fail: true,
        }
    }
}

#[cfg(test)]
#[async_trait]
impl ArpTable for MockArpTable {
    async fn dump(&self) -> Result<String, ResolveError> {
        if self.fail {
            return Err(ResolveError::Spawn {
                program: "arp".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "arp not installed"),
            });
        }
        Ok(self.output.clone())
    }
}

/// Look up the IP address currently associated with `mac`.
pub async fn find_ip_by_mac(arp: &dyn ArpTable, mac: &str) -> Result<IpAddr, ResolveError> {
    if mac.trim().is_empty() {
        return Err(ResolveError::InvalidMac {
            mac: mac.to_string(),
        });
    }

    let output = arp.dump().await?;
    scan_arp_output(&output, mac).ok_or_else(|| ResolveError::NotFound {
        mac: mac.to_string(),
    })
}

/// Scan ARP output for the first line mentioning `mac` and extract its IP.
///
/// Matching is case-insensitive and treats `-` and `:` separators alike. The
/// address is the first parenthesised token on the line, or failing that the
/// first token that parses as an IP. Matching lines without an address are
/// skipped.
pub fn scan_arp_output(output: &str, mac: &str) -> Option<IpAddr> {
    let needle = normalize_mac(mac.trim());
    if needle.is_empty() {
        return None;
    }

    output
        .lines()
        .filter(|line| normalize_mac(line).contains(&needle))
        .find_map(extract_ip)
}

/// Whether `mac` is six hex octets separated by `:` or `-`.
pub fn is_valid_mac(mac: &str) -> bool {
    let sep = if mac.contains('-') { '-' } else { ':' };
    let octets: Vec<&str> = mac.split(sep).collect();
    octets.len() == 6
        && octets
            .iter()
            .all(|o| (1..=2).contains(&o.len()) && o.chars().all(|c| c.is_ascii_hexdigit()))
}

fn normalize_mac(s: &str) -> String {
    s.to_ascii_lowercase().replace('-', ":")
}

fn extract_ip(line: &str) -> Option<IpAddr> {
    let bracketed = line
        .split_whitespace()
        .find(|t| t.starts_with('(') && t.ends_with(')'))
        .map(|t| t.trim_matches(|c| c == '(' || c == ')'));

    if let Some(token) = bracketed {
        if let Ok(ip) = token.parse() {
            return Some(ip);
        }
    }

    line.split_whitespace().find_map(|t| t.parse().ok())
}
