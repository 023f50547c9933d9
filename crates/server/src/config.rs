//! TOML configuration.
//!
//! Each section maps onto the owning service's config type; bounds are
//! enforced by those constructors, not here.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use chatdesk_outbox::OutboxConfig;
use chatdesk_scheduler::{ManagerLoadConfig, SchedulerConfig};

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub log: LogConfig,
    pub services: ServicesConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct ServicesConfig {
    pub outbox: OutboxSection,
    pub manager_load: ManagerLoadSection,
    pub scheduler: SchedulerSection,
    pub msg_producer: MsgProducerSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutboxSection {
    pub workers: usize,
    pub idle_time_ms: u64,
    pub reserve_for_ms: u64,
}

impl Default for OutboxSection {
    fn default() -> Self {
        let defaults = OutboxConfig::default();
        Self {
            workers: defaults.workers,
            idle_time_ms: defaults.idle_time.as_millis() as u64,
            reserve_for_ms: defaults.reserve_for.as_millis() as u64,
        }
    }
}

impl From<&OutboxSection> for OutboxConfig {
    fn from(s: &OutboxSection) -> Self {
        Self {
            workers: s.workers,
            idle_time: Duration::from_millis(s.idle_time_ms),
            reserve_for: Duration::from_millis(s.reserve_for_ms),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ManagerLoadSection {
    pub max_problems_at_time: usize,
}

impl Default for ManagerLoadSection {
    fn default() -> Self {
        Self {
            max_problems_at_time: ManagerLoadConfig::default().max_problems_at_time,
        }
    }
}

impl From<&ManagerLoadSection> for ManagerLoadConfig {
    fn from(s: &ManagerLoadSection) -> Self {
        Self {
            max_problems_at_time: s.max_problems_at_time,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulerSection {
    pub period_ms: u64,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            period_ms: SchedulerConfig::default().period.as_millis() as u64,
        }
    }
}

impl From<&SchedulerSection> for SchedulerConfig {
    fn from(s: &SchedulerSection) -> Self {
        Self {
            period: Duration::from_millis(s.period_ms),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct MsgProducerSection {
    /// Hex-encoded 256-bit key; empty means plaintext.
    pub encrypt_key: String,
}

impl MsgProducerSection {
    pub fn encrypt_key(&self) -> Option<&str> {
        if self.encrypt_key.is_empty() {
            None
        } else {
            Some(&self.encrypt_key)
        }
    }
}

impl Config {
    /// Parse the file, or fall back to defaults when it does not exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parse config {}", path.display()))
    }
}
