//! # KORE configuration
//!
//! A string key/value store with immutable snapshots, in the style of
//! `app.set()` / `app.get()`. Defaults are applied first, then the
//! environment overrides them using a prefix:
//!
//! ```rust
//! use kore_core::KoreConfig;
//!
//! let mut config = KoreConfig::with_defaults();
//! config.apply_vars("KORE__", [("KORE__AUDIT__GRANULARITY", "statement")]);
//!
//! assert_eq!(config.get("audit.granularity"), Some("statement"));
//! ```
//!
//! Recognised keys:
//! - `audit.granularity`: `session` (one summary per bypass) or `statement`
//! - `http.host`, `http.port`
//! - `http.tenant_header`, `http.actor_header`
//! - `jobs.invoice_interval_secs`: scheduled invoice runs, `0` disables

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};

pub const DEFAULT_ENV_PREFIX: &str = "KORE__";

#[derive(Debug, Default, Clone)]
pub struct KoreConfig {
    values: HashMap<String, String>,
}

impl KoreConfig {
    /// Create an empty config store.
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut config = Self::new();
        config.set("audit.granularity", "session");
        config.set("http.host", "127.0.0.1");
        config.set("http.port", "3030");
        config.set("http.tenant_header", "x-agency-id");
        config.set("http.actor_header", "x-actor-id");
        config.set("jobs.invoice_interval_secs", "3600");
        config
    }

    /// Defaults overridden by `KORE__*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::with_defaults();
        config.apply_vars(DEFAULT_ENV_PREFIX, std::env::vars());
        config
    }

    /// Apply `PREFIX__A__B=value` pairs as `a.b = value`.
    pub fn apply_vars<I, K, V>(&mut self, prefix: &str, vars: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (key, value) in vars {
            if let Some(stripped) = key.as_ref().strip_prefix(prefix) {
                let normalized = stripped.to_lowercase().replace("__", ".");
                self.set(normalized, value);
            }
        }
    }

    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    pub fn snapshot(&self) -> KoreConfigSnapshot {
        KoreConfigSnapshot::new(self.values.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct KoreConfigSnapshot {
    map: HashMap<String, String>,
}

impl KoreConfigSnapshot {
    pub(crate) fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(|s| s.as_str())
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn get_u16(&self, key: &str) -> Option<u16> {
        self.get(key).and_then(|v| v.parse::<u16>().ok())
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.parse::<u64>().ok())
    }
}

/// How many audit entries a bypass session produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuditGranularity {
    /// One summary entry when the session ends.
    #[default]
    Session,
    /// One entry per bypassed statement, plus the session summary.
    Statement,
}

impl FromStr for AuditGranularity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "session" => Ok(AuditGranularity::Session),
            "statement" => Ok(AuditGranularity::Statement),
            other => Err(anyhow!("invalid audit.granularity: {other}")),
        }
    }
}

impl fmt::Display for AuditGranularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditGranularity::Session => f.write_str("session"),
            AuditGranularity::Statement => f.write_str("statement"),
        }
    }
}

/// Typed view of the tenancy-related keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenancySettings {
    pub granularity: AuditGranularity,
    pub tenant_header: String,
    pub actor_header: String,
}

impl Default for TenancySettings {
    fn default() -> Self {
        Self {
            granularity: AuditGranularity::Session,
            tenant_header: "x-agency-id".to_string(),
            actor_header: "x-actor-id".to_string(),
        }
    }
}

impl TenancySettings {
    pub fn from_snapshot(snapshot: &KoreConfigSnapshot) -> Result<Self> {
        let defaults = Self::default();
        let granularity = match snapshot.get("audit.granularity") {
            Some(v) => v.parse()?,
            None => defaults.granularity,
        };
        Ok(Self {
            granularity,
            tenant_header: snapshot
                .get_string("http.tenant_header")
                .unwrap_or(defaults.tenant_header),
            actor_header: snapshot
                .get_string("http.actor_header")
                .unwrap_or(defaults.actor_header),
        })
    }
}
