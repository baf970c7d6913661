//! API configuration loading and representation.

use std::net::SocketAddr;

use anyhow::Context;

use stockrec_infra::EngineConfig;

pub const BIND_ADDR_ENV: &str = "STOCKREC_BIND_ADDR";
pub const COUNT_ROLES_ENV: &str = "STOCKREC_COUNT_ROLES";

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_COUNT_ROLES: [&str; 2] = ["manager", "super_admin"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    /// Roles allowed to submit physical counts.
    pub count_roles: Vec<String>,
    pub engine: EngineConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            count_roles: DEFAULT_COUNT_ROLES.iter().map(|r| r.to_string()).collect(),
            engine: EngineConfig::default(),
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// A malformed bind address is fatal; an empty role list falls back to the
    /// defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self {
            engine: EngineConfig::from_lookup(&lookup),
            ..Self::default()
        };

        if let Some(raw) = lookup(BIND_ADDR_ENV) {
            config.bind_addr = raw
                .trim()
                .parse()
                .with_context(|| format!("{BIND_ADDR_ENV} is not a socket address: {raw}"))?;
        }

        if let Some(raw) = lookup(COUNT_ROLES_ENV) {
            let roles = parse_roles(&raw);
            if roles.is_empty() {
                tracing::warn!(key = COUNT_ROLES_ENV, "no count roles configured; keeping defaults");
            } else {
                config.count_roles = roles;
            }
        }

        Ok(config)
    }

    pub fn may_submit_counts(&self, role: &str) -> bool {
        self.count_roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }
}

fn parse_roles(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|r| r.trim().to_ascii_lowercase())
        .filter(|r| !r.is_empty())
        .collect()
}
