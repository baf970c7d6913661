//! Engine configuration loading and representation.

use std::num::NonZeroUsize;
use std::time::Duration;

use stockrec_inventory::DEFAULT_LOOKBACK;

pub const LEDGER_TIMEOUT_ENV: &str = "STOCKREC_LEDGER_TIMEOUT_MS";
pub const CMM_LOOKBACK_ENV: &str = "STOCKREC_CMM_LOOKBACK";
pub const EXPORT_DELIMITER_ENV: &str = "STOCKREC_EXPORT_DELIMITER";

const DEFAULT_CMM_LOOKBACK: NonZeroUsize = NonZeroUsize::new(DEFAULT_LOOKBACK).unwrap();

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Upper bound for every ledger and catalog call.
    pub ledger_timeout: Duration,
    /// Number of completed windows averaged for CMM.
    pub cmm_lookback: NonZeroUsize,
    /// Field delimiter of the inventory export.
    pub export_delimiter: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ledger_timeout: Duration::from_secs(5),
            cmm_lookback: DEFAULT_CMM_LOOKBACK,
            export_delimiter: b',',
        }
    }
}

impl EngineConfig {
    /// Read overrides from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup. Unparseable values are logged and
    /// the default is kept.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(LEDGER_TIMEOUT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => config.ledger_timeout = Duration::from_millis(ms),
                _ => tracing::warn!(key = LEDGER_TIMEOUT_ENV, value = %raw, "ignoring invalid ledger timeout"),
            }
        }

        if let Some(raw) = lookup(CMM_LOOKBACK_ENV) {
            match raw.trim().parse::<NonZeroUsize>() {
                Ok(n) => config.cmm_lookback = n,
                _ => tracing::warn!(key = CMM_LOOKBACK_ENV, value = %raw, "ignoring invalid CMM lookback"),
            }
        }

        if let Some(raw) = lookup(EXPORT_DELIMITER_ENV) {
            match parse_delimiter(&raw) {
                Some(d) => config.export_delimiter = d,
                None => tracing::warn!(key = EXPORT_DELIMITER_ENV, value = %raw, "ignoring invalid export delimiter"),
            }
        }

        config
    }
}

fn parse_delimiter(raw: &str) -> Option<u8> {
    match raw {
        "\\t" | "tab" => Some(b'\t'),
        _ => match raw.as_bytes() {
            [b] if b.is_ascii() && !b.is_ascii_alphanumeric() && *b != b'"' => Some(*b),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_without_overrides() {
        let config = EngineConfig::from_lookup(lookup(&[]));
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.ledger_timeout, Duration::from_secs(5));
        assert_eq!(config.cmm_lookback.get(), 3);
        assert_eq!(config.export_delimiter, b',');
    }

    #[test]
    fn overrides_are_read() {
        let config = EngineConfig::from_lookup(lookup(&[
            (LEDGER_TIMEOUT_ENV, "250"),
            (CMM_LOOKBACK_ENV, "6"),
            (EXPORT_DELIMITER_ENV, ";"),
        ]));
        assert_eq!(config.ledger_timeout, Duration::from_millis(250));
        assert_eq!(config.cmm_lookback.get(), 6);
        assert_eq!(config.export_delimiter, b';');

        let tabs = EngineConfig::from_lookup(lookup(&[(EXPORT_DELIMITER_ENV, "tab")]));
        assert_eq!(tabs.export_delimiter, b'\t');
    }

    #[test]
    fn invalid_values_keep_defaults() {
        let config = EngineConfig::from_lookup(lookup(&[
            (LEDGER_TIMEOUT_ENV, "soon"),
            (CMM_LOOKBACK_ENV, "0"),
            (EXPORT_DELIMITER_ENV, "ab"),
        ]));
        assert_eq!(config, EngineConfig::default());
    }
}
