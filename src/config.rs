use std::path::PathBuf;

use chrono_tz::Tz;

use crate::clock::DEFAULT_TZ;

/// Process configuration, read from `BAYSCHED_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub timezone: Tz,
    pub metrics_port: Option<u16>,
    /// Journal appends between compactions.
    pub compact_threshold: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            timezone: DEFAULT_TZ,
            metrics_port: None,
            compact_threshold: 1000,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let timezone = match lookup("BAYSCHED_TZ") {
            Some(name) => name.parse::<Tz>().unwrap_or_else(|e| {
                tracing::warn!("invalid BAYSCHED_TZ '{name}': {e}, falling back to {DEFAULT_TZ}");
                DEFAULT_TZ
            }),
            None => defaults.timezone,
        };
        Self {
            data_dir: lookup("BAYSCHED_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            timezone,
            metrics_port: lookup("BAYSCHED_METRICS_PORT").and_then(|s| s.parse().ok()),
            compact_threshold: lookup("BAYSCHED_COMPACT_THRESHOLD")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.compact_threshold),
        }
    }

    pub fn journal_path(&self) -> PathBuf {
        self.data_dir.join("baysched.wal")
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
    fn defaults_when_unset() {
        let cfg = Config::from_lookup(lookup(&[]));
        assert_eq!(cfg.data_dir, PathBuf::from("./data"));
        assert_eq!(cfg.timezone, DEFAULT_TZ);
        assert_eq!(cfg.metrics_port, None);
        assert_eq!(cfg.compact_threshold, 1000);
    }

    #[test]
    fn reads_overrides() {
        let cfg = Config::from_lookup(lookup(&[
            ("BAYSCHED_DATA_DIR", "/var/lib/baysched"),
            ("BAYSCHED_TZ", "America/Manaus"),
            ("BAYSCHED_METRICS_PORT", "9100"),
            ("BAYSCHED_COMPACT_THRESHOLD", "50"),
        ]));
        assert_eq!(cfg.journal_path(), PathBuf::from("/var/lib/baysched/baysched.wal"));
        assert_eq!(cfg.timezone, chrono_tz::America::Manaus);
        assert_eq!(cfg.metrics_port, Some(9100));
        assert_eq!(cfg.compact_threshold, 50);
    }

    #[test]
    fn bad_values_fall_back() {
        let cfg = Config::from_lookup(lookup(&[
            ("BAYSCHED_TZ", "Mars/Olympus"),
            ("BAYSCHED_METRICS_PORT", "not-a-port"),
        ]));
        assert_eq!(cfg.timezone, DEFAULT_TZ);
        assert_eq!(cfg.metrics_port, None);
    }
}
