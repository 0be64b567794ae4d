//! Gate configuration.
//!
//! Loaded from `--config <path>` or `<marketplace>/marketgate.toml`. No file
//! means defaults; a file that does not parse is fatal.

use crate::core::error::GateError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "marketgate.toml";

/// Fixed locations inside a console checkout.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConsoleLayout {
    pub registry_source: PathBuf,
    pub hooks_dir: PathBuf,
    pub locale_file: PathBuf,
}

impl Default for ConsoleLayout {
    fn default() -> Self {
        Self {
            registry_source: PathBuf::from("web/src/components/cards/cardRegistry.ts"),
            hooks_dir: PathBuf::from("web/src/hooks"),
            locale_file: PathBuf::from("web/src/locales/en/cards.json"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProbeConfig {
    pub timeout_secs: u64,
    pub workers: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            workers: 8,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct GateConfig {
    pub console: ConsoleLayout,
    pub probe: ProbeConfig,
    /// Card types ending with this are generated at runtime by the console.
    pub dynamic_suffix: String,
    /// File-name prefix of CNCF presets under `presets/`.
    pub cncf_prefix: String,
    pub stale_after_days: i64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            console: ConsoleLayout::default(),
            probe: ProbeConfig::default(),
            dynamic_suffix: "_status".to_string(),
            cncf_prefix: "cncf-".to_string(),
            stale_after_days: 30,
        }
    }
}

impl GateConfig {
    pub fn is_dynamic(&self, card_type: &str) -> bool {
        !self.dynamic_suffix.is_empty() && card_type.ends_with(&self.dynamic_suffix)
    }

    pub fn parse(content: &str) -> Result<Self, GateError> {
        let config: GateConfig =
            toml::from_str(content).map_err(|e| GateError::ConfigError(e.to_string()))?;
        if config.probe.workers == 0 {
            return Err(GateError::ConfigError(
                "probe.workers must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }

    /// Explicit path wins; otherwise `marketgate.toml` in the marketplace root.
    pub fn load(explicit: Option<&Path>, marketplace_root: &Path) -> Result<Self, GateError> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => {
                let p = marketplace_root.join(CONFIG_FILE);
                if !p.is_file() {
                    return Ok(Self::default());
                }
                p
            }
        };
        let content = fs::read_to_string(&path).map_err(|e| {
            GateError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config = Self::parse(&content)
            .map_err(|e| GateError::ConfigError(format!("{}: {}", path.display(), e)))?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_without_file() {
        let tmp = tempdir().unwrap();
        let config = GateConfig::load(None, tmp.path()).unwrap();
        assert_eq!(config, GateConfig::default());
        assert!(config.is_dynamic("custom_status"));
        assert!(!config.is_dynamic("status_board"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let tmp = tempdir().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE),
            "stale_after_days = 7\n[probe]\nworkers = 2\n",
        )
        .unwrap();
        let config = GateConfig::load(None, tmp.path()).unwrap();
        assert_eq!(config.stale_after_days, 7);
        assert_eq!(config.probe.workers, 2);
        assert_eq!(config.probe.timeout_secs, 10);
        assert_eq!(config.console, ConsoleLayout::default());
    }

    #[test]
    fn test_invalid_file_is_fatal() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("custom.toml");
        fs::write(&path, "stale_after_days = \"soon\"").unwrap();
        assert!(matches!(
            GateConfig::load(Some(&path), tmp.path()),
            Err(GateError::ConfigError(_))
        ));
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert!(GateConfig::parse("[probe]\nworkers = 0\n").is_err());
    }
}
