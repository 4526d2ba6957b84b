//! TOML-based application configuration.
//!
//! Stores:
//! - The goal table name and database location
//! - How often a conflicting toggle is retried
//! - The default log level
//!
//! Configuration is stored at `~/.config/xeffect/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use super::{data_dir, data_dir_path};
use crate::error::ConfigError;
use crate::service::DEFAULT_MAX_RETRIES;
use crate::store::validate_table_name;

/// Record store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_table")]
    pub table: String,
    /// Database file; `<data_dir>/xeffect.db` when unset.
    #[serde(default)]
    pub database: Option<PathBuf>,
}

/// Completion toggle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

/// Logging configuration. `RUST_LOG` takes precedence when set.
///
/// `level` is a `tracing_subscriber::EnvFilter` directive: a bare level such
/// as `warn`, or per-target directives like `xeffect_core=debug,warn`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/xeffect/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub toggle: ToggleConfig,
    #[serde(default)]
    pub log: LogConfig,
}

fn default_table() -> String {
    "xeffect_goals".into()
}
fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}
fn default_log_level() -> String {
    "warn".into()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            table: default_table(),
            database: None,
        }
    }
}

impl Default for ToggleConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => serde_json::Value::Number(
                        value
                            .parse::<u64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?
                            .into(),
                    ),
                    serde_json::Value::Object(_) => return Err(unknown()),
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Default location of the config file.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Database file to open: the configured path, or `xeffect.db` in the
    /// data directory.
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.store.database {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join("xeffect.db")),
        }
    }

    /// Check values that serde alone cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_table_name(&self.store.table).map_err(|e| ConfigError::InvalidValue {
            key: "store.table".into(),
            message: e.to_string(),
        })?;
        EnvFilter::try_new(&self.log.level).map_err(|e| ConfigError::InvalidValue {
            key: "log.level".into(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Load from the default location, writing defaults if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults there if the file is missing.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match Self::peek_at(path)? {
            Some(cfg) => Ok(cfg),
            None => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
        }
    }

    /// Read the config at the default location without creating anything.
    /// `Ok(None)` when no file exists yet.
    pub fn peek() -> Result<Option<Self>, ConfigError> {
        Self::peek_at(&data_dir_path().join("config.toml"))
    }

    /// Read and validate the config at `path`; `Ok(None)` when it is missing.
    pub fn peek_at(path: &Path) -> Result<Option<Self>, ConfigError> {
        let load_failed = |message: String| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(load_failed(e.to_string())),
        };
        let cfg: Config = toml::from_str(&content).map_err(|e| load_failed(e.to_string()))?;
        cfg.validate()?;
        Ok(Some(cfg))
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Persist to `path`.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => Some(String::new()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key. The config is unchanged if
    /// the key is unknown or the new value is invalid.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Every leaf key with its current value, sorted by key.
    pub fn entries(&self) -> Vec<(String, String)> {
        let mut entries = Vec::new();
        if let Ok(serde_json::Value::Object(sections)) = serde_json::to_value(self) {
            for (section, fields) in sections {
                if let serde_json::Value::Object(fields) = fields {
                    for name in fields.keys() {
                        let key = format!("{section}.{name}");
                        let value = self.get(&key).unwrap_or_default();
                        entries.push((key, value));
                    }
                }
            }
        }
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.store.table, "xeffect_goals");
        assert_eq!(parsed.toggle.max_retries, 3);
        assert!(parsed.store.database.is_none());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[store]\ntable = \"goals\"\n").unwrap();
        assert_eq!(parsed.store.table, "goals");
        assert_eq!(parsed.log.level, "warn");
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("store.table").as_deref(), Some("xeffect_goals"));
        assert_eq!(cfg.get("toggle.max_retries").as_deref(), Some("3"));
        assert!(cfg.get("store.missing_key").is_none());
        assert!(cfg.get("").is_none());
    }

    #[test]
    fn set_updates_number_and_string() {
        let mut cfg = Config::default();
        cfg.set("toggle.max_retries", "5").unwrap();
        cfg.set("log.level", "debug").unwrap();
        cfg.set("store.database", "/tmp/goals.db").unwrap();
        assert_eq!(cfg.toggle.max_retries, 5);
        assert_eq!(cfg.log.level, "debug");
        assert_eq!(cfg.store.database, Some(PathBuf::from("/tmp/goals.db")));
    }

    #[test]
    fn set_rejects_unknown_key_and_bad_values() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set("store.nonexistent", "x"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(cfg.set("store", "x"), Err(ConfigError::UnknownKey(_))));
        assert!(matches!(
            cfg.set("toggle.max_retries", "many"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(cfg.set("store.table", "bad table").is_err());
        assert!(cfg.set("log.level", "xeffect_core=loud").is_err());
        assert_eq!(cfg.store.table, "xeffect_goals");
        assert_eq!(cfg.log.level, "warn");
    }

    #[test]
    fn log_level_accepts_filter_directives() {
        let mut cfg = Config::default();
        cfg.set("log.level", "xeffect_core=debug,warn").unwrap();
        assert_eq!(cfg.log.level, "xeffect_core=debug,warn");
        cfg.set("log.level", "INFO").unwrap();

        for bad in ["xeffect_core=loud", "warn,xeffect_cli=verbose"] {
            assert!(
                matches!(cfg.set("log.level", bad), Err(ConfigError::InvalidValue { .. })),
                "{bad} should be rejected"
            );
        }
        assert_eq!(cfg.log.level, "INFO");
    }

    #[test]
    fn entries_list_every_leaf() {
        let keys: Vec<String> = Config::default().entries().into_iter().map(|(k, _)| k).collect();
        for key in ["store.table", "store.database", "toggle.max_retries", "log.level"] {
            assert!(keys.iter().any(|k| k == key), "missing {key}");
        }
    }

    #[test]
    fn load_from_writes_defaults_then_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let cfg = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(cfg.store.table, "xeffect_goals");

        let mut cfg = cfg;
        cfg.set("store.table", "habit_goals").unwrap();
        cfg.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().store.table, "habit_goals");
    }

    #[test]
    fn peek_at_never_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        assert!(Config::peek_at(&path).unwrap().is_none());
        assert!(!path.exists());

        std::fs::write(&path, "[log]\nlevel = \"debug\"\n").unwrap();
        let cfg = Config::peek_at(&path).unwrap().unwrap();
        assert_eq!(cfg.log.level, "debug");
        assert_eq!(cfg.store.table, "xeffect_goals");

        std::fs::write(&path, "not = [toml").unwrap();
        assert!(matches!(
            Config::peek_at(&path),
            Err(ConfigError::LoadFailed { .. })
        ));
    }

    #[test]
    fn load_from_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[store]\ntable = \"x; drop\"\n").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::InvalidValue { .. })
        ));

        std::fs::write(&path, "not = [toml").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::LoadFailed { .. })
        ));
    }
}
