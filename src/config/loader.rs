// src/config/loader.rs
//! Layered configuration loader: defaults, TOML files, then environment overrides

use crate::config::{constants::paths, ScreeningConfig};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Configuration loader merging files in precedence order
pub struct ConfigLoader {
    config_paths: Vec<PathBuf>,
    env_prefix: String,
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),
    #[error("Configuration parse error: {0}")]
    ParseError(String),
    #[error("Configuration validation errors: {}", .0.join("; "))]
    ValidationError(Vec<String>),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl ConfigLoader {
    /// Create loader with the standard search paths
    pub fn new() -> Self {
        Self::with_paths(Self::discover_config_paths())
    }

    /// Create loader with custom paths, later paths taking precedence
    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            config_paths: paths,
            env_prefix: paths::ENV_PREFIX.to_string(),
        }
    }

    /// Override the environment variable prefix
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Configured search paths
    pub fn config_paths(&self) -> &[PathBuf] {
        &self.config_paths
    }

    /// Load, merge and validate configuration
    pub fn load(&self) -> Result<ScreeningConfig, ConfigError> {
        let mut merged = toml::Value::try_from(ScreeningConfig::default())
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        for config_path in &self.config_paths {
            if !config_path.exists() {
                continue;
            }
            let overlay = self.load_config_file(config_path)?;
            debug!(path = %config_path.display(), "merging configuration file");
            merge_toml_values(&mut merged, overlay);
        }

        self.apply_environment_overrides(&mut merged);

        let config: ScreeningConfig = merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError(e.to_string()))?;

        config
            .validate_consistency()
            .map_err(ConfigError::ValidationError)?;

        Ok(config)
    }

    /// Validate a single configuration file without merging
    pub fn validate_config_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: ScreeningConfig = toml::from_str(&content)?;
        config
            .validate_consistency()
            .map_err(ConfigError::ValidationError)
    }

    /// Write a configuration to a TOML file
    pub fn export_config<P: AsRef<Path>>(
        &self,
        config: &ScreeningConfig,
        path: P,
    ) -> Result<(), ConfigError> {
        let toml_content =
            toml::to_string_pretty(config).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    fn load_config_file(&self, path: &Path) -> Result<toml::Value, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// `VITASCREEN_RPPG_SAMPLE_RATE_HZ=25` sets `rppg.sample_rate_hz`
    fn apply_environment_overrides(&self, config: &mut toml::Value) {
        for (key, value) in std::env::vars() {
            let Some(stripped) = key.strip_prefix(&self.env_prefix) else {
                continue;
            };
            let lowered = stripped.to_lowercase();
            let Some((section, field)) = lowered.split_once('_') else {
                warn!(variable = %key, "ignoring override without a section");
                continue;
            };
            debug!(section, field, "applying environment override");
            set_nested_value(config, section, field, parse_env_value(&value));
        }
    }

    fn discover_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(paths::SYSTEM_CONFIG_PATH)];

        if let Some(home_dir) = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) {
            paths.push(PathBuf::from(home_dir).join(paths::USER_CONFIG_DIR).join("config.toml"));
        }

        paths.push(PathBuf::from(paths::DEFAULT_CONFIG_FILE));
        paths.push(PathBuf::from(paths::LOCAL_CONFIG_FILE));
        paths
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn merge_toml_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                if let Some(base_value) = base_table.get_mut(&key) {
                    merge_toml_values(base_value, value);
                } else {
                    base_table.insert(key, value);
                }
            }
        }
        (base_value, overlay_value) => {
            *base_value = overlay_value;
        }
    }
}

fn parse_env_value(value: &str) -> toml::Value {
    if let Ok(int_val) = value.parse::<i64>() {
        toml::Value::Integer(int_val)
    } else if let Ok(float_val) = value.parse::<f64>() {
        toml::Value::Float(float_val)
    } else if let Ok(bool_val) = value.parse::<bool>() {
        toml::Value::Boolean(bool_val)
    } else {
        toml::Value::String(value.to_string())
    }
}

fn set_nested_value(config: &mut toml::Value, section: &str, field: &str, value: toml::Value) {
    if let toml::Value::Table(root) = config {
        let entry = root
            .entry(section.to_string())
            .or_insert_with(|| toml::Value::Table(toml::value::Table::new()));
        if let toml::Value::Table(table) = entry {
            // Integer overrides of float fields keep the float type
            let value = match (table.get(field), value) {
                (Some(toml::Value::Float(_)), toml::Value::Integer(i)) => toml::Value::Float(i as f64),
                (_, v) => v,
            };
            table.insert(field.to_string(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_loader_creation() {
        let loader = ConfigLoader::new();
        assert!(!loader.config_paths().is_empty());
    }

    #[test]
    #[serial]
    fn test_load_defaults_without_files() {
        let loader = ConfigLoader::with_paths(vec![PathBuf::from("/nonexistent/vitascreen.toml")]);
        let config = loader.load().unwrap();
        assert_eq!(config, ScreeningConfig::default());
    }

    #[test]
    #[serial]
    fn test_file_overlay() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[rppg]
max_buffer_samples = 600

[hearing]
start_level_db_hl = 30.0
        "#
        )
        .unwrap();

        let loader = ConfigLoader::with_paths(vec![temp_file.path().to_path_buf()]);
        let config = loader.load().unwrap();
        assert_eq!(config.rppg.max_buffer_samples, 600);
        assert_eq!(config.rppg.sample_rate_hz, 30.0);
        assert_eq!(config.hearing.start_level_db_hl, 30.0);
    }

    #[test]
    fn test_invalid_config_validation() {
        let loader = ConfigLoader::with_paths(vec![]);
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[rppg]\nmax_buffer_samples = 100\n").unwrap();

        let result = loader.validate_config_file(temp_file.path());
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    #[serial]
    fn test_environment_override() {
        let prefix = "VSTEST_LOADER_";
        std::env::set_var("VSTEST_LOADER_RPPG_SAMPLE_RATE_HZ", "25");

        let loader = ConfigLoader::with_paths(vec![]).with_env_prefix(prefix);
        let config = loader.load().unwrap();
        assert_eq!(config.rppg.sample_rate_hz, 25.0);

        std::env::remove_var("VSTEST_LOADER_RPPG_SAMPLE_RATE_HZ");
    }

    #[test]
    fn test_config_export() {
        let loader = ConfigLoader::with_paths(vec![]);
        let temp_file = NamedTempFile::new().unwrap();

        loader
            .export_config(&ScreeningConfig::default(), temp_file.path())
            .unwrap();

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(content.contains("[rppg]"));
        assert!(content.contains("[hearing]"));
    }
}
