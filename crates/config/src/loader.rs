//! Configuration loading from multiple sources

use crate::{AppConfig, ConfigError, Result};
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use std::path::Path;

/// Prefix of environment overrides, e.g. `LAUNCHPAD_LOGGING__LEVEL=debug`
pub const ENV_PREFIX: &str = "LAUNCHPAD";

/// Configuration loader with support for multiple formats and sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file
    ///
    /// Supports TOML, YAML, and JSON formats based on file extension
    pub fn from_file(path: &Path) -> Result<AppConfig> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| ConfigError::LoadError("No file extension found".to_string()))?;

        let content = std::fs::read_to_string(path)?;

        match extension {
            "toml" => Self::from_toml(&content),
            "yaml" | "yml" => Self::from_yaml(&content),
            "json" => Self::from_json(&content),
            _ => Err(ConfigError::LoadError(format!(
                "Unsupported file extension: {}",
                extension
            ))),
        }
    }

    pub fn from_toml(content: &str) -> Result<AppConfig> {
        toml::from_str(content).map_err(ConfigError::from)
    }

    pub fn from_yaml(content: &str) -> Result<AppConfig> {
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    pub fn from_json(content: &str) -> Result<AppConfig> {
        serde_json::from_str(content).map_err(ConfigError::from)
    }

    /// Load configuration from `LAUNCHPAD_*` environment variables alone
    pub fn from_env() -> Result<AppConfig> {
        Self::builder().add_env(ENV_PREFIX).build()
    }

    /// Load a file, then apply environment overrides with the given prefix
    ///
    /// Nested keys use a double underscore: `PREFIX_EVM__RPC_URL`.
    pub fn from_file_with_env(path: &Path, env_prefix: &str) -> Result<AppConfig> {
        if !path.exists() {
            return Err(ConfigError::LoadError(format!(
                "config file {} not found",
                path.display()
            )));
        }
        Self::builder().add_file(path, true).add_env(env_prefix).build()
    }

    /// Build configuration using the config crate's builder pattern
    pub fn builder() -> ConfigLoaderBuilder {
        ConfigLoaderBuilder {
            builder: Config::builder(),
        }
    }
}

/// Builder for layered configuration loading
pub struct ConfigLoaderBuilder {
    builder: ConfigBuilder<config::builder::DefaultState>,
}

impl ConfigLoaderBuilder {
    /// Add a configuration file source
    pub fn add_file(mut self, path: &Path, required: bool) -> Self {
        let format = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => FileFormat::Yaml,
            Some("json") => FileFormat::Json,
            _ => FileFormat::Toml,
        };

        self.builder = self
            .builder
            .add_source(File::from(path).format(format).required(required));
        self
    }

    /// Add a configuration source held in memory
    pub fn add_str(mut self, content: &str, format: FileFormat) -> Self {
        self.builder = self.builder.add_source(File::from_str(content, format));
        self
    }

    /// Add environment variable source with prefix
    pub fn add_env(mut self, prefix: &str) -> Self {
        self.builder = self.builder.add_source(
            Environment::with_prefix(prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );
        self
    }

    /// Override a single key, e.g. `logging.level`
    pub fn set_override(mut self, key: &str, value: &str) -> Result<Self> {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Build the final configuration
    pub fn build(self) -> Result<AppConfig> {
        let config = self.builder.build()?;
        config.try_deserialize().map_err(ConfigError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Environment as Profile;
    use std::io::Write;

    const TOML: &str = r#"
        environment = "testnet"

        [logging]
        level = "debug"

        [evm]
        chain_id = 80002
        chain_name = "Polygon Amoy"
        rpc_url = "https://rpc-amoy.polygon.technology"
        sale_contract = "0x5FbDB2315678afecb367f032d93F642f64180aa3"
        confirmations = 2

        [evm.currency]
        name = "MATIC"
        symbol = "MATIC"
        decimals = 18
    "#;

    #[test]
    fn test_load_from_toml() {
        let config = ConfigLoader::from_toml(TOML).unwrap();
        assert_eq!(config.environment, Profile::Testnet);
        assert_eq!(config.logging.level, "debug");

        let evm = config.evm.unwrap();
        assert_eq!(evm.chain_id, 80002);
        assert_eq!(evm.confirmations, 2);
        assert_eq!(evm.confirmation.timeout_secs, 120);
        assert!(config.solana.is_none());
        assert!(config.registry.refresh_on_connect);
    }

    #[test]
    fn test_load_from_yaml() {
        let yaml = r#"
logging:
  level: warn
  json: true
solana:
  cluster: devnet
  rpc_url: "https://api.devnet.solana.com"
  program_id: "Fg6PaFpoGXkYsidMpWTK6W2BeZ7FEfcYkg476zPFsLnS"
  commitment: finalized
"#;

        let config = ConfigLoader::from_yaml(yaml).unwrap();
        assert!(config.logging.json);
        let solana = config.solana.unwrap();
        assert_eq!(solana.commitment, "finalized");
        assert_eq!(solana.token_decimals, 9);
    }

    #[test]
    fn test_load_from_json() {
        let json = r#"{ "registry": { "preflight": true, "request_timeout_ms": 1000 } }"#;

        let config = ConfigLoader::from_json(json).unwrap();
        assert!(config.registry.preflight);
        assert_eq!(config.registry.request_timeout_ms, 1000);
        assert_eq!(config.environment, Profile::Local);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(TOML.as_bytes()).unwrap();

        let config = ConfigLoader::from_file(file.path()).unwrap();
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_unsupported_extension() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        assert!(matches!(
            ConfigLoader::from_file(file.path()),
            Err(ConfigError::LoadError(_))
        ));
    }

    #[test]
    fn test_builder_override() {
        let config = ConfigLoader::builder()
            .add_str(TOML, FileFormat::Toml)
            .set_override("logging.level", "trace")
            .unwrap()
            .set_override("evm.confirmations", "5")
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(config.logging.level, "trace");
        assert_eq!(config.evm.unwrap().confirmations, 5);
    }
}
