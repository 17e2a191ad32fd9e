use clap::ValueEnum;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::cli::{CommonArgs, VerbosityLevel};
use crate::external_tool::DEFAULT_PROGRAM;
use crate::http_client::HttpClientConfig;
use crate::schema_fetcher::IPXACT_SCHEMA_URL;
use crate::validator::{InvalidDocumentPolicy, ValidatorConfig};

/// Prefix of every environment override
pub const ENV_PREFIX: &str = "IPXACT_VALIDATE_";

const CONFIG_NAMES: [&str; 4] = [
    "ipxact-validate.toml",
    "ipxact-validate.json",
    ".ipxact-validate.toml",
    ".ipxact-validate.json",
];

/// Trait for abstracting environment variable access
pub trait EnvProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// System environment variable provider for production use
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable error: {0}")]
    Environment(String),

    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub schema: SchemaConfig,
    pub network: NetworkConfig,
    pub validation: ValidationConfig,
    pub output: OutputConfig,
}

/// Where the schema comes from and where it is stored
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchemaConfig {
    pub url: String,
    /// Download directory; each binary has its own default
    pub directory: Option<PathBuf>,
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    /// HTTP request timeout in seconds, `0` disables it
    pub timeout_seconds: u64,
    /// Number of retry attempts for failed downloads
    pub retry_attempts: u32,
    /// Retry delay in milliseconds
    pub retry_delay_ms: u64,
}

/// Validation behaviour
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ValidationConfig {
    pub on_invalid: InvalidDocumentPolicy,
    /// External validator program
    pub xmllint: String,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct OutputConfig {
    pub verbose: bool,
    pub quiet: bool,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            url: IPXACT_SCHEMA_URL.to_string(),
            directory: None,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            retry_attempts: 3,
            retry_delay_ms: 1000,
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            on_invalid: InvalidDocumentPolicy::default(),
            xmllint: DEFAULT_PROGRAM.to_string(),
        }
    }
}

impl Config {
    pub fn verbosity(&self) -> VerbosityLevel {
        VerbosityLevel::from_flags(self.output.verbose, self.output.quiet)
    }

    pub fn schema_dir(&self, default_dir: &Path) -> PathBuf {
        self.schema
            .directory
            .clone()
            .unwrap_or_else(|| default_dir.to_path_buf())
    }

    pub fn http_client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            timeout_seconds: self.network.timeout_seconds,
            retry_attempts: self.network.retry_attempts,
            retry_delay_ms: self.network.retry_delay_ms,
            ..Default::default()
        }
    }

    pub fn validator_config(&self, default_dir: &Path) -> ValidatorConfig {
        ValidatorConfig {
            schema_url: self.schema.url.clone(),
            schema_dir: self.schema_dir(default_dir),
            on_invalid: self.validation.on_invalid,
        }
    }
}

/// Configuration manager for loading and merging configurations
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration with precedence: defaults -> file -> environment -> CLI
    pub async fn load_config(args: &CommonArgs) -> Result<Config> {
        Self::load_config_with(args, &SystemEnvProvider, &Self::search_dirs()).await
    }

    /// [`Self::load_config`] with an explicit environment and config search path
    pub async fn load_config_with(
        args: &CommonArgs,
        env: &impl EnvProvider,
        search_dirs: &[PathBuf],
    ) -> Result<Config> {
        let mut config = match &args.config {
            Some(config_path) => Self::load_from_file(config_path).await?,
            None => match Self::find_config_file_in(search_dirs) {
                Some(found) => {
                    tracing::debug!(path = %found.display(), "using configuration file");
                    Self::load_from_file(&found).await?
                }
                None => Config::default(),
            },
        };

        config = Self::apply_environment_overrides_with(env, config)?;
        config = Self::merge_with_cli(config, args);

        Self::validate_config(&config)?;

        Ok(config)
    }

    /// Load configuration from a file (TOML or JSON); absent keys take their defaults
    pub async fn load_from_file(path: &Path) -> Result<Config> {
        let content = tokio::fs::read_to_string(path).await?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => {
                // Try to parse as TOML first, then JSON
                if let Ok(config) = toml::from_str::<Config>(&content) {
                    Ok(config)
                } else {
                    Ok(serde_json::from_str(&content)?)
                }
            }
        }
    }

    /// Working directory first, then the user config directory
    pub fn search_dirs() -> Vec<PathBuf> {
        let mut dirs = vec![PathBuf::from(".")];
        if let Some(config_dir) = dirs::config_dir() {
            dirs.push(config_dir.join("ipxact-validate"));
        }
        dirs
    }

    /// First existing config file in `dirs`, trying every known name per directory
    pub fn find_config_file_in(dirs: &[PathBuf]) -> Option<PathBuf> {
        dirs.iter()
            .flat_map(|dir| CONFIG_NAMES.iter().map(move |name| dir.join(name)))
            .find(|path| path.is_file())
    }

    /// Apply environment variable overrides with a custom environment provider
    pub fn apply_environment_overrides_with(
        env: &impl EnvProvider,
        mut config: Config,
    ) -> Result<Config> {
        let var = |name: &str| env.get(&format!("{}{}", ENV_PREFIX, name));

        // Schema settings
        if let Some(url) = var("SCHEMA_URL") {
            config.schema.url = url;
        }

        if let Some(dir) = var("SCHEMA_DIR") {
            config.schema.directory = Some(PathBuf::from(dir));
        }

        // Network settings
        if let Some(timeout) = var("TIMEOUT") {
            config.network.timeout_seconds = parse_env("TIMEOUT", &timeout)?;
        }

        if let Some(retry_attempts) = var("RETRY_ATTEMPTS") {
            config.network.retry_attempts = parse_env("RETRY_ATTEMPTS", &retry_attempts)?;
        }

        if let Some(retry_delay) = var("RETRY_DELAY_MS") {
            config.network.retry_delay_ms = parse_env("RETRY_DELAY_MS", &retry_delay)?;
        }

        // Validation settings
        if let Some(policy) = var("ON_INVALID") {
            config.validation.on_invalid =
                InvalidDocumentPolicy::from_str(&policy, true).map_err(|_| {
                    ConfigError::Environment(format!(
                        "Invalid {}ON_INVALID value: {}",
                        ENV_PREFIX, policy
                    ))
                })?;
        }

        if let Some(program) = var("XMLLINT") {
            config.validation.xmllint = program;
        }

        // Output settings
        if let Some(verbose) = var("VERBOSE") {
            config.output.verbose = parse_env("VERBOSE", &verbose)?;
        }

        if let Some(quiet) = var("QUIET") {
            config.output.quiet = parse_env("QUIET", &quiet)?;
        }

        Ok(config)
    }

    /// Merge CLI arguments with configuration (CLI takes precedence)
    pub fn merge_with_cli(mut config: Config, args: &CommonArgs) -> Config {
        if let Some(url) = &args.schema_url {
            config.schema.url = url.clone();
        }
        if let Some(dir) = &args.schema_dir {
            config.schema.directory = Some(dir.clone());
        }
        if let Some(timeout) = args.timeout {
            config.network.timeout_seconds = timeout;
        }
        if let Some(retry_attempts) = args.retry_attempts {
            config.network.retry_attempts = retry_attempts;
        }
        if let Some(policy) = args.on_invalid {
            config.validation.on_invalid = policy;
        }
        if let Some(program) = &args.xmllint {
            config.validation.xmllint = program.clone();
        }

        // A flag on the command line replaces whichever mode the config selected
        if args.verbose {
            config.output.verbose = true;
            config.output.quiet = false;
        }
        if args.quiet {
            config.output.quiet = true;
            config.output.verbose = false;
        }

        config
    }

    /// Validate configuration values
    pub fn validate_config(config: &Config) -> Result<()> {
        let url = Url::parse(&config.schema.url).map_err(|e| {
            ConfigError::Validation(format!("Invalid schema URL '{}': {}", config.schema.url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Validation(format!(
                "Schema URL must use http or https: {}",
                config.schema.url
            )));
        }

        if let Some(dir) = &config.schema.directory
            && dir.as_os_str().is_empty()
        {
            return Err(ConfigError::Validation(
                "Schema directory cannot be empty".to_string(),
            ));
        }

        if config.network.retry_attempts > 10 {
            return Err(ConfigError::Validation(
                "Retry attempts cannot exceed 10".to_string(),
            ));
        }

        if config.validation.xmllint.trim().is_empty() {
            return Err(ConfigError::Validation(
                "External validator program cannot be empty".to_string(),
            ));
        }

        if config.output.verbose && config.output.quiet {
            return Err(ConfigError::Validation(
                "Cannot enable both verbose and quiet modes".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        ConfigError::Environment(format!("Invalid {}{} value: {}", ENV_PREFIX, name, value))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    /// Mock environment variable provider for testing
    #[derive(Default)]
    struct MockEnvProvider {
        vars: HashMap<String, String>,
    }

    impl MockEnvProvider {
        fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
            self.vars.insert(key.into(), value.into());
        }
    }

    impl EnvProvider for MockEnvProvider {
        fn get(&self, key: &str) -> Option<String> {
            self.vars.get(key).cloned()
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.schema.url, IPXACT_SCHEMA_URL);
        assert_eq!(config.schema.directory, None);
        assert_eq!(config.network.timeout_seconds, 30);
        assert_eq!(config.network.retry_attempts, 3);
        assert_eq!(config.network.retry_delay_ms, 1000);
        assert_eq!(config.validation.on_invalid, InvalidDocumentPolicy::Report);
        assert_eq!(config.validation.xmllint, "xmllint");
        assert_eq!(config.verbosity(), VerbosityLevel::Normal);
        assert!(ConfigManager::validate_config(&config).is_ok());
    }

    #[tokio::test]
    async fn test_load_toml_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let toml_content = r#"
[schema]
url = "https://mirror.example.org/ipxact/index.xsd"
directory = "/var/lib/ipxact"

[network]
timeout_seconds = 60
retry_attempts = 5

[validation]
on_invalid = "fallback"
xmllint = "/opt/libxml2/bin/xmllint"

[output]
verbose = true
"#;
        fs::write(&config_path, toml_content).unwrap();

        let config = ConfigManager::load_from_file(&config_path).await.unwrap();

        assert_eq!(config.schema.url, "https://mirror.example.org/ipxact/index.xsd");
        assert_eq!(config.schema.directory, Some(PathBuf::from("/var/lib/ipxact")));
        assert_eq!(config.network.timeout_seconds, 60);
        assert_eq!(config.network.retry_attempts, 5);
        // Missing keys keep their defaults
        assert_eq!(config.network.retry_delay_ms, 1000);
        assert_eq!(config.validation.on_invalid, InvalidDocumentPolicy::Fallback);
        assert_eq!(config.validation.xmllint, "/opt/libxml2/bin/xmllint");
        assert!(config.output.verbose);
        assert!(!config.output.quiet);
    }

    #[tokio::test]
    async fn test_load_json_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let json_content = r#"{
  "network": { "timeout_seconds": 0, "retry_attempts": 1, "retry_delay_ms": 250 },
  "output": { "quiet": true }
}"#;
        fs::write(&config_path, json_content).unwrap();

        let config = ConfigManager::load_from_file(&config_path).await.unwrap();

        assert_eq!(config.network.timeout_seconds, 0);
        assert_eq!(config.network.retry_attempts, 1);
        assert_eq!(config.network.retry_delay_ms, 250);
        assert_eq!(config.schema.url, IPXACT_SCHEMA_URL);
        assert_eq!(config.verbosity(), VerbosityLevel::Quiet);
    }

    #[tokio::test]
    async fn test_unsupported_file_format() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        fs::write(&config_path, "schema: {}").unwrap();

        match ConfigManager::load_from_file(&config_path).await {
            Err(ConfigError::UnsupportedFormat(ext)) => assert_eq!(ext, "yaml"),
            other => panic!("Expected UnsupportedFormat, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "[network\ntimeout_seconds = ").unwrap();

        let result = ConfigManager::load_from_file(&config_path).await;
        assert!(matches!(result, Err(ConfigError::TomlParsing(_))));
    }

    #[tokio::test]
    async fn test_invalid_json() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        fs::write(&config_path, "{ \"network\": ").unwrap();

        let result = ConfigManager::load_from_file(&config_path).await;
        assert!(matches!(result, Err(ConfigError::JsonParsing(_))));
    }

    #[test]
    fn test_environment_overrides() {
        let mut env = MockEnvProvider::default();
        env.set("IPXACT_VALIDATE_SCHEMA_URL", "http://localhost:8080/index.xsd");
        env.set("IPXACT_VALIDATE_SCHEMA_DIR", "/tmp/schemas");
        env.set("IPXACT_VALIDATE_TIMEOUT", "5");
        env.set("IPXACT_VALIDATE_RETRY_ATTEMPTS", "0");
        env.set("IPXACT_VALIDATE_ON_INVALID", "Fallback");
        env.set("IPXACT_VALIDATE_XMLLINT", "xmllint2");
        env.set("IPXACT_VALIDATE_QUIET", "true");

        let config =
            ConfigManager::apply_environment_overrides_with(&env, Config::default()).unwrap();

        assert_eq!(config.schema.url, "http://localhost:8080/index.xsd");
        assert_eq!(config.schema.directory, Some(PathBuf::from("/tmp/schemas")));
        assert_eq!(config.network.timeout_seconds, 5);
        assert_eq!(config.network.retry_attempts, 0);
        assert_eq!(config.validation.on_invalid, InvalidDocumentPolicy::Fallback);
        assert_eq!(config.validation.xmllint, "xmllint2");
        assert!(config.output.quiet);
    }

    #[test]
    fn test_invalid_environment_values() {
        let mut env = MockEnvProvider::default();
        env.set("IPXACT_VALIDATE_TIMEOUT", "soon");
        let result = ConfigManager::apply_environment_overrides_with(&env, Config::default());
        assert!(matches!(result, Err(ConfigError::Environment(_))));

        let mut env = MockEnvProvider::default();
        env.set("IPXACT_VALIDATE_ON_INVALID", "ignore");
        let result = ConfigManager::apply_environment_overrides_with(&env, Config::default());
        match result {
            Err(ConfigError::Environment(message)) => {
                assert!(message.contains("IPXACT_VALIDATE_ON_INVALID"))
            }
            other => panic!("Expected Environment error, got {:?}", other),
        }
    }

    #[test]
    fn test_merge_with_cli() {
        let mut config = Config::default();
        config.output.quiet = true;
        config.network.retry_attempts = 7;

        let args = CommonArgs {
            schema_dir: Some(PathBuf::from("out")),
            timeout: Some(0),
            on_invalid: Some(InvalidDocumentPolicy::Fallback),
            verbose: true,
            ..Default::default()
        };

        let merged = ConfigManager::merge_with_cli(config, &args);

        assert_eq!(merged.schema.directory, Some(PathBuf::from("out")));
        assert_eq!(merged.network.timeout_seconds, 0);
        // Unset options keep the configured value
        assert_eq!(merged.network.retry_attempts, 7);
        assert_eq!(merged.validation.on_invalid, InvalidDocumentPolicy::Fallback);
        assert_eq!(merged.verbosity(), VerbosityLevel::Verbose);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.schema.url = "not a url".to_string();
        assert!(ConfigManager::validate_config(&config).is_err());

        let mut config = Config::default();
        config.schema.url = "ftp://example.org/index.xsd".to_string();
        assert!(ConfigManager::validate_config(&config).is_err());

        let mut config = Config::default();
        config.network.retry_attempts = 11;
        assert!(ConfigManager::validate_config(&config).is_err());

        let mut config = Config::default();
        config.validation.xmllint = "  ".to_string();
        assert!(ConfigManager::validate_config(&config).is_err());

        let mut config = Config::default();
        config.output.verbose = true;
        config.output.quiet = true;
        assert!(ConfigManager::validate_config(&config).is_err());

        let mut config = Config::default();
        config.network.timeout_seconds = 0;
        assert!(ConfigManager::validate_config(&config).is_ok());
    }

    #[test]
    fn test_derived_settings() {
        let mut config = Config::default();
        config.network.timeout_seconds = 12;
        config.validation.on_invalid = InvalidDocumentPolicy::Fallback;

        let http = config.http_client_config();
        assert_eq!(http.timeout_seconds, 12);
        assert_eq!(http.retry_attempts, 3);

        let validator = config.validator_config(Path::new("ipxact_schema"));
        assert_eq!(validator.schema_dir, PathBuf::from("ipxact_schema"));
        assert_eq!(validator.schema_url, IPXACT_SCHEMA_URL);
        assert_eq!(validator.on_invalid, InvalidDocumentPolicy::Fallback);

        config.schema.directory = Some(PathBuf::from("custom"));
        assert_eq!(config.schema_dir(Path::new("schema")), PathBuf::from("custom"));
    }

    #[test]
    fn test_find_config_file_search_order() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        let dirs = vec![first.path().to_path_buf(), second.path().to_path_buf()];

        assert_eq!(ConfigManager::find_config_file_in(&dirs), None);

        fs::write(second.path().join("ipxact-validate.toml"), "").unwrap();
        assert_eq!(
            ConfigManager::find_config_file_in(&dirs),
            Some(second.path().join("ipxact-validate.toml"))
        );

        fs::write(first.path().join(".ipxact-validate.json"), "{}").unwrap();
        assert_eq!(
            ConfigManager::find_config_file_in(&dirs),
            Some(first.path().join(".ipxact-validate.json"))
        );
    }

    #[tokio::test]
    async fn test_load_config_precedence() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("ipxact-validate.toml"),
            "[network]\ntimeout_seconds = 10\nretry_attempts = 1\nretry_delay_ms = 5\n",
        )
        .unwrap();

        let mut env = MockEnvProvider::default();
        env.set("IPXACT_VALIDATE_TIMEOUT", "20");
        env.set("IPXACT_VALIDATE_RETRY_ATTEMPTS", "2");

        let args = CommonArgs {
            timeout: Some(40),
            ..Default::default()
        };

        let config =
            ConfigManager::load_config_with(&args, &env, &[temp_dir.path().to_path_buf()])
                .await
                .unwrap();

        assert_eq!(config.network.timeout_seconds, 40);
        assert_eq!(config.network.retry_attempts, 2);
        assert_eq!(config.network.retry_delay_ms, 5);
    }

    #[tokio::test]
    async fn test_explicit_config_file_must_exist() {
        let args = CommonArgs {
            config: Some(PathBuf::from("/nonexistent/ipxact-validate.toml")),
            ..Default::default()
        };

        let result =
            ConfigManager::load_config_with(&args, &MockEnvProvider::default(), &[]).await;
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
