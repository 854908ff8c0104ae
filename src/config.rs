use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::ExporterError;

const CANDIDATES: [&str; 4] = [
    "ado-exporter.toml",
    "ado-exporter.json",
    "ado-exporter.yaml",
    "ado-exporter.yml",
];

/// Configuration file structure for the exporter.
///
/// Every field is optional in the file; CLI flags and environment variables
/// take precedence over whatever is loaded here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Azure DevOps connection
    #[serde(default)]
    pub azure: AzureConfig,

    /// Refresh and serving parameters
    #[serde(default)]
    pub exporter: ExporterConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AzureConfig {
    /// Service base URL (e.g. `https://dev.azure.com`)
    pub url: Option<String>,

    pub organization: Option<String>,

    pub project: Option<String>,

    /// Personal access token
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExporterConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    /// Seconds between refresh cycles
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Most recent builds considered for timeline enrichment
    #[serde(default = "default_build_limit")]
    pub build_limit: usize,

    /// Concurrent timeline requests
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Retries after a failed cycle before it is abandoned
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            interval_secs: default_interval_secs(),
            build_limit: default_build_limit(),
            pool_size: default_pool_size(),
            max_retries: default_max_retries(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ExporterConfig {
    /// Time between refresh cycles; zero is rejected.
    pub fn refresh_interval(&self) -> std::result::Result<Duration, ExporterError> {
        if self.interval_secs == 0 {
            return Err(ExporterError::Config(
                "interval-secs must be at least 1".to_string(),
            ));
        }
        Ok(Duration::from_secs(self.interval_secs))
    }
}

fn default_port() -> u16 {
    8080
}

fn default_interval_secs() -> u64 {
    crate::scheduler::DEFAULT_REFRESH_INTERVAL.as_secs()
}

fn default_build_limit() -> usize {
    crate::providers::azure::DEFAULT_BUILD_LIMIT
}

fn default_pool_size() -> usize {
    crate::providers::azure::DEFAULT_POOL_SIZE
}

fn default_max_retries() -> u32 {
    crate::scheduler::DEFAULT_MAX_RETRIES
}

fn default_request_timeout_secs() -> u64 {
    crate::providers::azure::REQUEST_TIMEOUT.as_secs()
}

impl Config {
    /// Load configuration from a file.
    ///
    /// With an explicit path that file must exist. Otherwise the first of
    /// `ado-exporter.{toml,json,yaml,yml}` in the working directory is used,
    /// falling back to defaults when none is present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        Self::load_from_dir(Path::new("."))
    }

    fn load_from_dir(dir: &Path) -> Result<Self> {
        for candidate in &CANDIDATES {
            let path = dir.join(candidate);
            if path.exists() {
                return Self::load_from_path(&path);
            }
        }

        Ok(Self::default())
    }

    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.exporter.port, 8080);
        assert_eq!(config.exporter.interval_secs, 300);
        assert_eq!(config.exporter.build_limit, 100);
        assert_eq!(config.exporter.pool_size, 5);
        assert_eq!(config.exporter.max_retries, 5);
        assert_eq!(config.exporter.request_timeout_secs, 30);
        assert!(config.azure.token.is_none());
    }

    #[test]
    fn test_zero_refresh_interval_is_rejected() {
        let mut exporter = ExporterConfig::default();
        assert_eq!(exporter.refresh_interval().unwrap(), Duration::from_secs(300));

        exporter.interval_secs = 0;
        let err = exporter.refresh_interval().unwrap_err();
        assert!(matches!(err, ExporterError::Config(_)));
    }

    #[test]
    fn test_load_toml_config() {
        let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        write!(
            temp_file,
            r#"
[azure]
url = "https://dev.azure.com"
organization = "contoso"
project = "web"
token = "pat-from-file"

[exporter]
port = 9100
build-limit = 20
"#
        )
        .unwrap();

        let config = Config::load_from_path(temp_file.path()).unwrap();
        assert_eq!(config.azure.url.as_deref(), Some("https://dev.azure.com"));
        assert_eq!(config.azure.organization.as_deref(), Some("contoso"));
        assert_eq!(config.azure.token.as_deref(), Some("pat-from-file"));
        assert_eq!(config.exporter.port, 9100);
        assert_eq!(config.exporter.build_limit, 20);
        assert_eq!(config.exporter.pool_size, 5);
    }

    #[test]
    fn test_load_json_config() {
        let mut temp_file = NamedTempFile::with_suffix(".json").unwrap();
        write!(
            temp_file,
            r#"{{"azure": {{"project": "api"}}, "exporter": {{"interval-secs": 60}}}}"#
        )
        .unwrap();

        let config = Config::load_from_path(temp_file.path()).unwrap();
        assert_eq!(config.azure.project.as_deref(), Some("api"));
        assert!(config.azure.url.is_none());
        assert_eq!(config.exporter.interval_secs, 60);
    }

    #[test]
    fn test_load_yaml_config() {
        let mut temp_file = NamedTempFile::with_suffix(".yml").unwrap();
        write!(temp_file, "exporter:\n  pool-size: 2\n  max-retries: 1\n").unwrap();

        let config = Config::load_from_path(temp_file.path()).unwrap();
        assert_eq!(config.exporter.pool_size, 2);
        assert_eq!(config.exporter.max_retries, 1);
        assert_eq!(config.exporter.port, 8080);
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        write!(temp_file, "[exporter]\nport = \"not a number\"\n").unwrap();

        let err = Config::load_from_path(temp_file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse TOML config"));
    }

    #[test]
    fn test_explicit_missing_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(Config::load(Some(&missing)).is_err());
    }

    #[test]
    fn test_load_first_candidate_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("ado-exporter.yaml"),
            "azure:\n  organization: from-yaml\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("ado-exporter.toml"),
            "[azure]\norganization = \"from-toml\"\n",
        )
        .unwrap();

        let config = Config::load_from_dir(dir.path()).unwrap();
        assert_eq!(config.azure.organization.as_deref(), Some("from-toml"));
    }

    #[test]
    fn test_empty_dir_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from_dir(dir.path()).unwrap();
        assert_eq!(config.exporter.port, 8080);
        assert!(config.azure.organization.is_none());
    }
}
