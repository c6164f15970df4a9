use crate::client::Credentials;
use crate::error::{DashboardError, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub salesforce: SalesforceConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Deserialize)]
pub struct SalesforceConfig {
    /// "login", "test", or a custom subdomain such as "acme-compliance.my"
    #[serde(default = "default_domain")]
    pub domain: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportConfig {
    pub default_report_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl(),
        }
    }
}

fn default_domain() -> String {
    "login".to_string()
}

fn default_api_version() -> String {
    "59.0".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_ttl() -> u64 {
    900
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(path).map_err(|e| {
            DashboardError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let config: Config = toml::from_str(&config_content)?;
        Ok(config)
    }

    /// Resolves credentials from the environment, using this config's domain.
    ///
    /// Expects SF_USERNAME, SF_PASSWORD and SF_SECURITY_TOKEN. Values are
    /// trimmed since pasted credentials routinely carry stray whitespace.
    pub fn credentials_from_env(&self) -> Result<Credentials> {
        let username = std::env::var("SF_USERNAME").unwrap_or_default();
        let password = std::env::var("SF_PASSWORD").unwrap_or_default();
        let security_token = std::env::var("SF_SECURITY_TOKEN").unwrap_or_default();

        let creds = Credentials::new(&username, &password, &security_token, &self.salesforce.domain);
        if !creds.is_complete() {
            return Err(DashboardError::Config(
                "SF_USERNAME, SF_PASSWORD and SF_SECURITY_TOKEN must all be set".to_string(),
            ));
        }
        Ok(creds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_full_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[salesforce]
domain = "test"
api_version = "58.0"
timeout_seconds = 10

[report]
default_report_id = "00OPr000002rd0TMAQ"

[cache]
ttl_seconds = 60
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.salesforce.domain, "test");
        assert_eq!(config.salesforce.api_version, "58.0");
        assert_eq!(config.salesforce.timeout_seconds, 10);
        assert_eq!(
            config.report.default_report_id.as_deref(),
            Some("00OPr000002rd0TMAQ")
        );
        assert_eq!(config.cache.ttl_seconds, 60);
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[salesforce]\n").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.salesforce.domain, "login");
        assert_eq!(config.salesforce.api_version, "59.0");
        assert_eq!(config.cache.ttl_seconds, 900);
        assert!(config.report.default_report_id.is_none());
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = Config::load(Path::new("/nonexistent/config.toml")).unwrap_err();
        assert!(matches!(err, DashboardError::Config(_)));
    }
}
