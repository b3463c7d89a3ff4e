use crate::directory::{Credentials, SearchRequest};
use crate::error::{CertExtractError, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATHS: [&str; 2] = ["ldapcerts.toml", ".ldapcerts.toml"];

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub directory: DirectoryConfig,
    pub search: SearchConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DirectoryConfig {
    pub url: String,
    pub bind_dn: Option<String>,
    pub bind_password: Option<String>,
    /// Seconds to wait for the TCP/TLS connection to come up.
    pub connect_timeout: u64,
    pub starttls: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SearchConfig {
    pub base_dn: String,
    pub filter: String,
    pub attribute: String,
    /// Maximum entries the server should return. 0 leaves it to the server.
    pub size_limit: u32,
    /// Seconds the server may spend on the search. 0 leaves it to the server.
    pub time_limit: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub collision_policy: CollisionPolicy,
}

/// What to do when two different DNs sanitize to the same file name stem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Append a short hash of the original DN to later claimants.
    #[default]
    Disambiguate,
    /// Reuse the stem; later files overwrite earlier ones.
    Overwrite,
}

impl std::fmt::Display for CollisionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollisionPolicy::Disambiguate => write!(f, "disambiguate"),
            CollisionPolicy::Overwrite => write!(f, "overwrite"),
        }
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            url: "ldap://sodir01.expisoft.se:389".to_string(),
            bind_dn: None,
            bind_password: None,
            connect_timeout: 30,
            starttls: false,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_dn: "c=se".to_string(),
            filter: "(mail=91100@ediel.se)".to_string(),
            attribute: "userCertificate;binary".to_string(),
            size_limit: 0,
            time_limit: 0,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./certs"),
            collision_policy: CollisionPolicy::default(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(CertExtractError::Config {
                message: format!("Configuration file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CertExtractError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| CertExtractError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;

        tracing::debug!(path = %path.display(), "loaded configuration file");
        Ok(config)
    }

    pub fn load_with_defaults<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None => {
                for default_path in &DEFAULT_CONFIG_PATHS {
                    if Path::new(default_path).exists() {
                        return Self::load_from_file(default_path);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    pub fn merge_with_cli_args(&mut self, cli_args: &CliOverrides) {
        if let Some(ref url) = cli_args.url {
            self.directory.url = url.clone();
        }

        if let Some(ref bind_dn) = cli_args.bind_dn {
            self.directory.bind_dn = Some(bind_dn.clone());
        }

        if let Some(ref password) = cli_args.bind_password {
            self.directory.bind_password = Some(password.clone());
        }

        if let Some(timeout) = cli_args.connect_timeout {
            self.directory.connect_timeout = timeout;
        }

        if cli_args.starttls {
            self.directory.starttls = true;
        }

        if let Some(ref base_dn) = cli_args.base_dn {
            self.search.base_dn = base_dn.clone();
        }

        if let Some(ref filter) = cli_args.filter {
            self.search.filter = filter.clone();
        }

        if let Some(ref attribute) = cli_args.attribute {
            self.search.attribute = attribute.clone();
        }

        if let Some(size_limit) = cli_args.size_limit {
            self.search.size_limit = size_limit;
        }

        if let Some(time_limit) = cli_args.time_limit {
            self.search.time_limit = time_limit;
        }

        if let Some(ref output_dir) = cli_args.output_dir {
            self.output.directory = output_dir.clone();
        }

        if let Some(policy) = cli_args.collision_policy {
            self.output.collision_policy = policy;
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| CertExtractError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        std::fs::write(path, content).map_err(|e| CertExtractError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        crate::cli::validate_ldap_url(&self.directory.url).map_err(|reason| {
            CertExtractError::InvalidUrl {
                url: self.directory.url.clone(),
                reason,
            }
        })?;

        if self.directory.connect_timeout == 0 {
            return Err(CertExtractError::Config {
                message: "Connect timeout must be greater than 0".to_string(),
            });
        }

        if self.directory.bind_password.is_some() && self.directory.bind_dn.is_none() {
            return Err(CertExtractError::Config {
                message: "A bind password was given without a bind DN".to_string(),
            });
        }

        let has_password = self
            .directory
            .bind_password
            .as_deref()
            .is_some_and(|password| !password.is_empty());
        if self.directory.bind_dn.is_some() && !has_password {
            return Err(CertExtractError::Config {
                message: "A bind DN requires a non-empty bind password; omit the DN to bind anonymously"
                    .to_string(),
            });
        }

        if self.search.base_dn.trim().is_empty() {
            return Err(CertExtractError::Config {
                message: "Base DN must not be empty".to_string(),
            });
        }

        let filter = self.search.filter.trim();
        if !(filter.starts_with('(') && filter.ends_with(')')) {
            return Err(CertExtractError::Config {
                message: format!("Filter must be enclosed in parentheses: {}", filter),
            });
        }

        if self.search.attribute.trim().is_empty() {
            return Err(CertExtractError::Config {
                message: "Attribute name must not be empty".to_string(),
            });
        }

        let max_limit = i32::MAX as u32;
        if self.search.size_limit > max_limit || self.search.time_limit > max_limit {
            return Err(CertExtractError::Config {
                message: format!("Search limits must not exceed {}", max_limit),
            });
        }

        if self.output.directory.as_os_str().is_empty() {
            return Err(CertExtractError::Config {
                message: "Output directory must not be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Authentication mode selected once for the whole run.
    pub fn credentials(&self) -> Credentials {
        match self.directory.bind_dn {
            Some(ref dn) => Credentials::Bound {
                dn: dn.clone(),
                password: self.directory.bind_password.clone().unwrap_or_default(),
            },
            None => Credentials::Anonymous,
        }
    }

    pub fn search_request(&self) -> SearchRequest {
        SearchRequest::new(
            self.search.base_dn.clone(),
            self.search.filter.clone(),
            self.search.attribute.clone(),
        )
        .with_size_limit(self.search.size_limit)
        .with_time_limit(self.search.time_limit)
    }

    pub fn connect_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.directory.connect_timeout)
    }

    pub fn create_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config).unwrap_or_else(|_| String::new())
    }
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub url: Option<String>,
    pub bind_dn: Option<String>,
    pub bind_password: Option<String>,
    pub connect_timeout: Option<u64>,
    pub starttls: bool,
    pub base_dn: Option<String>,
    pub filter: Option<String>,
    pub attribute: Option<String>,
    pub size_limit: Option<u32>,
    pub time_limit: Option<u32>,
    pub output_dir: Option<PathBuf>,
    pub collision_policy: Option<CollisionPolicy>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_url(mut self, url: Option<String>) -> Self {
        self.url = url;
        self
    }

    pub fn with_bind(mut self, bind_dn: Option<String>, password: Option<String>) -> Self {
        self.bind_dn = bind_dn;
        self.bind_password = password;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Option<u64>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_starttls(mut self, starttls: bool) -> Self {
        self.starttls = starttls;
        self
    }

    pub fn with_base_dn(mut self, base_dn: Option<String>) -> Self {
        self.base_dn = base_dn;
        self
    }

    pub fn with_filter(mut self, filter: Option<String>) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_attribute(mut self, attribute: Option<String>) -> Self {
        self.attribute = attribute;
        self
    }

    pub fn with_limits(mut self, size_limit: Option<u32>, time_limit: Option<u32>) -> Self {
        self.size_limit = size_limit;
        self.time_limit = time_limit;
        self
    }

    pub fn with_output_dir(mut self, output_dir: Option<PathBuf>) -> Self {
        self.output_dir = output_dir;
        self
    }

    pub fn with_collision_policy(mut self, policy: Option<CollisionPolicy>) -> Self {
        self.collision_policy = policy;
        self
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
        assert_eq!(config.directory.url, "ldap://sodir01.expisoft.se:389");
        assert_eq!(config.search.base_dn, "c=se");
        assert_eq!(config.search.attribute, "userCertificate;binary");
        assert_eq!(config.output.directory, PathBuf::from("./certs"));
        assert_eq!(config.directory.connect_timeout, 30);
        assert!(matches!(config.credentials(), Credentials::Anonymous));
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.search.filter = "mail=someone@example.com".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.directory.url = "https://example.com".to_string();
        assert!(matches!(
            config.validate(),
            Err(CertExtractError::InvalidUrl { .. })
        ));

        let mut config = Config::default();
        config.directory.bind_password = Some("secret".to_string());
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.search.size_limit = u32::MAX;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bind_dn_requires_password() {
        let mut config = Config::default();
        config.directory.bind_dn = Some("cn=reader,o=example".to_string());
        assert!(matches!(
            config.validate(),
            Err(CertExtractError::Config { .. })
        ));

        config.directory.bind_password = Some(String::new());
        let err = config.validate().unwrap_err();
        assert_eq!(err.exit_code(), 2);

        config.directory.bind_password = Some("secret".to_string());
        assert!(config.validate().is_ok());
        assert!(!config.credentials().is_anonymous());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_file_operations() {
        let mut config = Config::default();
        config.search.size_limit = 50;
        config.output.collision_policy = CollisionPolicy::Overwrite;
        let temp_file = NamedTempFile::new().unwrap();

        config.save_to_file(temp_file.path()).unwrap();

        let loaded_config = Config::load_from_file(temp_file.path()).unwrap();
        assert_eq!(loaded_config.search.size_limit, 50);
        assert_eq!(
            loaded_config.output.collision_policy,
            CollisionPolicy::Overwrite
        );
    }

    #[test]
    fn test_partial_config_file_keeps_defaults() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[search]").unwrap();
        writeln!(temp_file, "base_dn = \"o=example\"").unwrap();

        let config = Config::load_from_file(temp_file.path()).unwrap();
        assert_eq!(config.search.base_dn, "o=example");
        assert_eq!(config.search.filter, "(mail=91100@ediel.se)");
        assert_eq!(config.directory.connect_timeout, 30);
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = Config::default();

        let overrides = CliOverrides::new()
            .with_url(Some("ldaps://ldap.example.com".to_string()))
            .with_bind(
                Some("cn=admin,o=example".to_string()),
                Some("secret".to_string()),
            )
            .with_limits(Some(10), None)
            .with_output_dir(Some(PathBuf::from("/tmp/out")));

        config.merge_with_cli_args(&overrides);

        assert_eq!(config.directory.url, "ldaps://ldap.example.com");
        assert_eq!(config.search.size_limit, 10);
        assert_eq!(config.search.time_limit, 0);
        assert_eq!(config.output.directory, PathBuf::from("/tmp/out"));
        match config.credentials() {
            Credentials::Bound { dn, password } => {
                assert_eq!(dn, "cn=admin,o=example");
                assert_eq!(password, "secret");
            }
            Credentials::Anonymous => panic!("expected bound credentials"),
        }
    }

    #[test]
    fn test_search_request_from_config() {
        let request = Config::default().search_request();
        assert_eq!(request.base_dn(), "c=se");
        assert_eq!(request.attributes(), ["userCertificate;binary"]);
        assert_eq!(request.size_limit(), 0);
    }

    #[test]
    fn test_sample_config_generation() {
        let sample = Config::create_sample_config();
        assert!(sample.contains("[directory]"));
        assert!(sample.contains("[search]"));
        assert!(sample.contains("[output]"));
        assert!(sample.contains("collision_policy = \"disambiguate\""));
    }
}
