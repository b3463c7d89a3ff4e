use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CertExtractError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid directory URL: {url} ({reason})")]
    InvalidUrl { url: String, reason: String },

    #[error("Failed to connect to {url}: {message}")]
    Connection { url: String, message: String },

    #[error("Authentication failed as {identity}: {message}")]
    Authentication { identity: String, message: String },

    #[error("Search under {base_dn} with filter {filter} failed: {message}")]
    Search {
        base_dn: String,
        filter: String,
        message: String,
    },

    #[error("Value {index} of {dn} is not valid base64")]
    Decode {
        dn: String,
        index: usize,
        #[source]
        source: base64::DecodeError,
    },

    #[error("Filesystem operation failed on {}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),
}

impl CertExtractError {
    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CertExtractError::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CertExtractError::Config { .. } | CertExtractError::InvalidUrl { .. } => 2,
            CertExtractError::Connection { .. } => 3,
            CertExtractError::Authentication { .. } => 4,
            CertExtractError::Search { .. } => 5,
            CertExtractError::Decode { .. } => 6,
            CertExtractError::Filesystem { .. } => 7,
            CertExtractError::Io(_) => 1,
        }
    }
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for CertExtractError {
    fn user_message(&self) -> String {
        match self {
            CertExtractError::Config { message } => {
                format!("Configuration error: {}", message)
            }
            CertExtractError::InvalidUrl { url, reason } => {
                format!("Invalid directory URL {}: {}", url, reason)
            }
            CertExtractError::Connection { url, message } => {
                format!("Could not connect to {}: {}", url, message)
            }
            CertExtractError::Authentication { identity, message } => {
                format!("Bind as {} was rejected: {}", identity, message)
            }
            CertExtractError::Search {
                base_dn,
                filter,
                message,
            } => {
                format!(
                    "Search for {} under {} failed: {}",
                    filter, base_dn, message
                )
            }
            CertExtractError::Decode { dn, index, source } => {
                format!(
                    "Value {} of entry {} could not be decoded: {}",
                    index, dn, source
                )
            }
            CertExtractError::Filesystem { path, source } => {
                format!("Could not write {}: {}", path.display(), source)
            }
            CertExtractError::Io(e) => format!("IO error: {}", e),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            CertExtractError::Config { .. } => Some(
                "Check your configuration file syntax or run with --generate-config to start from the defaults.".to_string()
            ),
            CertExtractError::InvalidUrl { .. } => Some(
                "Use an ldap://, ldaps:// or ldapi:// URL (e.g., ldap://directory.example.com:389).".to_string()
            ),
            CertExtractError::Connection { .. } => Some(
                "Check that the server is reachable and the port is correct. Raise --connect-timeout on slow links.".to_string()
            ),
            CertExtractError::Authentication { .. } => Some(
                "Verify --bind-dn and LDAPCERTS_BIND_PASSWORD, or omit both to bind anonymously.".to_string()
            ),
            CertExtractError::Search { .. } => Some(
                "Check the base DN and filter syntax. Servers may also refuse searches that exceed their size or time limits.".to_string()
            ),
            CertExtractError::Decode { .. } => Some(
                "The server returned a value that is neither binary nor base64. Files written before this value were kept.".to_string()
            ),
            CertExtractError::Filesystem { .. } => Some(
                "Ensure the output directory is writable and the disk has free space.".to_string()
            ),
            CertExtractError::Io(_) => None,
        }
    }
}

impl From<toml::de::Error> for CertExtractError {
    fn from(error: toml::de::Error) -> Self {
        CertExtractError::Config {
            message: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CertExtractError>;
