use crate::config::{CliOverrides, CollisionPolicy, Config};
use crate::error::Result;
use crate::ui::OutputMode;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "ldapcerts")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Export certificate attributes from an LDAP directory as DER files")]
#[command(
    long_about = "ldapcerts runs a single subtree search against an LDAP directory and \
                  writes every value of the requested certificate attribute to \
                  {sanitized DN}_{n}.der in the output directory."
)]
#[command(after_help = "EXAMPLES:\n  \
    ldapcerts\n  \
    ldapcerts --url ldaps://ldap.example.com --base-dn o=example --filter '(mail=alice@example.com)'\n  \
    ldapcerts --bind-dn cn=reader,o=example --output ./certs -v\n  \
    ldapcerts --config ldapcerts.toml --dry-run\n\n\
    The bind password is read from LDAPCERTS_BIND_PASSWORD.")]
pub struct Cli {
    /// Directory server URL
    #[arg(short, long, env = "LDAPCERTS_URL", value_parser = validate_ldap_url)]
    pub url: Option<String>,

    /// Search base (subtree root)
    #[arg(short, long, env = "LDAPCERTS_BASE_DN")]
    pub base_dn: Option<String>,

    /// Search filter, e.g. (mail=alice@example.com)
    #[arg(short, long, env = "LDAPCERTS_FILTER")]
    pub filter: Option<String>,

    /// Attribute holding the certificates
    #[arg(short, long, env = "LDAPCERTS_ATTRIBUTE")]
    pub attribute: Option<String>,

    /// Directory the .der files are written to
    #[arg(short, long, env = "LDAPCERTS_OUTPUT")]
    pub output: Option<PathBuf>,

    /// DN to bind as (anonymous bind when absent)
    #[arg(long, env = "LDAPCERTS_BIND_DN")]
    pub bind_dn: Option<String>,

    /// Password for --bind-dn
    #[arg(long, env = "LDAPCERTS_BIND_PASSWORD", hide_env_values = true)]
    pub bind_password: Option<String>,

    /// Connection timeout in seconds
    #[arg(long, help = "Seconds to wait for the connection (default: 30)")]
    pub connect_timeout: Option<u64>,

    /// Upgrade ldap:// connections with StartTLS
    #[arg(long)]
    pub starttls: bool,

    /// Server-side size limit
    #[arg(long, help = "Maximum entries the server may return (0 = server default)")]
    pub size_limit: Option<u32>,

    /// Server-side time limit in seconds
    #[arg(long, help = "Seconds the server may spend searching (0 = server default)")]
    pub time_limit: Option<u32>,

    /// How to name files when two DNs sanitize to the same name
    #[arg(long, value_enum)]
    pub on_collision: Option<CollisionPolicy>,

    /// Configuration file path
    #[arg(short, long, help = "Path to TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Output format for results
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Verbose output level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (only the result lines are printed)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Show the search that would run without connecting
    #[arg(long)]
    pub dry_run: bool,

    /// Generate sample configuration file
    #[arg(long, help = "Write a sample configuration file and exit")]
    pub generate_config: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON formatted output
    Json,
    /// Plain text output
    Plain,
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_with_defaults(self.config.as_ref())?;

        let overrides = self.create_cli_overrides();
        config.merge_with_cli_args(&overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn create_cli_overrides(&self) -> CliOverrides {
        CliOverrides::new()
            .with_url(self.url.clone())
            .with_bind(self.bind_dn.clone(), self.bind_password.clone())
            .with_connect_timeout(self.connect_timeout)
            .with_starttls(self.starttls)
            .with_base_dn(self.base_dn.clone())
            .with_filter(self.filter.clone())
            .with_attribute(self.attribute.clone())
            .with_limits(self.size_limit, self.time_limit)
            .with_output_dir(self.output.clone())
            .with_collision_policy(self.on_collision)
    }

    pub fn output_mode(&self) -> OutputMode {
        match self.output_format {
            OutputFormat::Human => OutputMode::Human,
            OutputFormat::Json => OutputMode::Json,
            OutputFormat::Plain => OutputMode::Plain,
        }
    }

    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }
}

pub fn validate_ldap_url(s: &str) -> std::result::Result<String, String> {
    let url =
        Url::parse(s).map_err(|_| "Invalid URL format. Please provide a valid URL.".to_string())?;

    match url.scheme() {
        "ldap" | "ldaps" => {
            if url.host_str().map_or(true, str::is_empty) {
                return Err("URL must include a hostname".to_string());
            }
        }
        // Unix domain socket; the path is percent-encoded in the host part.
        "ldapi" => {}
        _ => {
            return Err("Only ldap://, ldaps:// and ldapi:// URLs are supported".to_string());
        }
    }

    // The search is configured separately; a base DN or filter in the URL would be ignored.
    if url.path().len() > 1 || url.query().is_some() {
        return Err(
            "URL must not carry a DN or query; use --base-dn and --filter instead".to_string(),
        );
    }

    Ok(s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["ldapcerts"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_valid_ldap_urls() {
        let valid_urls = [
            "ldap://sodir01.expisoft.se:389",
            "ldaps://ldap.example.com",
            "ldap://127.0.0.1:1389",
            "ldapi://%2fvar%2frun%2fslapd%2fldapi",
        ];

        for url in &valid_urls {
            assert!(validate_ldap_url(url).is_ok(), "Should accept: {}", url);
        }
    }

    #[test]
    fn test_invalid_ldap_urls() {
        let invalid_urls = [
            "https://ldap.example.com",
            "ldap.example.com",
            "ldap://ldap.example.com/o=example",
            "ldap://ldap.example.com/?cn",
            "not-a-url",
        ];

        for url in &invalid_urls {
            assert!(validate_ldap_url(url).is_err(), "Should reject: {}", url);
        }
    }

    #[test]
    fn test_no_arguments_uses_defaults() {
        let cli = parse(&[]);
        let overrides = cli.create_cli_overrides();
        assert!(overrides.url.is_none());
        assert!(overrides.bind_dn.is_none());
        assert!(!overrides.starttls);
    }

    #[test]
    fn test_overrides_from_flags() {
        let cli = parse(&[
            "--url",
            "ldaps://ldap.example.com",
            "--base-dn",
            "o=example",
            "--filter",
            "(cn=test)",
            "--size-limit",
            "25",
            "--on-collision",
            "overwrite",
            "-vv",
        ]);

        let mut config = Config::default();
        config.merge_with_cli_args(&cli.create_cli_overrides());

        assert_eq!(config.directory.url, "ldaps://ldap.example.com");
        assert_eq!(config.search.base_dn, "o=example");
        assert_eq!(config.search.filter, "(cn=test)");
        assert_eq!(config.search.size_limit, 25);
        assert_eq!(config.output.collision_policy, CollisionPolicy::Overwrite);
        assert_eq!(cli.verbosity_level(), 2);
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["ldapcerts", "-q", "-v"]).is_err());
    }

    #[test]
    fn test_output_mode_follows_format_flag() {
        let cli = Cli::try_parse_from(["ldapcerts"]).unwrap();
        assert_eq!(cli.output_mode(), OutputMode::Human);

        let cli = Cli::try_parse_from(["ldapcerts", "--output-format", "json"]).unwrap();
        assert_eq!(cli.output_mode(), OutputMode::Json);
    }

    #[test]
    fn test_rejects_bad_url_flag() {
        assert!(Cli::try_parse_from(["ldapcerts", "--url", "http://example.com"]).is_err());
    }
}
