pub mod cli;
pub mod config;
pub mod directory;
pub mod error;
pub mod extractor;
pub mod ui;

// Public API re-exports
pub use cli::{Cli, OutputFormat};
pub use config::{CliOverrides, CollisionPolicy, Config, DirectoryConfig, OutputConfig, SearchConfig};
pub use error::{CertExtractError, Result, UserFriendlyError};

// Core functionality re-exports
pub use directory::{AttributeValue, Credentials, DirectoryClient, Entry, LdapSession, SearchRequest};
pub use extractor::{
    CertificateFile, CertificateWriter, ExtractionProgress, ExtractionReport, FileNamer,
    WrittenCertificate,
};
pub use ui::{OutputFormatter, OutputMode, ProgressManager};

use std::path::Path;
use std::time::Instant;

/// Main library interface: one search, one directory of certificates.
pub struct LdapCerts {
    config: Config,
    output_formatter: OutputFormatter,
    progress_manager: ProgressManager,
}

impl LdapCerts {
    pub fn new(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        let output_formatter = OutputFormatter::new(output_mode, verbose, quiet);
        let progress_manager = ProgressManager::new(!quiet && output_mode == OutputMode::Human);

        Self {
            config,
            output_formatter,
            progress_manager,
        }
    }

    /// Create an instance from parsed CLI arguments
    pub fn from_cli(cli_args: &Cli) -> Result<Self> {
        let config = cli_args.load_config()?;

        Ok(Self::new(
            config,
            cli_args.output_mode(),
            cli_args.verbosity_level(),
            cli_args.quiet,
        ))
    }

    /// Runs the whole extraction against the configured server.
    ///
    /// The output directory is created before the connection is attempted,
    /// so it may exist even when connecting or binding fails.
    pub async fn run(&self) -> Result<ExtractionReport> {
        let writer = self.prepare_output()?;
        let mut session = self.connect().await?;
        self.extract_with(&mut session, &writer).await
    }

    /// Ensures the output directory exists.
    pub fn prepare_output(&self) -> Result<CertificateWriter> {
        let writer = CertificateWriter::new(&self.config.output.directory);
        writer.ensure_output_dir()?;

        self.output_formatter.debug(&format!(
            "Output directory: {}",
            writer.output_dir().display()
        ));

        Ok(writer)
    }

    async fn connect(&self) -> Result<LdapSession> {
        let url = &self.config.directory.url;
        self.output_formatter
            .start_operation(&format!("Connecting to {}", url));

        let spinner = self
            .progress_manager
            .create_spinner(&format!("Connecting to {}", url));
        let started = Instant::now();

        let session = LdapSession::connect(
            url,
            self.config.connect_timeout_duration(),
            self.config.directory.starttls,
        )
        .await;

        match session {
            Ok(session) => {
                ui::progress::finish_progress_with_summary(&spinner, "Connected", started.elapsed());
                Ok(session)
            }
            Err(e) => {
                spinner.finish_and_clear();
                Err(e)
            }
        }
    }

    /// Authenticates, searches and writes every value of the target attribute.
    ///
    /// Processing is strictly sequential. The first decode or write failure
    /// aborts the run; files written before it are left in place.
    pub async fn extract_with<C: DirectoryClient>(
        &self,
        client: &mut C,
        writer: &CertificateWriter,
    ) -> Result<ExtractionReport> {
        let credentials = self.config.credentials();
        self.output_formatter.info(&format!(
            "Binding as {}",
            credentials.identity()
        ));
        client.bind(&credentials).await?;

        let request = self.config.search_request();
        let entries = self.search(client, &request).await?;
        self.output_formatter
            .info(&format!("Search returned {} entries", entries.len()));

        let mut namer = FileNamer::new(self.config.output.collision_policy);
        let mut progress = ExtractionProgress::new();
        let mut certificates = Vec::new();

        for entry in &entries {
            let dn_stem = namer.stem_for(&entry.dn);
            if let Some(ref earlier) = dn_stem.collided_with {
                self.output_formatter.warning(&format!(
                    "{} and {} map to the same file name; using {} ({})",
                    earlier, entry.dn, dn_stem.stem, self.config.output.collision_policy
                ));
            }

            if entry.values.is_empty() {
                tracing::debug!(dn = %entry.dn, "entry has no values for the attribute");
            }

            for (position, value) in entry.values.iter().enumerate() {
                let index = position + 1;
                let content = extractor::decode_value(value).map_err(|source| {
                    CertExtractError::Decode {
                        dn: entry.dn.clone(),
                        index,
                        source,
                    }
                })?;

                let file = CertificateFile::new(&entry.dn, &dn_stem.stem, index, content);
                let path = writer.write(&file)?;
                self.output_formatter.file_written(&path, file.len());

                progress.record_file(file.len() as u64);
                certificates.push(WrittenCertificate {
                    dn: entry.dn.clone(),
                    index,
                    path,
                    size: file.len() as u64,
                });
            }

            progress.finish_entry();
        }

        if let Err(e) = client.unbind().await {
            tracing::warn!("unbind failed after extraction: {}", e);
        }

        self.output_formatter.print_total(progress.files_written);

        Ok(ExtractionReport::new(
            &self.config.directory.url,
            &request,
            writer.output_dir(),
            certificates,
            &progress,
        ))
    }

    async fn search<C: DirectoryClient>(
        &self,
        client: &mut C,
        request: &SearchRequest,
    ) -> Result<Vec<Entry>> {
        let spinner = self
            .progress_manager
            .create_spinner(&format!("Searching {} for {}", request.base_dn(), request.filter()));
        let started = Instant::now();

        match client.search(request).await {
            Ok(entries) => {
                ui::progress::finish_progress_with_summary(
                    &spinner,
                    &format!("Found {} entries", entries.len()),
                    started.elapsed(),
                );
                Ok(entries)
            }
            Err(e) => {
                spinner.finish_and_clear();
                Err(e)
            }
        }
    }

    /// Generate sample configuration file
    pub fn generate_sample_config<P: AsRef<Path>>(output_path: P) -> Result<()> {
        let sample_config = Config::create_sample_config();
        std::fs::write(output_path.as_ref(), sample_config)?;
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }

    /// Handle error with user-friendly output
    pub fn handle_error(&self, error: &CertExtractError) {
        self.output_formatter.print_user_friendly_error(error);
    }
}

/// Runs an extraction with the given configuration and plain output.
pub async fn run(config: Config) -> Result<usize> {
    config.validate()?;
    let extractor = LdapCerts::new(config, OutputMode::Plain, 0, false);
    let report = extractor.run().await?;
    Ok(report.total())
}

/// Get version information
pub fn version_info() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
