use crate::error::{CertExtractError, Result};
use crate::extractor::naming::certificate_file_name;
use std::borrow::Cow;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, Instant};

/// One decoded attribute value, ready to be written.
#[derive(Debug, Clone)]
pub struct CertificateFile<'a> {
    pub dn: &'a str,
    pub index: usize,
    pub file_name: String,
    pub content: Cow<'a, [u8]>,
}

impl<'a> CertificateFile<'a> {
    pub fn new(dn: &'a str, stem: &str, index: usize, content: Cow<'a, [u8]>) -> Self {
        Self {
            dn,
            index,
            file_name: certificate_file_name(stem, index),
            content,
        }
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ExtractionProgress {
    pub entries_processed: usize,
    pub files_written: usize,
    pub bytes_written: u64,
    pub start_time: Instant,
}

impl ExtractionProgress {
    pub fn new() -> Self {
        Self {
            entries_processed: 0,
            files_written: 0,
            bytes_written: 0,
            start_time: Instant::now(),
        }
    }

    pub fn record_file(&mut self, bytes: u64) {
        self.files_written += 1;
        self.bytes_written += bytes;
    }

    pub fn finish_entry(&mut self) {
        self.entries_processed += 1;
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

impl Default for ExtractionProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes certificate files into a single output directory.
pub struct CertificateWriter {
    output_dir: PathBuf,
    buffer_size: usize,
}

impl CertificateWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            buffer_size: 16 * 1024,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Creates the output directory and its parents. Succeeds if it exists.
    pub fn ensure_output_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.output_dir)
            .map_err(|e| CertExtractError::filesystem(&self.output_dir, e))?;

        tracing::debug!(dir = %self.output_dir.display(), "output directory ready");
        Ok(())
    }

    /// Writes `file` into the output directory, replacing any existing file.
    pub fn write(&self, file: &CertificateFile<'_>) -> Result<PathBuf> {
        let dest_path = self.output_dir.join(&file.file_name);
        validate_file_name(&file.file_name, &dest_path)?;

        let dest_file =
            fs::File::create(&dest_path).map_err(|e| CertExtractError::filesystem(&dest_path, e))?;

        let mut writer = BufWriter::with_capacity(self.buffer_size, dest_file);
        writer
            .write_all(&file.content)
            .and_then(|_| writer.flush())
            .map_err(|e| CertExtractError::filesystem(&dest_path, e))?;

        tracing::debug!(
            path = %dest_path.display(),
            dn = file.dn,
            index = file.index,
            bytes = file.len(),
            "wrote certificate"
        );

        Ok(dest_path)
    }
}

fn validate_file_name(file_name: &str, dest_path: &Path) -> Result<()> {
    let mut components = Path::new(file_name).components();
    let single_normal = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );

    if !single_normal {
        return Err(CertExtractError::filesystem(
            dest_path,
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("refusing to write outside the output directory: {}", file_name),
            ),
        ));
    }

    Ok(())
}
