use crate::directory::SearchRequest;
use crate::extractor::ExtractionProgress;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub server: String,
    pub search: SearchSnapshot,
    pub output_directory: PathBuf,
    pub certificates: Vec<WrittenCertificate>,
    pub summary: ExtractionSummary,
    pub extraction_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSnapshot {
    pub base_dn: String,
    pub filter: String,
    pub attribute: String,
    pub size_limit: u32,
    pub time_limit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WrittenCertificate {
    pub dn: String,
    pub index: usize,
    pub path: PathBuf,
    pub size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionSummary {
    pub entries_processed: usize,
    pub total_certificates: usize,
    pub total_bytes: u64,
    pub extraction_duration: Duration,
}

impl From<&SearchRequest> for SearchSnapshot {
    fn from(request: &SearchRequest) -> Self {
        Self {
            base_dn: request.base_dn().to_string(),
            filter: request.filter().to_string(),
            attribute: request.target_attribute().to_string(),
            size_limit: request.size_limit(),
            time_limit: request.time_limit(),
        }
    }
}

impl ExtractionReport {
    pub fn new(
        server: &str,
        request: &SearchRequest,
        output_directory: &Path,
        certificates: Vec<WrittenCertificate>,
        progress: &ExtractionProgress,
    ) -> Self {
        Self {
            server: server.to_string(),
            search: SearchSnapshot::from(request),
            output_directory: output_directory.to_path_buf(),
            certificates,
            summary: ExtractionSummary {
                entries_processed: progress.entries_processed,
                total_certificates: progress.files_written,
                total_bytes: progress.bytes_written,
                extraction_duration: progress.elapsed(),
            },
            extraction_time: Utc::now(),
        }
    }

    pub fn total(&self) -> usize {
        self.summary.total_certificates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_serializes_to_json() {
        let request = SearchRequest::new("c=se", "(mail=a@b.se)", "userCertificate;binary");
        let mut progress = ExtractionProgress::new();
        progress.record_file(42);
        progress.finish_entry();

        let report = ExtractionReport::new(
            "ldap://localhost:389",
            &request,
            Path::new("certs"),
            vec![WrittenCertificate {
                dn: "cn=a".to_string(),
                index: 1,
                path: PathBuf::from("certs/cn_a_1.der"),
                size: 42,
            }],
            &progress,
        );

        assert_eq!(report.total(), 1);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["search"]["base_dn"], "c=se");
        assert_eq!(json["summary"]["total_certificates"], 1);
        assert_eq!(json["certificates"][0]["path"], "certs/cn_a_1.der");
    }
}
