pub mod codec;
pub mod naming;
pub mod report;
pub mod writer;

pub use codec::{decode_base64, decode_value};
pub use naming::{certificate_file_name, sanitize_dn, DnStem, FileNamer};
pub use report::{ExtractionReport, ExtractionSummary, SearchSnapshot, WrittenCertificate};
pub use writer::{CertificateFile, CertificateWriter, ExtractionProgress};
