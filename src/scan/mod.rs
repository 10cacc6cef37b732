// file: src/scan/mod.rs
// description: Attachment file discovery module exports
// reference: Internal module structure

pub mod classifier;
pub mod date;
pub mod scanner;

pub use classifier::{FileClassifier, FileType};
pub use date::parse_after_date;
pub use scanner::{FileScanner, LocalTarget, ScanOutcome, filter_modified_since};
