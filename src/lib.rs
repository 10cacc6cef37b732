// file: src/lib.rs
// description: library entry point and public api exports
// reference: rust library patterns
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/readme.md"))]

pub mod channels;
pub mod config;
pub mod error;
pub mod interrupt;
pub mod models;
pub mod pipeline;
pub mod scan;
pub mod utils;
pub mod zotero;

pub use channels::{
    Action, AttributeValue, Channel, ChannelKind, MalformedPolicy, RawAttribute,
    ReconcileOptions, reconcile,
};
pub use config::{Config, RunConfig, ScanConfig, WriterConfig, ZoteroConfig};
pub use error::{ChannelError, ExitCode, Result, ZowieError};
pub use interrupt::Interrupt;
pub use models::{BibliographicRecord, LibraryType, ZoteroLink};
pub use pipeline::{ChannelOutcome, FileOutcome, Orchestrator, RunReport, RunStats};
pub use scan::{FileClassifier, FileScanner, FileType, LocalTarget, parse_after_date};
pub use utils::Validator;
pub use zotero::{LibraryCredential, LibraryHandle, RecordResolver, Resolution, ZoteroClient};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let config = Config::default_config();
        assert_eq!(config.writer.methods, vec![ChannelKind::FinderComment]);
        assert_eq!(ChannelKind::ALL.len(), 4);
    }
}
