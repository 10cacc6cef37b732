// file: src/scan/scanner.rs
// description: Input path expansion, directory walking and date filtering of attachment files
// reference: https://docs.rs/walkdir

use crate::config::ScanConfig;
use crate::scan::classifier::{FileClassifier, FileType, is_hidden};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

pub struct FileScanner {
    classifier: FileClassifier,
    skip_hidden: bool,
}

/// A file that will be processed.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalTarget {
    pub path: PathBuf,
    pub file_type: FileType,
    pub modified: Option<DateTime<Local>>,
}

#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub targets: Vec<LocalTarget>,
    /// Inputs that were neither a matching file nor a directory.
    pub rejected: Vec<PathBuf>,
}

impl FileScanner {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            classifier: FileClassifier::new(&config.extensions),
            skip_hidden: config.skip_hidden,
        }
    }

    pub fn classifier(&self) -> &FileClassifier {
        &self.classifier
    }

    /// Expands files and directories given by the user, keeping input order.
    pub fn collect(&self, inputs: &[PathBuf]) -> ScanOutcome {
        let mut outcome = ScanOutcome::default();

        for input in inputs {
            if input.is_file() && self.classifier.is_target(input) {
                outcome.targets.push(self.target(input));
            } else if input.is_dir() {
                debug!("Adding files in directory {}", input.display());
                outcome.targets.extend(self.scan_directory(input));
            } else {
                outcome.rejected.push(input.clone());
            }
        }

        info!("Found {} candidate files", outcome.targets.len());
        outcome
    }

    pub fn scan_directory(&self, root: &Path) -> Vec<LocalTarget> {
        let skip_hidden = self.skip_hidden;

        WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !(skip_hidden && entry.depth() > 0 && is_hidden(entry.path())))
            .filter_map(|e| e.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| self.classifier.is_target(entry.path()))
            .map(|entry| self.target(entry.path()))
            .collect()
    }

    fn target(&self, path: &Path) -> LocalTarget {
        let modified = path
            .metadata()
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Local>::from);

        LocalTarget {
            path: path.to_path_buf(),
            file_type: self.classifier.classify(path),
            modified,
        }
    }
}

/// Keeps targets last modified at or after `cutoff`. Files whose
/// modification time cannot be read are dropped.
pub fn filter_modified_since(targets: Vec<LocalTarget>, cutoff: DateTime<Local>) -> Vec<LocalTarget> {
    targets
        .into_iter()
        .filter(|target| match target.modified {
            Some(modified) if modified >= cutoff => true,
            _ => {
                debug!("Skipping file older than cutoff: {}", target.path.display());
                false
            }
        })
        .collect()
}
