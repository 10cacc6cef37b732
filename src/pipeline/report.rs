// file: src/pipeline/report.rs
// description: per-file and per-channel outcomes of a run with summary statistics
// reference: aggregated run metrics reported at the end of a pipeline run

use crate::channels::{Action, ChannelKind};
use crate::models::ZoteroLink;
use std::path::PathBuf;
use std::time::Instant;

/// What happened on one channel of one file.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelOutcome {
    /// The channel does not apply to this kind of file.
    NotApplicable(ChannelKind),
    Decided {
        kind: ChannelKind,
        action: Action,
        /// False for `Skip`, `Deny` and every action in dry-run mode.
        committed: bool,
    },
    Failed {
        kind: ChannelKind,
        message: String,
    },
}

impl ChannelOutcome {
    pub fn kind(&self) -> ChannelKind {
        match self {
            ChannelOutcome::NotApplicable(kind) => *kind,
            ChannelOutcome::Decided { kind, .. } | ChannelOutcome::Failed { kind, .. } => *kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Linked {
        path: PathBuf,
        link: ZoteroLink,
        channels: Vec<ChannelOutcome>,
    },
    Unresolved {
        path: PathBuf,
        reason: String,
    },
}

impl FileOutcome {
    pub fn path(&self) -> &PathBuf {
        match self {
            FileOutcome::Linked { path, .. } | FileOutcome::Unresolved { path, .. } => path,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub files_total: usize,
    pub files_linked: usize,
    pub files_unresolved: usize,
    pub channels_written: usize,
    pub channels_unchanged: usize,
    pub channels_denied: usize,
    pub channels_failed: usize,
    pub duration_secs: u64,
}

#[derive(Debug)]
pub struct RunReport {
    pub files: Vec<FileOutcome>,
    pub dry_run: bool,
    started: Instant,
    finished: Option<Instant>,
}

impl RunReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            files: Vec::new(),
            dry_run,
            started: Instant::now(),
            finished: None,
        }
    }

    pub fn push(&mut self, outcome: FileOutcome) {
        self.files.push(outcome);
    }

    pub fn finish(&mut self) {
        self.finished = Some(Instant::now());
    }

    pub fn stats(&self) -> RunStats {
        let mut stats = RunStats {
            files_total: self.files.len(),
            duration_secs: self
                .finished
                .unwrap_or_else(Instant::now)
                .duration_since(self.started)
                .as_secs(),
            ..RunStats::default()
        };

        for file in &self.files {
            match file {
                FileOutcome::Unresolved { .. } => stats.files_unresolved += 1,
                FileOutcome::Linked { channels, .. } => {
                    stats.files_linked += 1;
                    for channel in channels {
                        match channel {
                            ChannelOutcome::NotApplicable(_) => {}
                            ChannelOutcome::Decided {
                                action: Action::Skip,
                                ..
                            } => stats.channels_unchanged += 1,
                            ChannelOutcome::Decided {
                                action: Action::Deny,
                                ..
                            } => stats.channels_denied += 1,
                            // Dry runs count what would have been written.
                            ChannelOutcome::Decided { .. } => stats.channels_written += 1,
                            ChannelOutcome::Failed { .. } => stats.channels_failed += 1,
                        }
                    }
                }
            }
        }

        stats
    }

    pub fn summary(&self) -> String {
        let stats = self.stats();
        let verb = if self.dry_run { "would be written" } else { "written" };
        format!(
            "{} file(s) processed, {} linked, {} unresolved; {} value(s) {}, {} unchanged, {} denied, {} failed",
            stats.files_total,
            stats.files_linked,
            stats.files_unresolved,
            stats.channels_written,
            verb,
            stats.channels_unchanged,
            stats.channels_denied,
            stats.channels_failed
        )
    }

    /// True when some file or channel needs the user's attention.
    pub fn has_problems(&self) -> bool {
        let stats = self.stats();
        stats.files_unresolved + stats.channels_denied + stats.channels_failed > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::AttributeValue;

    fn link() -> ZoteroLink {
        ZoteroLink::personal("XYZ9")
    }

    fn sample_report(dry_run: bool) -> RunReport {
        let mut report = RunReport::new(dry_run);
        report.push(FileOutcome::Linked {
            path: PathBuf::from("storage/AAAA1111/a.pdf"),
            link: link(),
            channels: vec![
                ChannelOutcome::Decided {
                    kind: ChannelKind::FinderComment,
                    action: Action::Initialize(AttributeValue::Text(link().to_string())),
                    committed: !dry_run,
                },
                ChannelOutcome::Decided {
                    kind: ChannelKind::WhereFrom,
                    action: Action::Skip,
                    committed: false,
                },
                ChannelOutcome::NotApplicable(ChannelKind::PdfSubject),
            ],
        });
        report.push(FileOutcome::Linked {
            path: PathBuf::from("storage/BBBB2222/b.pdf"),
            link: link(),
            channels: vec![
                ChannelOutcome::Decided {
                    kind: ChannelKind::FinderComment,
                    action: Action::Deny,
                    committed: false,
                },
                ChannelOutcome::Failed {
                    kind: ChannelKind::WhereFrom,
                    message: "malformed".to_string(),
                },
            ],
        });
        report.push(FileOutcome::Unresolved {
            path: PathBuf::from("storage/CCCC3333/c.pdf"),
            reason: "file lacks a parent record".to_string(),
        });
        report.finish();
        report
    }

    #[test]
    fn test_stats_count_each_outcome() {
        let stats = sample_report(false).stats();
        assert_eq!(stats.files_total, 3);
        assert_eq!(stats.files_linked, 2);
        assert_eq!(stats.files_unresolved, 1);
        assert_eq!(stats.channels_written, 1);
        assert_eq!(stats.channels_unchanged, 1);
        assert_eq!(stats.channels_denied, 1);
        assert_eq!(stats.channels_failed, 1);
    }

    #[test]
    fn test_summary_wording_follows_mode() {
        assert!(sample_report(false).summary().contains("1 value(s) written"));
        assert!(sample_report(true).summary().contains("1 value(s) would be written"));
    }

    #[test]
    fn test_empty_report_has_no_problems() {
        let report = RunReport::new(false);
        assert!(!report.has_problems());
        assert!(sample_report(false).has_problems());
    }
}
