// file: src/channels/mod.rs
// description: metadata channels that can hold a zotero link, and their common capability set
// reference: internal module structure

pub mod finder_comment;
pub mod pdf_info;
pub mod reconcile;
pub mod where_from;

pub use finder_comment::FinderComment;
pub use pdf_info::{InfoField, PdfInfo};
pub use reconcile::{
    Action, AttributeValue, MalformedPolicy, MalformedValue, RawAttribute, ReconcileOptions,
    ValueShape, reconcile,
};
pub use where_from::WhereFrom;

use crate::error::ChannelError;
use crate::scan::FileType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// One place on a file where a link can be stored.
pub trait Channel: Send + Sync {
    fn kind(&self) -> ChannelKind;

    fn description(&self) -> &'static str;

    fn shape(&self) -> ValueShape;

    fn applies_to(&self, _file_type: &FileType) -> bool {
        true
    }

    /// Current raw value, or `None` when the attribute is absent.
    fn read(&self, path: &Path) -> Result<Option<RawAttribute>, ChannelError>;

    fn write(&self, path: &Path, value: &AttributeValue) -> Result<(), ChannelError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    FinderComment,
    WhereFrom,
    PdfSubject,
    PdfProducer,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 4] = [
        ChannelKind::FinderComment,
        ChannelKind::WhereFrom,
        ChannelKind::PdfSubject,
        ChannelKind::PdfProducer,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ChannelKind::FinderComment => "findercomment",
            ChannelKind::WhereFrom => "wherefrom",
            ChannelKind::PdfSubject => "pdfsubject",
            ChannelKind::PdfProducer => "pdfproducer",
        }
    }

    /// Short human name for log lines.
    pub fn label(&self) -> &'static str {
        match self {
            ChannelKind::FinderComment => "the Finder comment",
            ChannelKind::WhereFrom => "the \"Where from\" attribute",
            ChannelKind::PdfSubject => "the PDF Subject field",
            ChannelKind::PdfProducer => "the PDF Producer field",
        }
    }

    pub fn channel(&self) -> Box<dyn Channel> {
        match self {
            ChannelKind::FinderComment => Box::new(FinderComment),
            ChannelKind::WhereFrom => Box::new(WhereFrom),
            ChannelKind::PdfSubject => Box::new(PdfInfo::new(InfoField::Subject)),
            ChannelKind::PdfProducer => Box::new(PdfInfo::new(InfoField::Producer)),
        }
    }

    /// Parses a comma-separated method list such as `findercomment,wherefrom`.
    /// Order is kept and repeated names are dropped.
    pub fn parse_list(list: &str) -> Result<Vec<ChannelKind>, String> {
        let mut kinds = Vec::new();
        for name in list.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            let kind = name.parse::<ChannelKind>()?;
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }

        if kinds.is_empty() {
            return Err("no methods given".to_string());
        }
        Ok(kinds)
    }
}

impl FromStr for ChannelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ChannelKind::ALL
            .into_iter()
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = ChannelKind::ALL.iter().map(|k| k.name()).collect();
                format!("Unknown method \"{}\" (known: {})", s, known.join(", "))
            })
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
