// file: src/models/link.rs
// description: zotero://select deep links derived from bibliographic records
// reference: https://forums.zotero.org/discussion/78312/zotero-uri-vs-select-item

use crate::models::record::{BibliographicRecord, LibraryType};
use std::fmt;

/// Every link this tool writes, and every stale link it will replace,
/// starts with this prefix.
pub const LINK_PREFIX: &str = "zotero://select";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ZoteroLink(String);

impl ZoteroLink {
    /// Returns `None` when the record has no parent entry to point at.
    pub fn for_record(record: &BibliographicRecord) -> Option<Self> {
        let parent_key = record.parent_key.as_deref()?;
        Some(match record.library_type {
            LibraryType::User => Self::personal(parent_key),
            LibraryType::Group => Self::group(record.library_id, parent_key),
        })
    }

    pub(crate) fn personal(parent_key: &str) -> Self {
        Self(format!("{LINK_PREFIX}/library/items/{parent_key}"))
    }

    pub(crate) fn group(group_id: u64, parent_key: &str) -> Self {
        Self(format!("{LINK_PREFIX}/groups/{group_id}/items/{parent_key}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for text that looks like a link written by an earlier run.
    pub fn is_link_like(text: &str) -> bool {
        text.starts_with(LINK_PREFIX)
    }
}

impl fmt::Display for ZoteroLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ZoteroLink {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
