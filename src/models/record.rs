// file: src/models/record.rs
// description: bibliographic record returned by the Zotero Web API for a local attachment
// reference: https://www.zotero.org/support/dev/web_api/v3/basics

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryType {
    User,
    Group,
}

impl LibraryType {
    pub fn path_segment(&self) -> &'static str {
        match self {
            LibraryType::User => "users",
            LibraryType::Group => "groups",
        }
    }

    fn from_api(value: &str) -> Option<Self> {
        match value {
            "user" => Some(LibraryType::User),
            "group" => Some(LibraryType::Group),
            _ => None,
        }
    }
}

impl fmt::Display for LibraryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibraryType::User => write!(f, "user"),
            LibraryType::Group => write!(f, "group"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BibliographicRecord {
    /// Key of the attachment item, taken from the storage directory name.
    pub item_key: String,
    /// Key of the top-level entry that owns the attachment, if any.
    pub parent_key: Option<String>,
    pub library_type: LibraryType,
    pub library_id: u64,
    pub raw: Value,
}

impl BibliographicRecord {
    /// Builds a record from an item response. The `library` block of the
    /// response wins over the library that was queried when both are present.
    pub fn from_api(
        item_key: &str,
        queried_type: LibraryType,
        queried_id: u64,
        raw: Value,
    ) -> Self {
        let library_type = raw["library"]["type"]
            .as_str()
            .and_then(LibraryType::from_api)
            .unwrap_or(queried_type);
        let library_id = raw["library"]["id"].as_u64().unwrap_or(queried_id);
        let parent_key = raw["data"]["parentItem"]
            .as_str()
            .map(str::trim)
            .filter(|key| is_item_key(key))
            .map(str::to_string);

        Self {
            item_key: item_key.to_string(),
            parent_key,
            library_type,
            library_id,
            raw,
        }
    }
}

/// Zotero item keys are short upper-case alphanumeric strings.
pub fn is_item_key(key: &str) -> bool {
    !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric())
}
