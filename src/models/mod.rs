// file: src/models/mod.rs
// description: data models module exports
// reference: internal module structure

pub mod link;
pub mod record;

pub use link::{LINK_PREFIX, ZoteroLink};
pub use record::{BibliographicRecord, LibraryType};
