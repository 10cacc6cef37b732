// file: src/zotero/mod.rs
// description: Zotero Web API access, credentials and record resolution
// reference: internal module structure

pub mod client;
pub mod credentials;
pub mod resolver;

pub use client::{LibraryHandle, ZoteroClient, ZoteroError};
pub use credentials::{
    CredentialStore, LibraryCredential, Prompter, SecretsFile, TerminalPrompter, default_store,
    resolve_credentials,
};
pub use resolver::{RecordResolver, Resolution};
