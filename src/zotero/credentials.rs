// file: src/zotero/credentials.rs
// description: storage, prompting and validation of the Zotero API key and user id
// reference: https://www.zotero.org/settings/keys

//! Credentials are kept as one string, `api_key` and `user_id` joined by
//! `\u{3}`, under the name of the OS user.
//!
//! Resolution order:
//! 1. values given on the command line (or in the config file)
//! 2. the credential store, consulted only when neither value was given
//! 3. an interactive prompt for whatever is still missing
//!
//! Without a store both values must be given; nothing is prompted for.

use crate::error::{Result, ZowieError};
use crate::utils::Validator;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const SEPARATOR: char = '\u{3}';
const SERVICE: &str = "zowie";

#[derive(Clone, PartialEq, Eq)]
pub struct LibraryCredential {
    pub api_key: String,
    pub user_id: u64,
}

impl LibraryCredential {
    pub fn new(api_key: &str, user_id: &str) -> Result<Self> {
        let api_key = api_key.trim();
        let user_id = user_id.trim();
        Validator::validate_api_key(api_key)?;
        Validator::validate_user_id(user_id)?;

        let user_id = user_id
            .parse()
            .map_err(|e| ZowieError::BadArgument(format!("Invalid user ID: {}", e)))?;

        Ok(Self {
            api_key: api_key.to_string(),
            user_id,
        })
    }

    pub fn encode(&self) -> String {
        format!("{}{}{}", self.api_key, SEPARATOR, self.user_id)
    }

    /// Splits a stored value. Either half may be missing or invalid in which
    /// case it comes back as `None`.
    pub fn decode(value: &str) -> (Option<String>, Option<String>) {
        let mut parts = value.splitn(2, SEPARATOR);
        let key = parts.next().map(str::to_string).filter(|s| !s.is_empty());
        let id = parts.next().map(str::to_string).filter(|s| !s.is_empty());
        (key, id)
    }
}

impl std::fmt::Debug for LibraryCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibraryCredential")
            .field("api_key", &"<redacted>")
            .field("user_id", &self.user_id)
            .finish()
    }
}

pub trait CredentialStore {
    /// Raw stored value for the current OS user, if any.
    fn get(&self) -> Result<Option<String>>;

    fn put(&mut self, value: &str) -> Result<()>;

    fn describe(&self) -> String;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SecretsFileContent {
    #[serde(default)]
    accounts: BTreeMap<String, String>,
}

/// TOML file in the user's config directory, readable by the owner only.
pub struct SecretsFile {
    path: PathBuf,
    account: String,
}

impl SecretsFile {
    pub fn new() -> Self {
        Self::with_path(Self::default_path())
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self {
            path,
            account: os_user(),
        }
    }

    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".config")
            })
            .join(SERVICE)
            .join("credentials.toml")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<SecretsFileContent> {
        if !self.path.exists() {
            return Ok(SecretsFileContent::default());
        }

        let content =
            std::fs::read_to_string(&self.path).map_err(|e| ZowieError::FileOperation {
                path: self.path.clone(),
                source: e,
            })?;

        match toml::from_str(&content) {
            Ok(parsed) => Ok(parsed),
            Err(e) => {
                warn!(
                    "Failed to parse credentials file at {}: {}. Treating as empty.",
                    self.path.display(),
                    e
                );
                Ok(SecretsFileContent::default())
            }
        }
    }

    fn write(&self, content: &SecretsFileContent) -> Result<()> {
        let io_error = |e: std::io::Error| ZowieError::FileOperation {
            path: self.path.clone(),
            source: e,
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }

        let text = toml::to_string_pretty(content)
            .map_err(|e| ZowieError::Credentials(e.to_string()))?;
        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path).map_err(io_error)?;

        // mode() only applies on creation; narrow files left by older runs.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            file.set_permissions(perms).map_err(io_error)?;
        }

        file.write_all(text.as_bytes()).map_err(io_error)?;
        Ok(())
    }
}

impl Default for SecretsFile {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for SecretsFile {
    fn get(&self) -> Result<Option<String>> {
        Ok(self.read()?.accounts.get(&self.account).cloned())
    }

    fn put(&mut self, value: &str) -> Result<()> {
        let mut content = self.read()?;
        content
            .accounts
            .insert(self.account.clone(), value.to_string());
        self.write(&content)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// OS keyring entry (Keychain on macOS, Credential Manager on Windows).
#[cfg(feature = "keyring")]
pub struct KeyringStore {
    account: String,
}

#[cfg(feature = "keyring")]
impl KeyringStore {
    pub fn new() -> Self {
        Self { account: os_user() }
    }

    fn entry(&self) -> Result<keyring::Entry> {
        keyring::Entry::new(SERVICE, &self.account)
            .map_err(|e| ZowieError::Credentials(e.to_string()))
    }
}

#[cfg(feature = "keyring")]
impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "keyring")]
impl CredentialStore for KeyringStore {
    fn get(&self) -> Result<Option<String>> {
        match self.entry()?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(ZowieError::Credentials(e.to_string())),
        }
    }

    fn put(&mut self, value: &str) -> Result<()> {
        self.entry()?
            .set_password(value)
            .map_err(|e| ZowieError::Credentials(e.to_string()))
    }

    fn describe(&self) -> String {
        format!("system keyring ({})", SERVICE)
    }
}

/// The keyring when built with it, otherwise the secrets file.
pub fn default_store() -> Box<dyn CredentialStore> {
    #[cfg(feature = "keyring")]
    {
        Box::new(KeyringStore::new())
    }
    #[cfg(not(feature = "keyring"))]
    {
        Box::new(SecretsFile::new())
    }
}

fn os_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "default".to_string())
}

/// Asks the person at the terminal for a missing value.
pub trait Prompter {
    fn ask(&self, label: &str, valid: fn(&str) -> bool) -> Result<String>;
}

pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn ask(&self, label: &str, valid: fn(&str) -> bool) -> Result<String> {
        dialoguer::Input::<String>::new()
            .with_prompt(label)
            .validate_with(|input: &String| -> std::result::Result<(), String> {
                if valid(input.trim()) {
                    Ok(())
                } else {
                    Err(format!("\"{}\" does not appear valid for {}", input, label))
                }
            })
            .interact_text()
            .map(|value| value.trim().to_string())
            .map_err(|e| ZowieError::BadArgument(format!("Unable to read {}: {}", label, e)))
    }
}

fn looks_like_key(value: &str) -> bool {
    Validator::validate_api_key(value).is_ok()
}

fn looks_like_user_id(value: &str) -> bool {
    Validator::validate_user_id(value).is_ok()
}

/// Produces the credential for this run and, when a store is given, saves it
/// back so the next run needs no arguments. Without a store, a missing value
/// is a bad-argument error.
pub fn resolve_credentials(
    api_key: Option<String>,
    user_id: Option<String>,
    mut store: Option<&mut dyn CredentialStore>,
    prompter: &dyn Prompter,
) -> Result<LibraryCredential> {
    if let Some(key) = api_key.as_deref() {
        Validator::validate_api_key(key)?;
    }
    if let Some(id) = user_id.as_deref() {
        Validator::validate_user_id(id)?;
    }

    if store.is_none() && (api_key.is_none() || user_id.is_none()) {
        return Err(ZowieError::BadArgument(
            "Need Zotero credentials (--api-key and --identifier) if not using the credential store"
                .to_string(),
        ));
    }

    let (mut api_key, mut user_id) = (api_key, user_id);

    if api_key.is_none()
        && user_id.is_none()
        && let Some(store) = store.as_deref()
    {
        debug!("Looking up credentials in {}", store.describe());
        match store.get() {
            Ok(Some(value)) => (api_key, user_id) = LibraryCredential::decode(&value),
            Ok(None) => debug!("No stored credentials"),
            Err(e) => warn!("Unable to read stored credentials: {}", e),
        }
    }

    let api_key = match api_key {
        Some(key) => key,
        None => prompter.ask("API key", looks_like_key)?,
    };
    let user_id = match user_id {
        Some(id) => id,
        None => prompter.ask("User ID", looks_like_user_id)?,
    };

    let credential = LibraryCredential::new(&api_key, &user_id)?;

    if let Some(store) = store.as_deref_mut() {
        debug!("Saving credentials to {}", store.describe());
        if let Err(e) = store.put(&credential.encode()) {
            warn!("Unable to save credentials: {}", e);
        }
    }

    Ok(credential)
}
