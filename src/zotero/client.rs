// file: src/zotero/client.rs
// description: Zotero Web API v3 client for item lookup, group discovery and credential checks
// reference: https://www.zotero.org/support/dev/web_api/v3/basics

use crate::config::ZoteroConfig;
use crate::error::{Result, ZowieError};
use crate::interrupt::Interrupt;
use crate::models::LibraryType;
use crate::zotero::credentials::LibraryCredential;
use reqwest::header::LINK;
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

const API_VERSION: &str = "3";
const GROUPS_PAGE_SIZE: usize = 100;

#[derive(Error, Debug)]
pub enum ZoteroError {
    #[error("cannot reach {url}: {message}")]
    Network { url: String, message: String },

    #[error("the Zotero servers rejected the API key and/or user ID")]
    Unauthorized,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("request for {url} failed with status {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("unexpected response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl From<ZoteroError> for ZowieError {
    fn from(error: ZoteroError) -> Self {
        match error {
            ZoteroError::Network { .. } => ZowieError::NoNetwork(error.to_string()),
            ZoteroError::Unauthorized => {
                ZowieError::Auth("invalid user ID and/or API key".to_string())
            }
            other => ZowieError::Server(other.to_string()),
        }
    }
}

/// One library the credential can read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LibraryHandle {
    pub library_type: LibraryType,
    pub library_id: u64,
}

impl LibraryHandle {
    pub fn user(user_id: u64) -> Self {
        Self {
            library_type: LibraryType::User,
            library_id: user_id,
        }
    }

    pub fn group(group_id: u64) -> Self {
        Self {
            library_type: LibraryType::Group,
            library_id: group_id,
        }
    }

    fn path(&self) -> String {
        format!("{}/{}", self.library_type.path_segment(), self.library_id)
    }
}

impl fmt::Display for LibraryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} library {}", self.library_type, self.library_id)
    }
}

#[derive(Clone)]
pub struct ZoteroClient {
    client: Client,
    base_url: String,
    api_key: String,
    user_id: u64,
}

impl ZoteroClient {
    pub fn new(config: &ZoteroConfig, credential: &LibraryCredential) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ZowieError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.api_base.trim_end_matches('/').to_string(),
            api_key: credential.api_key.clone(),
            user_id: credential.user_id,
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Any HTTP answer from the API host counts as connectivity.
    pub async fn ping(&self) -> std::result::Result<(), ZoteroError> {
        debug!("Checking connectivity to {}", self.base_url);
        self.client
            .get(&self.base_url)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| ZoteroError::Network {
                url: self.base_url.clone(),
                message: e.to_string(),
            })
    }

    /// Makes one cheap authenticated call so that bad credentials fail early.
    pub async fn verify(&self) -> std::result::Result<(), ZoteroError> {
        let path = format!("{}/items/top?limit=1", LibraryHandle::user(self.user_id).path());
        self.get(&path).await.map(|_| ())
    }

    /// Fetches an item, or `None` when the library has no such key.
    pub async fn item(
        &self,
        library: &LibraryHandle,
        item_key: &str,
    ) -> std::result::Result<Option<Value>, ZoteroError> {
        let path = format!("{}/items/{}", library.path(), item_key);
        match self.get(&path).await {
            Ok(response) => Ok(Some(self.json(&path, response).await?)),
            Err(ZoteroError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Ids of the group libraries the key can access, following the
    /// `Link: rel="next"` header across result pages.
    pub async fn groups(&self) -> std::result::Result<Vec<u64>, ZoteroError> {
        let mut next = Some(self.url(&format!(
            "{}/groups?limit={}",
            LibraryHandle::user(self.user_id).path(),
            GROUPS_PAGE_SIZE
        )));
        let mut ids = Vec::new();

        while let Some(url) = next.take() {
            let response = self.get_url(&url).await?;
            next = next_page(&response);
            let body: Value = response.json().await.map_err(|e| ZoteroError::Decode {
                url: url.clone(),
                message: e.to_string(),
            })?;

            let entries = body.as_array().ok_or_else(|| ZoteroError::Decode {
                url: url.clone(),
                message: "expected a list of groups".to_string(),
            })?;
            ids.extend(entries.iter().filter_map(|group| group["id"].as_u64()));
        }

        Ok(ids)
    }

    /// Verifies the credential and returns the personal library followed by
    /// every group library in the order the server lists them.
    pub async fn connect(&self, interrupt: &Interrupt) -> Result<Vec<LibraryHandle>> {
        info!("Connecting to Zotero as user {}", self.user_id);
        self.verify().await?;
        interrupt.check()?;

        let mut libraries = vec![LibraryHandle::user(self.user_id)];

        match self.groups().await {
            Ok(ids) => {
                for id in ids {
                    debug!("User can access group id {}", id);
                    libraries.push(LibraryHandle::group(id));
                }
            }
            Err(e) => warn!(
                "Unable to retrieve Zotero group libraries; proceeding anyway: {}",
                e
            ),
        }
        interrupt.check()?;

        Ok(libraries)
    }

    async fn get(&self, path: &str) -> std::result::Result<Response, ZoteroError> {
        self.get_url(&self.url(path)).await
    }

    async fn get_url(&self, url: &str) -> std::result::Result<Response, ZoteroError> {
        let url = url.to_string();
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .header("Zotero-API-Key", &self.api_key)
            .header("Zotero-API-Version", API_VERSION)
            .send()
            .await
            .map_err(|e| ZoteroError::Network {
                url: url.clone(),
                message: e.to_string(),
            })?;

        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::NOT_FOUND => Err(ZoteroError::NotFound(url)),
            StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => Err(ZoteroError::Unauthorized),
            status => {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                Err(ZoteroError::Status {
                    url,
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }

    async fn json(&self, path: &str, response: Response) -> std::result::Result<Value, ZoteroError> {
        response.json().await.map_err(|e| ZoteroError::Decode {
            url: self.url(path),
            message: e.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

/// Target of the `rel="next"` entry in a `Link` response header.
fn next_page(response: &Response) -> Option<String> {
    let header = response.headers().get(LINK)?.to_str().ok()?;
    header.split(',').find_map(|entry| {
        let (target, params) = entry.split_once(';')?;
        let is_next = params
            .split(';')
            .any(|param| param.trim().replace(' ', "") == "rel=\"next\"");
        is_next.then(|| {
            target
                .trim()
                .trim_start_matches('<')
                .trim_end_matches('>')
                .to_string()
        })
    })
}
