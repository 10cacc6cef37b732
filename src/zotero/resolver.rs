// file: src/zotero/resolver.rs
// description: maps a local attachment file to its Zotero record and select link
// reference: https://www.zotero.org/support/zotero_data#files

use crate::error::Result;
use crate::interrupt::Interrupt;
use crate::models::{BibliographicRecord, ZoteroLink, record::is_item_key};
use crate::zotero::client::{LibraryHandle, ZoteroClient};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Found(BibliographicRecord, ZoteroLink),
    /// The file cannot be linked; the reason is shown to the user.
    Unresolved(String),
}

pub struct RecordResolver {
    client: ZoteroClient,
    libraries: Vec<LibraryHandle>,
    interrupt: Interrupt,
}

impl RecordResolver {
    /// `libraries` is searched in order, so the personal library must come first.
    pub fn new(client: ZoteroClient, libraries: Vec<LibraryHandle>, interrupt: Interrupt) -> Self {
        Self {
            client,
            libraries,
            interrupt,
        }
    }

    pub fn libraries(&self) -> &[LibraryHandle] {
        &self.libraries
    }

    pub async fn resolve(&self, path: &Path) -> Result<Resolution> {
        if !path.exists() {
            return Ok(Resolution::Unresolved(format!(
                "file not found: {}",
                path.display()
            )));
        }

        let Some(item_key) = item_key_for(path) else {
            return Ok(Resolution::Unresolved(
                "cannot determine the item key from the file's directory".to_string(),
            ));
        };

        let mut found = None;
        for library in &self.libraries {
            let item = self.client.item(library, item_key).await;
            self.interrupt.check()?;

            match item? {
                Some(raw) => {
                    debug!("{} found in {}", item_key, library);
                    found = Some(BibliographicRecord::from_api(
                        item_key,
                        library.library_type,
                        library.library_id,
                        raw,
                    ));
                    break;
                }
                None => debug!("{} not found in {}", item_key, library),
            }
        }

        let Some(record) = found else {
            return Ok(Resolution::Unresolved(format!(
                "no record for item key {} in any accessible library",
                item_key
            )));
        };

        match ZoteroLink::for_record(&record) {
            Some(link) => Ok(Resolution::Found(record, link)),
            None => Ok(Resolution::Unresolved(
                "file lacks a parent record".to_string(),
            )),
        }
    }
}

/// Zotero keeps each attachment in `storage/<item key>/<file name>`.
pub fn item_key_for(path: &Path) -> Option<&str> {
    path.parent()?
        .file_name()?
        .to_str()
        .filter(|name| is_item_key(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::ZowieError;
    use crate::models::LibraryType;
    use crate::zotero::credentials::LibraryCredential;
    use mockito::{Matcher, Server};
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn attachment(temp: &TempDir, item_key: &str) -> PathBuf {
        let dir = temp.path().join("storage").join(item_key);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("paper.pdf");
        fs::write(&path, b"%PDF-1.4").unwrap();
        path
    }

    fn resolver(server: &Server, libraries: Vec<LibraryHandle>) -> RecordResolver {
        let credential = LibraryCredential::new("A1b2C3d4E5f6G7h8I9j0K1l2", "475425").unwrap();
        let client = ZoteroClient::new(&Config::default_config().zotero, &credential)
            .unwrap()
            .with_base_url(&server.url());
        RecordResolver::new(client, libraries, Interrupt::new())
    }

    #[test]
    fn test_item_key_from_parent_directory() {
        assert_eq!(
            item_key_for(Path::new("/z/storage/ABCD1234/paper.pdf")),
            Some("ABCD1234")
        );
        assert_eq!(item_key_for(Path::new("/z/storage/not a key/paper.pdf")), None);
        assert_eq!(item_key_for(Path::new("paper.pdf")), None);
    }

    #[tokio::test]
    async fn test_personal_library_takes_precedence() {
        let temp = TempDir::new().unwrap();
        let path = attachment(&temp, "ABCD1234");

        let mut server = Server::new_async().await;
        let personal = server
            .mock("GET", "/users/475425/items/ABCD1234")
            .with_status(200)
            .with_body(r#"{"library": {"type": "user", "id": 475425}, "data": {"parentItem": "XYZ9"}}"#)
            .expect(1)
            .create_async()
            .await;
        let group = server
            .mock("GET", "/groups/2250/items/ABCD1234")
            .with_status(200)
            .with_body(r#"{"library": {"type": "group", "id": 2250}, "data": {"parentItem": "GRP1"}}"#)
            .expect(0)
            .create_async()
            .await;

        let resolver = resolver(
            &server,
            vec![LibraryHandle::user(475425), LibraryHandle::group(2250)],
        );

        match resolver.resolve(&path).await.unwrap() {
            Resolution::Found(record, link) => {
                assert_eq!(record.library_type, LibraryType::User);
                assert_eq!(link.as_str(), "zotero://select/library/items/XYZ9");
            }
            other => panic!("unexpected resolution: {:?}", other),
        }

        personal.assert_async().await;
        group.assert_async().await;
    }

    #[tokio::test]
    async fn test_group_library_link() {
        let temp = TempDir::new().unwrap();
        let path = attachment(&temp, "ABCD1234");

        let mut server = Server::new_async().await;
        let _personal = server
            .mock("GET", "/users/475425/items/ABCD1234")
            .with_status(404)
            .create_async()
            .await;
        let _group = server
            .mock("GET", "/groups/2250/items/ABCD1234")
            .with_status(200)
            .with_body(r#"{"library": {"type": "group", "id": 2250}, "data": {"parentItem": "GRP1"}}"#)
            .create_async()
            .await;

        let resolver = resolver(
            &server,
            vec![LibraryHandle::user(475425), LibraryHandle::group(2250)],
        );

        match resolver.resolve(&path).await.unwrap() {
            Resolution::Found(_, link) => {
                assert_eq!(link.as_str(), "zotero://select/groups/2250/items/GRP1");
            }
            other => panic!("unexpected resolution: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_not_found_anywhere() {
        let temp = TempDir::new().unwrap();
        let path = attachment(&temp, "ABCD1234");

        let mut server = Server::new_async().await;
        let _any = server
            .mock("GET", Matcher::Regex(r"^/(users|groups)/\d+/items/ABCD1234$".to_string()))
            .with_status(404)
            .expect(2)
            .create_async()
            .await;

        let resolver = resolver(
            &server,
            vec![LibraryHandle::user(475425), LibraryHandle::group(2250)],
        );

        assert!(matches!(
            resolver.resolve(&path).await.unwrap(),
            Resolution::Unresolved(reason) if reason.contains("ABCD1234")
        ));
    }

    #[tokio::test]
    async fn test_record_without_parent() {
        let temp = TempDir::new().unwrap();
        let path = attachment(&temp, "ABCD1234");

        let mut server = Server::new_async().await;
        let _personal = server
            .mock("GET", "/users/475425/items/ABCD1234")
            .with_status(200)
            .with_body(r#"{"library": {"type": "user", "id": 475425}, "data": {"itemType": "attachment"}}"#)
            .create_async()
            .await;

        let resolver = resolver(&server, vec![LibraryHandle::user(475425)]);
        assert_eq!(
            resolver.resolve(&path).await.unwrap(),
            Resolution::Unresolved("file lacks a parent record".to_string())
        );
    }

    #[tokio::test]
    async fn test_vanished_file_makes_no_request() {
        let server = Server::new_async().await;
        let resolver = resolver(&server, vec![LibraryHandle::user(475425)]);

        let resolution = resolver
            .resolve(Path::new("/nonexistent/ABCD1234/paper.pdf"))
            .await
            .unwrap();
        assert!(matches!(resolution, Resolution::Unresolved(reason) if reason.starts_with("file not found")));
    }

    #[tokio::test]
    async fn test_server_error_propagates() {
        let temp = TempDir::new().unwrap();
        let path = attachment(&temp, "ABCD1234");

        let mut server = Server::new_async().await;
        let _personal = server
            .mock("GET", "/users/475425/items/ABCD1234")
            .with_status(500)
            .create_async()
            .await;

        let resolver = resolver(&server, vec![LibraryHandle::user(475425)]);
        assert!(matches!(
            resolver.resolve(&path).await,
            Err(ZowieError::Server(_))
        ));
    }

    #[tokio::test]
    async fn test_interrupt_checked_after_remote_call() {
        let temp = TempDir::new().unwrap();
        let path = attachment(&temp, "ABCD1234");

        let mut server = Server::new_async().await;
        let _personal = server
            .mock("GET", "/users/475425/items/ABCD1234")
            .with_status(404)
            .create_async()
            .await;

        let resolver = resolver(&server, vec![LibraryHandle::user(475425)]);
        resolver.interrupt.raise();
        assert!(matches!(
            resolver.resolve(&path).await,
            Err(ZowieError::Interrupted)
        ));
    }
}
