// file: src/pipeline/orchestrator.rs
// description: coordinates preflight checks, file enumeration, record lookup and channel writes
// reference: sequential link-writing workflow

use crate::channels::{Action, Channel, ChannelKind, ReconcileOptions, reconcile};
use crate::config::RunConfig;
use crate::error::{ChannelError, Result, ZowieError};
use crate::interrupt::Interrupt;
use crate::models::ZoteroLink;
use crate::pipeline::report::{ChannelOutcome, FileOutcome, RunReport};
use crate::scan::{FileScanner, LocalTarget, filter_modified_since};
use crate::utils::logging::format_step;
use crate::zotero::{RecordResolver, Resolution, ZoteroClient};
use std::path::Path;
use tracing::{debug, info, warn};

const MANY_FILES: usize = 1_000;
const VERY_MANY_FILES: usize = 10_000;

pub struct Orchestrator {
    run: RunConfig,
    client: ZoteroClient,
    channels: Vec<Box<dyn Channel>>,
    interrupt: Interrupt,
}

impl Orchestrator {
    pub fn new(run: RunConfig, client: ZoteroClient, interrupt: Interrupt) -> Self {
        let channels = run.channels.iter().map(|kind| kind.channel()).collect();
        Self {
            run,
            client,
            channels,
            interrupt,
        }
    }

    /// Replaces the channels built from the run configuration.
    pub fn with_channels(mut self, channels: Vec<Box<dyn Channel>>) -> Self {
        self.channels = channels;
        self
    }

    pub async fn run(self) -> Result<RunReport> {
        let resolver = self.preflight().await?;
        let targets = self.enumerate()?;
        self.announce(targets.len());

        let mut report = RunReport::new(self.run.dry_run);
        let total = targets.len();

        for (index, target) in targets.iter().enumerate() {
            // Let the signal listener run on the single-threaded runtime.
            tokio::task::yield_now().await;
            self.interrupt.check()?;

            info!(
                "{}",
                format_step(index + 1, total, &target.path.display().to_string())
            );
            let outcome = self.process_file(&resolver, target).await?;
            report.push(outcome);
        }

        report.finish();
        Ok(report)
    }

    async fn preflight(&self) -> Result<RecordResolver> {
        self.client.ping().await?;
        self.interrupt.check()?;

        let libraries = self.client.connect(&self.interrupt).await?;
        let resolver = RecordResolver::new(self.client.clone(), libraries, self.interrupt.clone());
        debug!("Searching {} libraries", resolver.libraries().len());

        Ok(resolver)
    }

    fn enumerate(&self) -> Result<Vec<LocalTarget>> {
        let scanner = FileScanner::new(&self.run.scan);
        let outcome = scanner.collect(&self.run.inputs);
        let extensions = scanner.classifier().describe_extensions();

        for rejected in &outcome.rejected {
            warn!(
                "Skipping \"{}\": not a {} file or a directory",
                rejected.display(),
                extensions
            );
        }

        let mut targets = outcome.targets;
        if let Some(cutoff) = self.run.after_date {
            let before = targets.len();
            targets = filter_modified_since(targets, cutoff);
            info!(
                "{} of {} files were modified on or after {}",
                targets.len(),
                before,
                cutoff.format("%Y-%m-%d %H:%M")
            );
        }

        if targets.is_empty() {
            return Err(ZowieError::BadArgument(format!(
                "No {} files to process; quitting.",
                extensions
            )));
        }

        Ok(targets)
    }

    fn announce(&self, total: usize) {
        if self.run.reconcile.overwrite {
            warn!("Overwrite mode in effect: existing values will be replaced");
        }
        if self.run.dry_run {
            warn!("Dry-run mode in effect: no changes will be made");
        }

        let methods: Vec<&str> = self.channels.iter().map(|c| c.kind().name()).collect();
        info!(
            "Will process {} file(s) using method(s): {}",
            total,
            methods.join(", ")
        );

        if total > VERY_MANY_FILES {
            info!("That's a very large number of files; this will take a long time");
        } else if total > MANY_FILES {
            info!("That's a lot of files; this may take a while");
        }
    }

    async fn process_file(
        &self,
        resolver: &RecordResolver,
        target: &LocalTarget,
    ) -> Result<FileOutcome> {
        let link = match resolver.resolve(&target.path).await? {
            Resolution::Found(_, link) => link,
            Resolution::Unresolved(reason) => {
                warn!("Skipping {}: {}", target.path.display(), reason);
                return Ok(FileOutcome::Unresolved {
                    path: target.path.clone(),
                    reason,
                });
            }
        };
        debug!("Link for {} is {}", target.path.display(), link);

        let channels = self
            .channels
            .iter()
            .map(|channel| self.write_channel(channel.as_ref(), target, &link))
            .collect();

        Ok(FileOutcome::Linked {
            path: target.path.clone(),
            link,
            channels,
        })
    }

    fn write_channel(
        &self,
        channel: &dyn Channel,
        target: &LocalTarget,
        link: &ZoteroLink,
    ) -> ChannelOutcome {
        if !channel.applies_to(&target.file_type) {
            debug!(
                "{} does not apply to .{} files",
                channel.kind(),
                target.file_type.extension()
            );
            return ChannelOutcome::NotApplicable(channel.kind());
        }

        match apply_channel(
            channel,
            &target.path,
            link,
            self.run.reconcile,
            self.run.dry_run,
        ) {
            Ok(outcome) => {
                log_decision(channel, &target.path, &outcome, self.run.dry_run);
                outcome
            }
            Err(e) => {
                warn!("{}", e);
                ChannelOutcome::Failed {
                    kind: channel.kind(),
                    message: e.to_string(),
                }
            }
        }
    }
}

/// Reads the channel's current value, decides what to do and commits the
/// new value unless the decision is to leave it alone or `dry_run` is set.
pub fn apply_channel(
    channel: &dyn Channel,
    path: &Path,
    link: &ZoteroLink,
    options: ReconcileOptions,
    dry_run: bool,
) -> std::result::Result<ChannelOutcome, ChannelError> {
    let current = channel.read(path)?;

    let action = reconcile(channel.shape(), current.as_ref(), link, options).map_err(|e| {
        ChannelError::Malformed {
            path: path.to_path_buf(),
            attribute: channel.kind().name(),
            message: e.0,
        }
    })?;

    let committed = match action.new_value() {
        Some(value) if !dry_run => {
            channel.write(path, value)?;
            true
        }
        _ => false,
    };

    Ok(ChannelOutcome::Decided {
        kind: channel.kind(),
        action,
        committed,
    })
}

fn log_decision(channel: &dyn Channel, path: &Path, outcome: &ChannelOutcome, dry_run: bool) {
    let ChannelOutcome::Decided { action, .. } = outcome else {
        return;
    };
    let message = decision_message(channel.kind(), path, action, dry_run);
    match action {
        Action::Deny => warn!("{}", message),
        _ => info!("{}", message),
    }
}

fn decision_message(kind: ChannelKind, path: &Path, action: &Action, dry_run: bool) -> String {
    let prefix = if dry_run { "[dry run] " } else { "" };
    let place = kind.label();
    let file = path.display();

    match action {
        Action::Skip => format!("{}{} of {} already contains the link", prefix, place, file),
        Action::Deny => format!(
            "{}Not changing {} of {}: it holds other content (use --overwrite to replace it)",
            prefix, place, file
        ),
        Action::Initialize(_) => format!("{}Wrote link to {} of {}", prefix, place, file),
        Action::ReplaceLinkOnly(_) => {
            format!("{}Updated the link in {} of {}", prefix, place, file)
        }
        Action::Prepend(_) => format!("{}Added link in front of {} of {}", prefix, place, file),
        Action::Overwrite(_) => format!("{}Replaced {} of {} with the link", prefix, place, file),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::{AttributeValue, FinderComment, RawAttribute, ValueShape};
    use crate::config::Config;
    use crate::scan::FileType;
    use crate::zotero::LibraryCredential;
    use mockito::{Mock, Server, ServerGuard};
    use std::collections::HashMap;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    const KEY: &str = "A1b2C3d4E5f6G7h8I9j0K1l2";

    /// Text channel kept in memory, keyed by path.
    #[derive(Clone)]
    struct MemoryChannel {
        values: Arc<Mutex<HashMap<PathBuf, String>>>,
        writes: Arc<Mutex<usize>>,
        pdf_only: bool,
    }

    impl MemoryChannel {
        fn new(pdf_only: bool) -> Self {
            Self {
                values: Arc::new(Mutex::new(HashMap::new())),
                writes: Arc::new(Mutex::new(0)),
                pdf_only,
            }
        }

        fn set(&self, path: &Path, value: &str) {
            self.values
                .lock()
                .unwrap()
                .insert(path.to_path_buf(), value.to_string());
        }

        fn get(&self, path: &Path) -> Option<String> {
            self.values.lock().unwrap().get(path).cloned()
        }

        fn writes(&self) -> usize {
            *self.writes.lock().unwrap()
        }
    }

    impl Channel for MemoryChannel {
        fn kind(&self) -> ChannelKind {
            ChannelKind::FinderComment
        }

        fn description(&self) -> &'static str {
            "memory comment"
        }

        fn shape(&self) -> ValueShape {
            ValueShape::Text
        }

        fn applies_to(&self, file_type: &FileType) -> bool {
            !self.pdf_only || *file_type == FileType::Pdf
        }

        fn read(&self, path: &Path) -> std::result::Result<Option<RawAttribute>, ChannelError> {
            Ok(self.get(path).map(RawAttribute::Text))
        }

        fn write(&self, path: &Path, value: &AttributeValue) -> std::result::Result<(), ChannelError> {
            let AttributeValue::Text(text) = value else {
                return Err(ChannelError::Script {
                    path: path.to_path_buf(),
                    message: "list value".to_string(),
                });
            };
            self.set(path, text);
            *self.writes.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn attachment(temp: &TempDir, item_key: &str, name: &str) -> PathBuf {
        let dir = temp.path().join(item_key);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, b"%PDF-1.4").unwrap();
        path
    }

    /// Server answering for user 475425. `None` parents mean "not found".
    async fn zotero(items: &[(&str, Option<&str>)]) -> (ServerGuard, Vec<Mock>) {
        let mut server = Server::new_async().await;
        let mut mocks = vec![
            server
                .mock("GET", "/users/475425/items/top?limit=1")
                .with_status(200)
                .with_body("[]")
                .create_async()
                .await,
            server
                .mock("GET", "/users/475425/groups?limit=100")
                .with_status(200)
                .with_body("[]")
                .create_async()
                .await,
        ];

        for (key, parent) in items {
            let path = format!("/users/475425/items/{}", key);
            let mock = match parent {
                Some(parent) => server.mock("GET", path.as_str()).with_status(200).with_body(format!(
                    r#"{{"library": {{"type": "user", "id": 475425}}, "data": {{"parentItem": "{}"}}}}"#,
                    parent
                )),
                None => server.mock("GET", path.as_str()).with_status(404),
            };
            mocks.push(mock.create_async().await);
        }
        (server, mocks)
    }

    fn orchestrator(
        server: &ServerGuard,
        inputs: Vec<PathBuf>,
        options: ReconcileOptions,
        dry_run: bool,
        channel: &MemoryChannel,
    ) -> Orchestrator {
        let config = Config::default_config();
        let credential = LibraryCredential::new(KEY, "475425").unwrap();
        let client = ZoteroClient::new(&config.zotero, &credential)
            .unwrap()
            .with_base_url(&server.url());

        let run = RunConfig {
            inputs,
            channels: vec![ChannelKind::FinderComment],
            scan: config.scan.clone(),
            reconcile: options,
            dry_run,
            after_date: None,
        };

        Orchestrator::new(run, client, Interrupt::new())
            .with_channels(vec![Box::new(channel.clone())])
    }

    #[tokio::test]
    async fn test_empty_comment_is_initialized() {
        let temp = TempDir::new().unwrap();
        let path = attachment(&temp, "ABCD1234", "paper.pdf");
        let (server, _mocks) = zotero(&[("ABCD1234", Some("XYZ9"))]).await;
        let channel = MemoryChannel::new(false);

        let report = orchestrator(&server, vec![path.clone()], ReconcileOptions::default(), false, &channel)
            .run()
            .await
            .unwrap();

        assert_eq!(
            channel.get(&path).as_deref(),
            Some("zotero://select/library/items/XYZ9")
        );
        assert_eq!(report.stats().channels_written, 1);
    }

    #[tokio::test]
    async fn test_stale_link_replaced_keeping_notes() {
        let temp = TempDir::new().unwrap();
        let path = attachment(&temp, "ABCD1234", "paper.pdf");
        let (server, _mocks) = zotero(&[("ABCD1234", Some("XYZ9"))]).await;
        let channel = MemoryChannel::new(false);
        channel.set(&path, "zotero://select/library/items/OLD1 — my own notes");

        let report = orchestrator(&server, vec![path.clone()], ReconcileOptions::default(), false, &channel)
            .run()
            .await
            .unwrap();

        assert_eq!(
            channel.get(&path).as_deref(),
            Some("zotero://select/library/items/XYZ9 — my own notes")
        );
        match &report.files[0] {
            FileOutcome::Linked { channels, .. } => assert!(matches!(
                channels[0],
                ChannelOutcome::Decided {
                    action: Action::ReplaceLinkOnly(_),
                    committed: true,
                    ..
                }
            )),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_second_run_changes_nothing() {
        let temp = TempDir::new().unwrap();
        let path = attachment(&temp, "ABCD1234", "paper.pdf");
        let (server, _mocks) = zotero(&[("ABCD1234", Some("XYZ9"))]).await;
        let channel = MemoryChannel::new(false);

        for _ in 0..2 {
            orchestrator(&server, vec![path.clone()], ReconcileOptions::default(), false, &channel)
                .run()
                .await
                .unwrap();
        }

        assert_eq!(channel.writes(), 1);
    }

    #[tokio::test]
    async fn test_unrelated_comment_is_denied_unless_overwriting() {
        let temp = TempDir::new().unwrap();
        let path = attachment(&temp, "ABCD1234", "paper.pdf");
        let (server, _mocks) = zotero(&[("ABCD1234", Some("XYZ9"))]).await;
        let channel = MemoryChannel::new(false);
        channel.set(&path, "my own notes");

        let report = orchestrator(&server, vec![path.clone()], ReconcileOptions::default(), false, &channel)
            .run()
            .await
            .unwrap();
        assert_eq!(channel.get(&path).as_deref(), Some("my own notes"));
        assert_eq!(report.stats().channels_denied, 1);

        let overwrite = ReconcileOptions {
            overwrite: true,
            ..ReconcileOptions::default()
        };
        orchestrator(&server, vec![path.clone()], overwrite, false, &channel)
            .run()
            .await
            .unwrap();
        assert_eq!(
            channel.get(&path).as_deref(),
            Some("zotero://select/library/items/XYZ9")
        );
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let path = attachment(&temp, "ABCD1234", "paper.pdf");
        let (server, _mocks) = zotero(&[("ABCD1234", Some("XYZ9"))]).await;
        let channel = MemoryChannel::new(false);

        let report = orchestrator(&server, vec![path.clone()], ReconcileOptions::default(), true, &channel)
            .run()
            .await
            .unwrap();

        assert_eq!(channel.writes(), 0);
        assert!(channel.get(&path).is_none());
        assert_eq!(report.stats().channels_written, 1);
        assert!(report.summary().contains("would be written"));
    }

    #[tokio::test]
    async fn test_unresolved_files_do_not_stop_the_run() {
        let temp = TempDir::new().unwrap();
        let missing = attachment(&temp, "AAAA1111", "gone.pdf");
        let found = attachment(&temp, "BBBB2222", "paper.pdf");
        let (server, _mocks) = zotero(&[("AAAA1111", None), ("BBBB2222", Some("XYZ9"))]).await;
        let channel = MemoryChannel::new(false);

        let report = orchestrator(&server, vec![temp.path().to_path_buf()], ReconcileOptions::default(), false, &channel)
            .run()
            .await
            .unwrap();

        let stats = report.stats();
        assert_eq!(stats.files_unresolved, 1);
        assert_eq!(stats.files_linked, 1);
        assert!(channel.get(&missing).is_none());
        assert!(channel.get(&found).is_some());
    }

    #[tokio::test]
    async fn test_channel_skipped_for_other_file_types() {
        let temp = TempDir::new().unwrap();
        let path = attachment(&temp, "ABCD1234", "book.epub");
        let (server, _mocks) = zotero(&[("ABCD1234", Some("XYZ9"))]).await;
        let channel = MemoryChannel::new(true);

        let mut orchestrator =
            orchestrator(&server, vec![path.clone()], ReconcileOptions::default(), false, &channel);
        orchestrator.run.scan.extensions = vec!["pdf".to_string(), "epub".to_string()];
        let report = orchestrator.run().await.unwrap();

        match &report.files[0] {
            FileOutcome::Linked { channels, .. } => {
                assert_eq!(channels, &vec![ChannelOutcome::NotApplicable(ChannelKind::FinderComment)]);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(channel.writes(), 0);
    }

    #[tokio::test]
    async fn test_no_files_is_fatal() {
        let temp = TempDir::new().unwrap();
        let (server, _mocks) = zotero(&[]).await;
        let channel = MemoryChannel::new(false);

        let result = orchestrator(&server, vec![temp.path().to_path_buf()], ReconcileOptions::default(), false, &channel)
            .run()
            .await;
        assert!(matches!(result, Err(ZowieError::BadArgument(_))));
    }

    #[tokio::test]
    async fn test_rejected_credentials_are_fatal() {
        let temp = TempDir::new().unwrap();
        let path = attachment(&temp, "ABCD1234", "paper.pdf");
        let mut server = Server::new_async().await;
        let _top = server
            .mock("GET", "/users/475425/items/top?limit=1")
            .with_status(403)
            .create_async()
            .await;
        let channel = MemoryChannel::new(false);

        let result = orchestrator(&server, vec![path], ReconcileOptions::default(), false, &channel)
            .run()
            .await;
        assert!(matches!(result, Err(ZowieError::Auth(_))));
    }

    #[tokio::test]
    async fn test_interrupt_stops_before_next_file() {
        let temp = TempDir::new().unwrap();
        let path = attachment(&temp, "ABCD1234", "paper.pdf");
        let (server, _mocks) = zotero(&[("ABCD1234", Some("XYZ9"))]).await;
        let channel = MemoryChannel::new(false);

        let orchestrator =
            orchestrator(&server, vec![path.clone()], ReconcileOptions::default(), false, &channel);
        let interrupt = orchestrator.interrupt.clone();

        interrupt.raise();
        let result = orchestrator.run().await;

        assert!(matches!(result, Err(ZowieError::Interrupted)));
        assert_eq!(channel.writes(), 0);
    }

    #[test]
    fn test_apply_channel_reports_malformed_values() {
        struct BrokenList;

        impl Channel for BrokenList {
            fn kind(&self) -> ChannelKind {
                ChannelKind::WhereFrom
            }
            fn description(&self) -> &'static str {
                "broken list"
            }
            fn shape(&self) -> ValueShape {
                ValueShape::List
            }
            fn read(&self, _path: &Path) -> std::result::Result<Option<RawAttribute>, ChannelError> {
                Ok(Some(RawAttribute::Bytes(vec![0xff, 0xfe, 0x00])))
            }
            fn write(&self, _path: &Path, _value: &AttributeValue) -> std::result::Result<(), ChannelError> {
                panic!("must not be written");
            }
        }

        let err = apply_channel(
            &BrokenList,
            Path::new("x/ABCD1234/paper.pdf"),
            &ZoteroLink::personal("XYZ9"),
            ReconcileOptions::default(),
            false,
        )
        .unwrap_err();
        assert!(matches!(err, ChannelError::Malformed { attribute: "wherefrom", .. }));
    }

    #[test]
    fn test_decision_messages_name_the_file_and_a_short_channel_label() {
        let path = Path::new("storage/ABCD1234/paper.pdf");
        let link = AttributeValue::Text("zotero://select/library/items/XYZ9".to_string());
        let actions = [
            Action::Skip,
            Action::Deny,
            Action::Initialize(link.clone()),
            Action::ReplaceLinkOnly(link.clone()),
            Action::Prepend(link.clone()),
            Action::Overwrite(link),
        ];

        for action in &actions {
            let message = decision_message(FinderComment.kind(), path, action, false);
            assert!(message.contains("storage/ABCD1234/paper.pdf"), "{}", message);
            assert!(message.contains("the Finder comment"), "{}", message);
            assert!(!message.contains(FinderComment.description()), "{}", message);
        }

        let dry = decision_message(ChannelKind::PdfSubject, path, &Action::Skip, true);
        assert_eq!(
            dry,
            "[dry run] the PDF Subject field of storage/ABCD1234/paper.pdf already contains the link"
        );
    }
}
