//
// test_utils.rs
//
// Shared fixtures: recording mock client, scripted lister, temp workspaces
//

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use tower_lsp::lsp_types::{ProgressParams, TextDocumentItem};

use crate::catalog::FileLister;
use crate::client::{ClientId, ClientProfile, LanguageClient};

/// Mock client that records every didOpen and progress notification.
///
/// Defaults to an initialized, attached client named as given, with
/// open/close sync and no language restriction.
pub struct RecordingClient {
    id: ClientId,
    profile: Mutex<ClientProfile>,
    attached: AtomicBool,
    open_delay: Mutex<Duration>,
    opens: Mutex<Vec<TextDocumentItem>>,
    progress: Mutex<Vec<ProgressParams>>,
}

impl RecordingClient {
    pub fn new(id: ClientId, name: &str) -> Arc<Self> {
        Arc::new(Self {
            id,
            profile: Mutex::new(ClientProfile {
                name: name.to_string(),
                initialized: true,
                supports_open_close: true,
                language_ids: None,
            }),
            attached: AtomicBool::new(true),
            open_delay: Mutex::new(Duration::ZERO),
            opens: Mutex::new(Vec::new()),
            progress: Mutex::new(Vec::new()),
        })
    }

    /// Make each didOpen take this long, so runs stay observable mid-flight
    pub fn with_open_delay(self: Arc<Self>, delay: Duration) -> Arc<Self> {
        *self.open_delay.lock().unwrap() = delay;
        self
    }

    /// Restrict the languages the client declares interest in
    pub fn with_languages(self: Arc<Self>, languages: &[&str]) -> Arc<Self> {
        self.profile.lock().unwrap().language_ids =
            Some(languages.iter().map(|l| l.to_string()).collect::<HashSet<_>>());
        self
    }

    /// Start out uninitialized, never becoming ready
    pub fn with_uninitialized(self: Arc<Self>) -> Arc<Self> {
        self.profile.lock().unwrap().initialized = false;
        self
    }

    /// Start out without open/close document sync
    pub fn without_open_close(self: Arc<Self>) -> Arc<Self> {
        self.profile.lock().unwrap().supports_open_close = false;
        self
    }

    pub fn set_initialized(&self, initialized: bool) {
        self.profile.lock().unwrap().initialized = initialized;
    }

    pub fn detach(&self) {
        self.attached.store(false, Ordering::SeqCst);
    }

    pub fn opens(&self) -> Vec<TextDocumentItem> {
        self.opens.lock().unwrap().clone()
    }

    pub fn opened_paths(&self) -> Vec<PathBuf> {
        self.opens
            .lock()
            .unwrap()
            .iter()
            .filter_map(|item| item.uri.to_file_path().ok())
            .collect()
    }

    pub fn progress_events(&self) -> Vec<ProgressParams> {
        self.progress.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageClient for RecordingClient {
    fn id(&self) -> ClientId {
        self.id
    }

    fn profile(&self) -> ClientProfile {
        self.profile.lock().unwrap().clone()
    }

    fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }

    async fn open_document(&self, item: TextDocumentItem) -> anyhow::Result<()> {
        self.opens.lock().unwrap().push(item);
        let delay = *self.open_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    async fn progress(&self, params: ProgressParams) -> anyhow::Result<()> {
        self.progress.lock().unwrap().push(params);
        Ok(())
    }
}

/// Lister that returns a fixed path list and counts invocations
pub struct StaticLister {
    files: Vec<PathBuf>,
    calls: AtomicUsize,
    fail: bool,
}

impl StaticLister {
    pub fn new(files: Vec<PathBuf>) -> Self {
        Self {
            files,
            calls: AtomicUsize::new(0),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            files: Vec::new(),
            calls: AtomicUsize::new(0),
            fail: true,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FileLister for StaticLister {
    async fn list(&self, _root: &Path) -> anyhow::Result<Vec<PathBuf>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(anyhow!("listing command exited with status 128"));
        }
        Ok(self.files.clone())
    }
}

/// Write `(relative path, contents)` pairs under `dir`, returning absolute
/// paths in input order
pub fn write_workspace(dir: &Path, files: &[(&str, &str)]) -> Vec<PathBuf> {
    files
        .iter()
        .map(|(rel, contents)| {
            let path = dir.join(rel);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(&path, contents).unwrap();
            path
        })
        .collect()
}
