//
// session.rs
//
// Per-client trigger/readiness state machine and run coordination
//

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::catalog::{FileLister, GitFileLister, WorkspaceFileCatalog};
use crate::client::{ClientId, LanguageClient};
use crate::config::IngestConfig;
use crate::pipeline::IngestPipeline;
use crate::progress::{ProgressMode, ProgressReporter};

/// Poll interval while waiting for a server to advertise capabilities
pub const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Maximum readiness polls before giving up (~10 s total)
pub const MAX_READY_POLLS: u32 = 100;

/// Per-client trigger state. `processing` implies `triggered`; the pair is
/// only ever reset as a whole by a refresh or a detach.
#[derive(Debug, Clone, Default)]
struct ClientState {
    name: String,
    triggered: bool,
    processing: bool,
    /// Id of the run that set `processing`; a superseded run must not
    /// clear the flag its successor owns
    run_id: u64,
}

/// Read-only snapshot for status commands
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub cached_files: Option<usize>,
    pub cache_age_secs: Option<u64>,
    pub processing_clients: Vec<String>,
    pub triggered_clients: usize,
}

/// Coordinates workspace ingestion across attached clients.
///
/// Owns the catalog, the pipeline, and all per-client state; constructed
/// once at setup and reset wholesale by [`refresh`](Self::refresh). At most
/// one ingestion run is in flight per client at any time.
pub struct IngestSession {
    config: IngestConfig,
    catalog: WorkspaceFileCatalog,
    pipeline: IngestPipeline,
    states: Mutex<HashMap<ClientId, ClientState>>,
    cancel_tokens: Mutex<HashMap<ClientId, (u64, CancellationToken)>>,
    run_counter: AtomicU64,
}

impl IngestSession {
    /// Session over the given workspace root, discovering files with
    /// `git ls-files`
    pub fn new(workspace_root: PathBuf, config: IngestConfig) -> Self {
        Self::with_lister(workspace_root, config, Arc::new(GitFileLister))
    }

    /// Session with a custom discovery capability
    pub fn with_lister(
        workspace_root: PathBuf,
        config: IngestConfig,
        lister: Arc<dyn FileLister>,
    ) -> Self {
        let catalog = WorkspaceFileCatalog::new(workspace_root, &config, lister);
        let pipeline = IngestPipeline::new(&config);
        Self {
            config,
            catalog,
            pipeline,
            states: Mutex::new(HashMap::new()),
            cancel_tokens: Mutex::new(HashMap::new()),
            run_counter: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Entry point for a client attach event. Honors `auto_trigger`.
    pub async fn client_attached(
        &self,
        client: Arc<dyn LanguageClient>,
        buffer: Option<PathBuf>,
    ) -> anyhow::Result<()> {
        if !self.config.auto_trigger {
            return Ok(());
        }
        self.wait_for_ready(client, buffer).await
    }

    /// Poll until the client reports initialized capabilities, then trigger.
    ///
    /// Bounded at [`MAX_READY_POLLS`] attempts, [`READY_POLL_INTERVAL`]
    /// apart. A client that detaches mid-wait silently halts the chain;
    /// exhausting the poll limit abandons with a warning and no retry.
    pub async fn wait_for_ready(
        &self,
        client: Arc<dyn LanguageClient>,
        buffer: Option<PathBuf>,
    ) -> anyhow::Result<()> {
        for _attempt in 0..MAX_READY_POLLS {
            if !client.is_attached() {
                log::trace!("client {} detached while waiting for readiness", client.id());
                return Ok(());
            }
            if client.profile().initialized {
                return self.trigger(client, buffer, false).await;
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
        log::warn!(
            "client {} ({}) not ready after {} polls, giving up",
            client.id(),
            client.profile().name,
            MAX_READY_POLLS
        );
        Ok(())
    }

    /// Run ingestion for one client against the current catalog.
    ///
    /// No-ops, in order: already triggered and not forced; client name not
    /// in the allow-set; no open/close document sync; run already in flight
    /// (warned — single-flight). Otherwise marks the client triggered and
    /// processing, fetches the file list, and runs the pipeline, clearing
    /// `processing` when the run settles.
    pub async fn trigger(
        &self,
        client: Arc<dyn LanguageClient>,
        buffer: Option<PathBuf>,
        force_refresh: bool,
    ) -> anyhow::Result<()> {
        let id = client.id();
        let profile = client.profile();
        let run_id = self.run_counter.fetch_add(1, Ordering::Relaxed) + 1;

        {
            let mut states = self.states.lock().unwrap();
            let state = states.entry(id).or_insert_with(|| ClientState {
                name: profile.name.clone(),
                ..Default::default()
            });

            if state.triggered && !force_refresh {
                log::trace!("client {id} already triggered, skipping");
                return Ok(());
            }
            if !self.config.allowed_client_names.contains(&profile.name) {
                log::trace!("client {} ({}) not in allow-set", id, profile.name);
                return Ok(());
            }
            if !profile.supports_open_close {
                log::trace!("client {} ({}) lacks open/close sync", id, profile.name);
                return Ok(());
            }
            if state.processing {
                log::warn!(
                    "ingestion already in flight for client {} ({}), ignoring trigger",
                    id,
                    profile.name
                );
                return Ok(());
            }

            state.triggered = true;
            state.processing = true;
            state.run_id = run_id;
        }

        let cancel = CancellationToken::new();
        self.cancel_tokens
            .lock()
            .unwrap()
            .insert(id, (run_id, cancel.clone()));

        let files = self.catalog.get(force_refresh).await;
        let reporter =
            ProgressReporter::new(ProgressMode::from_config(&self.config), client.clone());
        let processed = self
            .pipeline
            .run(files, client, buffer, &cancel, &reporter)
            .await;
        log::trace!("ingestion run {run_id} for client {id} settled ({processed} files)");

        {
            let mut tokens = self.cancel_tokens.lock().unwrap();
            if tokens.get(&id).is_some_and(|(rid, _)| *rid == run_id) {
                tokens.remove(&id);
            }
        }
        {
            let mut states = self.states.lock().unwrap();
            if let Some(state) = states.get_mut(&id) {
                if state.run_id == run_id {
                    state.processing = false;
                }
            }
        }
        Ok(())
    }

    /// Cancel in-flight runs, reset every client state, drop the catalog
    /// cache, then re-trigger with a forced refresh for each client still
    /// attached.
    pub async fn refresh(
        &self,
        clients: &[Arc<dyn LanguageClient>],
        buffer: Option<PathBuf>,
    ) -> anyhow::Result<()> {
        {
            let mut tokens = self.cancel_tokens.lock().unwrap();
            for (_, (_, token)) in tokens.drain() {
                token.cancel();
            }
        }
        self.states.lock().unwrap().clear();
        self.catalog.invalidate();
        log::info!("ingestion state reset, re-triggering {} clients", clients.len());

        for client in clients {
            if client.is_attached() {
                self.trigger(client.clone(), buffer.clone(), true).await?;
            }
        }
        Ok(())
    }

    /// A client was removed from the host: cancel its in-flight run (the
    /// pipeline stops at the next chunk boundary) and forget its state.
    pub fn client_detached(&self, id: ClientId) {
        if let Some((_, token)) = self.cancel_tokens.lock().unwrap().remove(&id) {
            token.cancel();
        }
        if self.states.lock().unwrap().remove(&id).is_some() {
            log::trace!("dropped ingestion state for detached client {id}");
        }
    }

    /// Read-only view: cache contents/age, clients mid-run, clients ever
    /// triggered
    pub fn status(&self) -> StatusReport {
        let (cached_files, cache_age_secs) = match self.catalog.cache_status() {
            Some((count, age)) => (Some(count), Some(age.as_secs())),
            None => (None, None),
        };

        let states = self.states.lock().unwrap();
        let mut processing_clients: Vec<String> = states
            .values()
            .filter(|s| s.processing)
            .map(|s| s.name.clone())
            .collect();
        processing_clients.sort();

        StatusReport {
            cached_files,
            cache_age_secs,
            processing_clients,
            triggered_clients: states.values().filter(|s| s.triggered).count(),
        }
    }
}
