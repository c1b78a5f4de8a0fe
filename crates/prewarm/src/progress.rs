//
// progress.rs
//
// Run start/completion signaling, plain or via $/progress
//

use std::sync::Arc;

use tower_lsp::lsp_types::{
    NumberOrString, ProgressParams, ProgressParamsValue, WorkDoneProgress, WorkDoneProgressBegin,
    WorkDoneProgressEnd, WorkDoneProgressReport,
};

use crate::client::LanguageClient;
use crate::config::IngestConfig;

/// How a run announces itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressMode {
    Off,
    /// Plain log notifications at run boundaries
    Log,
    /// Structured $/progress attributed to the client
    Protocol,
}

impl ProgressMode {
    /// Protocol mode wins when both flags are set
    pub fn from_config(config: &IngestConfig) -> Self {
        if config.use_protocol_progress {
            ProgressMode::Protocol
        } else if config.notify_progress {
            ProgressMode::Log
        } else {
            ProgressMode::Off
        }
    }
}

/// Emits exactly one begin and one finish per pipeline run, with optional
/// per-chunk updates in protocol mode to stay below notification spam.
pub struct ProgressReporter {
    mode: ProgressMode,
    client: Arc<dyn LanguageClient>,
}

impl ProgressReporter {
    pub fn new(mode: ProgressMode, client: Arc<dyn LanguageClient>) -> Self {
        Self { mode, client }
    }

    fn token(&self) -> NumberOrString {
        NumberOrString::String(format!("prewarm/{}", self.client.id()))
    }

    async fn send(&self, value: WorkDoneProgress) {
        let params = ProgressParams {
            token: self.token(),
            value: ProgressParamsValue::WorkDone(value),
        };
        if let Err(e) = self.client.progress(params).await {
            log::trace!("progress notification failed: {e}");
        }
    }

    pub async fn begin(&self, total: usize) {
        match self.mode {
            ProgressMode::Off => {}
            ProgressMode::Log => {
                log::info!(
                    "opening {} workspace files for {}",
                    total,
                    self.client.profile().name
                );
            }
            ProgressMode::Protocol => {
                self.send(WorkDoneProgress::Begin(WorkDoneProgressBegin {
                    title: format!("Opening {total} workspace files"),
                    cancellable: Some(false),
                    message: None,
                    percentage: Some(0),
                }))
                .await;
            }
        }
    }

    /// Per-chunk update; protocol mode only
    pub async fn update(&self, processed: usize, total: usize) {
        if self.mode != ProgressMode::Protocol {
            return;
        }
        let percentage = (processed * 100 / total.max(1)) as u32;
        self.send(WorkDoneProgress::Report(WorkDoneProgressReport {
            cancellable: Some(false),
            message: Some(format!("{processed}/{total}")),
            percentage: Some(percentage),
        }))
        .await;
    }

    pub async fn finish(&self, processed: usize) {
        match self.mode {
            ProgressMode::Off => {}
            ProgressMode::Log => {
                log::info!(
                    "workspace ingestion complete for {} ({} files)",
                    self.client.profile().name,
                    processed
                );
            }
            ProgressMode::Protocol => {
                self.send(WorkDoneProgress::End(WorkDoneProgressEnd {
                    message: Some(format!("Opened {processed} workspace files")),
                }))
                .await;
            }
        }
    }
}
