//
// pipeline.rs
//
// Chunked, bounded-concurrency file ingestion
//

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tower_lsp::lsp_types::{TextDocumentItem, Url};

use crate::client::{ClientProfile, LanguageClient};
use crate::config::IngestConfig;
use crate::language::language_id_for_path;
use crate::progress::ProgressReporter;

/// Drives one ingestion run: files are read concurrently within fixed-size
/// chunks, each chunk drains completely before the next is dispatched, and
/// an explicit delay between chunks yields the loop back to the host.
pub struct IngestPipeline {
    chunk_size: usize,
    chunk_delay: Duration,
}

impl IngestPipeline {
    pub fn new(config: &IngestConfig) -> Self {
        Self {
            chunk_size: config.chunk_size.max(1),
            chunk_delay: config.chunk_delay,
        }
    }

    /// Process `files` against `client`, returning the processed count.
    ///
    /// Every file counts as processed exactly once: skipped (equal to
    /// `skip`, typically the buffer already open in the editor), failed to
    /// read, filtered by language interest, or sent as didOpen. Read
    /// failures are silent; the run never aborts over one file.
    ///
    /// Cancellation and client detach are observed at chunk boundaries; an
    /// interrupted run returns early with the partial count so the caller
    /// can settle its bookkeeping.
    pub async fn run(
        &self,
        files: Vec<PathBuf>,
        client: Arc<dyn LanguageClient>,
        skip: Option<PathBuf>,
        cancel: &CancellationToken,
        reporter: &ProgressReporter,
    ) -> usize {
        let total = files.len();
        let profile = client.profile();
        let mut processed = 0usize;

        reporter.begin(total).await;

        let mut next = 0usize;
        while next < total {
            if cancel.is_cancelled() || !client.is_attached() {
                log::trace!(
                    "ingestion for {} halted at {}/{} files",
                    profile.name,
                    processed,
                    total
                );
                break;
            }

            let end = (next + self.chunk_size).min(total);
            let mut tasks: JoinSet<()> = JoinSet::new();

            for path in &files[next..end] {
                if skip.as_deref() == Some(path.as_path()) {
                    // Already open in the editor; a duplicate didOpen would
                    // clash with the live document.
                    processed += 1;
                    continue;
                }
                let client = client.clone();
                let profile = profile.clone();
                let path = path.clone();
                tasks.spawn(async move {
                    ingest_file(client, &profile, &path).await;
                });
            }

            // Chunk barrier: every read settles before the next chunk starts
            while let Some(result) = tasks.join_next().await {
                if result.is_err() {
                    log::trace!("ingestion task aborted");
                }
                processed += 1;
            }

            reporter.update(processed, total).await;

            next = end;
            if next < total && !self.chunk_delay.is_zero() {
                tokio::time::sleep(self.chunk_delay).await;
            }
        }

        reporter.finish(processed).await;
        processed
    }
}

/// Read one file and send it as didOpen if the client wants its language.
/// Any filesystem error skips the file without surfacing anything.
async fn ingest_file(client: Arc<dyn LanguageClient>, profile: &ClientProfile, path: &Path) {
    let meta = match tokio::fs::metadata(path).await {
        Ok(meta) => meta,
        Err(e) => {
            log::trace!("skipping {}: {e}", path.display());
            return;
        }
    };
    if !meta.is_file() {
        return;
    }

    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) => {
            log::trace!("skipping {}: {e}", path.display());
            return;
        }
    };

    let language_id = language_id_for_path(path);
    if !profile.accepts_language(&language_id) {
        return;
    }

    let Ok(uri) = Url::from_file_path(path) else {
        log::trace!("skipping {}: not a valid file URI", path.display());
        return;
    };

    let item = TextDocumentItem {
        uri,
        language_id,
        version: 0,
        text,
    };
    if let Err(e) = client.open_document(item).await {
        log::trace!("didOpen for {} failed: {e}", path.display());
    }
}
