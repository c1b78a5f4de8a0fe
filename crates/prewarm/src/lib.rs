// lib.rs — Proactive workspace file ingestion for language servers.
//
// Language servers normally see only the documents the editor has opened, so
// project-wide diagnostics stay invisible until each file is visited. This
// crate discovers the workspace file set, filters and caches it, and feeds it
// to an attached server as didOpen notifications in bounded concurrent
// chunks, so the server can diagnose the whole project up front.
//
// The host (an editor RPC bridge or tower-lsp frontend) owns client
// registration, command wiring, and logger initialization; it hands this
// crate a validated `IngestConfig` and clients implementing `LanguageClient`.

pub mod catalog;
pub mod client;
pub mod config;
pub mod language;
pub mod pipeline;
pub mod progress;
pub mod session;

#[cfg(test)]
mod test_utils;

pub use catalog::{FileLister, GitFileLister, WorkspaceFileCatalog};
pub use client::{ClientId, ClientProfile, LanguageClient};
pub use config::IngestConfig;
pub use pipeline::IngestPipeline;
pub use progress::{ProgressMode, ProgressReporter};
pub use session::{IngestSession, StatusReport};
