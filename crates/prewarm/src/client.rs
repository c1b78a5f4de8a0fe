//
// client.rs
//
// Seam between the ingestion machinery and the host's server connections
//

use std::collections::HashSet;

use async_trait::async_trait;
use tower_lsp::lsp_types::{ProgressParams, TextDocumentItem};

/// Host-assigned identity of an attached server connection
pub type ClientId = u64;

/// Capability snapshot for one client, taken once per trigger.
///
/// Capturing the capabilities up front keeps every guard in a trigger
/// evaluating against the same view instead of re-probing the client
/// between awaits.
#[derive(Debug, Clone, Default)]
pub struct ClientProfile {
    /// Server name as registered with the host (e.g. "tsserver")
    pub name: String,
    /// Whether the server has completed initialization and advertised
    /// its capabilities
    pub initialized: bool,
    /// Whether the server declared open/close document sync
    pub supports_open_close: bool,
    /// Language ids the server is interested in; `None` means any
    pub language_ids: Option<HashSet<String>>,
}

impl ClientProfile {
    /// Whether the client wants documents of the given language id
    pub fn accepts_language(&self, language_id: &str) -> bool {
        match &self.language_ids {
            None => true,
            Some(ids) => ids.contains(language_id),
        }
    }
}

/// One attached language-server connection, as the host exposes it.
///
/// Implementations wrap whatever transport the host uses (a tower-lsp
/// `Client`, an editor RPC channel). Notification failures are the
/// implementor's to report; callers treat them as soft.
#[async_trait]
pub trait LanguageClient: Send + Sync {
    fn id(&self) -> ClientId;

    /// Current capability snapshot for this client
    fn profile(&self) -> ClientProfile;

    /// Whether the client is still registered with the host. A client can
    /// vanish at any time; long-running work re-checks this between steps.
    fn is_attached(&self) -> bool;

    /// Send a textDocument/didOpen notification for the given document
    async fn open_document(&self, item: TextDocumentItem) -> anyhow::Result<()>;

    /// Send a $/progress notification attributed to this client
    async fn progress(&self, params: ProgressParams) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_any_language_when_unrestricted() {
        let profile = ClientProfile::default();
        assert!(profile.accepts_language("rust"));
        assert!(profile.accepts_language("plaintext"));
    }

    #[test]
    fn accepts_only_declared_languages() {
        let profile = ClientProfile {
            language_ids: Some(HashSet::from(["typescript".to_string()])),
            ..Default::default()
        };
        assert!(profile.accepts_language("typescript"));
        assert!(!profile.accepts_language("rust"));
    }
}
