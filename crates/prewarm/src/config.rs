//
// config.rs
//
// Ingestion configuration
//

use std::collections::HashSet;
use std::time::Duration;

/// Ingestion configuration.
///
/// Immutable once constructed; the host validates settings before building
/// one and replaces the whole value when settings change.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Whether a client attach event starts the readiness wait automatically
    pub auto_trigger: bool,
    /// How long a cached workspace listing stays valid
    pub cache_ttl: Duration,
    /// Number of files read concurrently per chunk (> 0)
    pub chunk_size: usize,
    /// Pause between chunks, yielding the loop back to the host
    pub chunk_delay: Duration,
    /// Emit plain log notifications for run start/completion
    pub notify_progress: bool,
    /// Emit $/progress notifications instead; wins over `notify_progress`
    pub use_protocol_progress: bool,
    /// Server names ingestion is allowed for
    pub allowed_client_names: HashSet<String>,
    /// File extensions to ingest, with leading dot (e.g. ".ts")
    pub allowed_extensions: HashSet<String>,
    /// Substrings that exclude a path when they occur anywhere in it
    pub ignore_patterns: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            auto_trigger: true,
            cache_ttl: Duration::from_secs(30),
            chunk_size: 10,
            chunk_delay: Duration::from_millis(50),
            notify_progress: true,
            use_protocol_progress: false,
            allowed_client_names: HashSet::new(),
            allowed_extensions: HashSet::new(),
            ignore_patterns: vec!["/node_modules/".to_string(), "/.git/".to_string()],
        }
    }
}

impl IngestConfig {
    /// Parse ingestion configuration from LSP settings.
    ///
    /// Reads the top-level `prewarm` section from a `serde_json::Value`.
    /// Only fields present in the JSON are applied; absent fields retain
    /// their defaults. Returns `None` when the section is missing.
    pub fn from_settings(settings: &serde_json::Value) -> Option<Self> {
        let section = settings.get("prewarm")?;

        let mut config = Self::default();

        if let Some(v) = section.get("autoTrigger").and_then(|v| v.as_bool()) {
            config.auto_trigger = v;
        }
        if let Some(v) = section.get("cacheTtlSeconds").and_then(|v| v.as_u64()) {
            config.cache_ttl = Duration::from_secs(v);
        }
        if let Some(v) = section.get("chunkSize").and_then(|v| v.as_u64()) {
            config.chunk_size = v as usize;
        }
        if let Some(v) = section.get("chunkDelayMs").and_then(|v| v.as_u64()) {
            config.chunk_delay = Duration::from_millis(v);
        }
        if let Some(v) = section.get("notifyProgress").and_then(|v| v.as_bool()) {
            config.notify_progress = v;
        }
        if let Some(v) = section.get("useProtocolProgress").and_then(|v| v.as_bool()) {
            config.use_protocol_progress = v;
        }
        if let Some(names) = section.get("allowedClientNames").and_then(|v| v.as_array()) {
            config.allowed_client_names = names
                .iter()
                .filter_map(|n| n.as_str())
                .map(str::to_string)
                .collect();
        }
        if let Some(exts) = section.get("allowedExtensions").and_then(|v| v.as_array()) {
            config.allowed_extensions = exts
                .iter()
                .filter_map(|e| e.as_str())
                .map(str::to_string)
                .collect();
        }
        if let Some(patterns) = section.get("ignorePatterns").and_then(|v| v.as_array()) {
            config.ignore_patterns = patterns
                .iter()
                .filter_map(|p| p.as_str())
                .map(str::to_string)
                .collect();
        }

        Some(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_values() {
        let config = IngestConfig::default();
        assert!(config.auto_trigger);
        assert_eq!(config.cache_ttl, Duration::from_secs(30));
        assert_eq!(config.chunk_size, 10);
        assert_eq!(config.chunk_delay, Duration::from_millis(50));
        assert!(config.notify_progress);
        assert!(!config.use_protocol_progress);
        assert!(config.allowed_client_names.is_empty());
        assert!(config.allowed_extensions.is_empty());
        assert_eq!(config.ignore_patterns, vec!["/node_modules/", "/.git/"]);
    }

    #[test]
    fn test_from_settings_applies_present_fields() {
        let settings = json!({
            "prewarm": {
                "autoTrigger": false,
                "cacheTtlSeconds": 120,
                "chunkSize": 4,
                "chunkDelayMs": 10,
                "useProtocolProgress": true,
                "allowedClientNames": ["tsserver", "rust-analyzer"],
                "allowedExtensions": [".ts", ".rs"],
                "ignorePatterns": ["/target/"]
            }
        });

        let config = IngestConfig::from_settings(&settings).unwrap();
        assert!(!config.auto_trigger);
        assert_eq!(config.cache_ttl, Duration::from_secs(120));
        assert_eq!(config.chunk_size, 4);
        assert_eq!(config.chunk_delay, Duration::from_millis(10));
        assert!(config.use_protocol_progress);
        assert!(config.allowed_client_names.contains("tsserver"));
        assert!(config.allowed_client_names.contains("rust-analyzer"));
        assert!(config.allowed_extensions.contains(".rs"));
        assert_eq!(config.ignore_patterns, vec!["/target/"]);
    }

    #[test]
    fn test_from_settings_keeps_defaults_for_absent_fields() {
        let settings = json!({
            "prewarm": { "chunkSize": 2 }
        });

        let config = IngestConfig::from_settings(&settings).unwrap();
        assert_eq!(config.chunk_size, 2);
        // Everything else stays at the default
        assert!(config.auto_trigger);
        assert_eq!(config.cache_ttl, Duration::from_secs(30));
        assert!(config.notify_progress);
    }

    #[test]
    fn test_from_settings_missing_section() {
        let settings = json!({ "otherPlugin": {} });
        assert!(IngestConfig::from_settings(&settings).is_none());
    }
}
