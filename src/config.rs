//! Configuration and tunable constants

use std::path::PathBuf;

/// All configurable values for the conversation layer
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the webhook messaging backend
    pub base_url: String,
    /// API key sent on every transport request (if the backend requires one)
    pub api_key: Option<String>,
    /// Max age of a cached contact list before a blocking refetch
    pub contacts_stale_ms: i64,
    /// Distance from the top of the scroll container that triggers an
    /// older-page fetch
    pub scroll_top_threshold_px: f64,
    /// Page size for the initial (most recent) message fetch
    pub initial_page_size: u32,
    /// Page size for older-page fetches
    pub older_page_size: u32,
    /// JSON snapshot of the contact cache, loaded/saved at process boundaries
    pub snapshot_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let state_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("conversa");

        Self {
            base_url: "http://localhost:8080".to_string(),
            api_key: None,
            contacts_stale_ms: CONTACTS_STALE_MS,
            scroll_top_threshold_px: SCROLL_TOP_THRESHOLD_PX,
            initial_page_size: DEFAULT_PAGE_SIZE,
            older_page_size: DEFAULT_PAGE_SIZE,
            snapshot_file: state_dir.join("contacts.json"),
        }
    }
}

impl Config {
    /// Create config for testing with custom paths
    pub fn for_test(temp_dir: &std::path::Path) -> Self {
        Self {
            base_url: "http://localhost:0".to_string(),
            api_key: None,
            contacts_stale_ms: CONTACTS_STALE_MS,
            scroll_top_threshold_px: SCROLL_TOP_THRESHOLD_PX,
            initial_page_size: DEFAULT_PAGE_SIZE,
            older_page_size: DEFAULT_PAGE_SIZE,
            snapshot_file: temp_dir.join("contacts.json"),
        }
    }
}

/// Contact lists older than this are refetched synchronously (ms)
pub const CONTACTS_STALE_MS: i64 = 30_000;

/// Scroll proximity to the container top that arms an older-page fetch (px)
pub const SCROLL_TOP_THRESHOLD_PX: f64 = 100.0;

/// Default page size for message fetches
pub const DEFAULT_PAGE_SIZE: u32 = 20;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.contacts_stale_ms, 30_000);
        assert_eq!(config.initial_page_size, 20);
        assert!(config.snapshot_file.to_string_lossy().contains("contacts.json"));
    }

    #[test]
    fn test_test_config() {
        let temp = std::env::temp_dir();
        let config = Config::for_test(&temp);
        assert!(config.snapshot_file.starts_with(&temp));
    }

    #[test]
    fn test_scroll_threshold() {
        assert_eq!(SCROLL_TOP_THRESHOLD_PX, 100.0);
    }
}
