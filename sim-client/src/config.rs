use std::path::PathBuf;
use std::time::Duration;

/// Storage key of the Engine state blob
pub const SAVE_KEY: &str = "EF_SAVE_V1";

/// Storage key of the tour completion flag
pub const TOUR_DONE_KEY: &str = "EF_TUTORIAL_DONE";

/// Client session configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Engine JSON-RPC address (host:port)
    pub engine_addr: String,
    /// LMDB environment directory; `None` keeps state in memory
    pub store_path: Option<PathBuf>,
    /// Namespace prefix for storage keys, so sessions can share one store
    pub session_id: Option<String>,
    /// Maximum notices kept by a session
    pub notice_cap: usize,
    pub chart: ChartConfig,
}

impl ClientConfig {
    /// Storage key, namespaced by session when one is set
    pub fn key(&self, base: &str) -> String {
        match &self.session_id {
            Some(id) => format!("{}:{}", id, base),
            None => base.to_string(),
        }
    }

    pub fn save_key(&self) -> String {
        self.key(SAVE_KEY)
    }

    pub fn tour_done_key(&self) -> String {
        self.key(TOUR_DONE_KEY)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            engine_addr: "127.0.0.1:7880".to_string(),
            store_path: None,
            session_id: None,
            notice_cap: 20,
            chart: ChartConfig::default(),
        }
    }
}

/// Drawing surface size and tour timing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartConfig {
    pub width: f64,
    pub height: f64,
    /// Delay before retrying an unresolved tour target
    pub tour_retry: Duration,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: 920.0,
            height: 360.0,
            tour_retry: Duration::from_millis(120),
        }
    }
}
