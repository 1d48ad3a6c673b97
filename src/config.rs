use std::net::SocketAddr;

use crate::tracker::{OwnerId, PageLimits};

/// Configuration for the tracker API server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    /// Default and maximum `limit` accepted by the list endpoint.
    pub page_limits: PageLimits,
    /// Store capacity across all owners.
    pub max_applications: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 5001)),
            page_limits: PageLimits::default(),
            max_applications: 10_000,
        }
    }
}

impl ServerConfig {
    pub fn new(listen_addr: SocketAddr) -> Self {
        Self {
            listen_addr,
            ..Default::default()
        }
    }

    pub fn with_max_page_limit(mut self, max_limit: u32) -> Self {
        self.page_limits.max_limit = max_limit.max(1);
        self.page_limits.default_limit = self
            .page_limits
            .default_limit
            .min(self.page_limits.max_limit);
        self
    }

    pub fn with_capacity(mut self, max_applications: usize) -> Self {
        self.max_applications = max_applications;
        self
    }
}

/// Configuration for the client core talking to a tracker server.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server base URL, without the `/api/tracker` suffix.
    pub base_url: String,
    /// Identity forwarded to the server on every request.
    pub owner_id: OwnerId,
    /// Page size requested by the list view.
    pub page_limit: u32,
    /// Quiet period before a search keystroke is dispatched.
    pub search_debounce_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5001".to_string(),
            owner_id: OwnerId::default(),
            page_limit: 10,
            search_debounce_ms: 300,
            request_timeout_ms: 10_000,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, owner_id: OwnerId) -> Self {
        Self {
            base_url: base_url.into(),
            owner_id,
            ..Default::default()
        }
    }

    pub fn with_page_limit(mut self, page_limit: u32) -> Self {
        self.page_limit = page_limit.max(1);
        self
    }

    pub fn with_search_debounce_ms(mut self, ms: u64) -> Self {
        self.search_debounce_ms = ms;
        self
    }
}
