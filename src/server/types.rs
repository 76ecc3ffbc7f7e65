//! Wire types of the sync endpoints

use serde::{Deserialize, Serialize};

/// `?id=` query of `/sync`
#[derive(Debug, Default, Deserialize)]
pub struct SyncQuery {
    pub id: Option<String>,
}

/// Error reply, `{"error": "..."}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self { error: message.into() }
    }
}

/// Health check reply
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Backend name, `None` when unconfigured
    pub store: Option<&'static str>,
}
