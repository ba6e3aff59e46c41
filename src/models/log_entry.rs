use serde::{Deserialize, Serialize};
use std::fmt;

/// One row of the appliance audit trail
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(default)]
    pub log_id: Option<u32>,
    #[serde(default)]
    pub user_id: Option<u32>,
    pub timestamp: String,
    pub event_type: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub detail_message: Option<String>,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let user = self
            .user_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());
        write!(
            f,
            "{} | user={} | {} | {}",
            self.timestamp,
            user,
            self.event_type,
            self.status.as_deref().unwrap_or("-")
        )
    }
}
