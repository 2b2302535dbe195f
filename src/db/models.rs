//! Database model types.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// An exported gateway plan.
#[derive(Debug, Clone, Serialize)]
pub struct SavedPlan {
    pub id: i64,
    pub name: String,
    pub gateway_type: String,
    pub gateway_count: i64,
    pub stream_count: i64,
    /// The export document as JSON.
    pub document: String,
    pub created_at: DateTime<Utc>,
}

impl Default for SavedPlan {
    fn default() -> Self {
        Self {
            id: 0,
            name: String::new(),
            gateway_type: "8ch".to_string(),
            gateway_count: 1,
            stream_count: 0,
            document: "{}".to_string(),
            created_at: Utc::now(),
        }
    }
}

/// Plan listing row, without the document body.
#[derive(Debug, Clone, Serialize)]
pub struct PlanSummary {
    pub id: i64,
    pub name: String,
    pub gateway_type: String,
    pub gateway_count: i64,
    pub stream_count: i64,
    pub created_at: DateTime<Utc>,
}
