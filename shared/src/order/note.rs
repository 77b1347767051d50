//! Free-form order annotations

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum NoteType {
    /// Staff only
    #[default]
    Internal,
    /// Visible to the customer
    Customer,
    /// Written by the engine (cancellation reasons, payment rejections)
    System,
}

/// Order note, append-only
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderNote {
    pub id: String,
    pub order_id: String,
    pub sequence: u64,
    pub note_type: NoteType,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub created_at: i64,
}
