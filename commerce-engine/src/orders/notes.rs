//! Order notes (append-only)

use super::OrderManager;
use crate::error::{EngineError, EngineResult, Entity};
use crate::storage::StorageError;
use shared::order::{NoteType, OrderNote};
use shared::util::{new_id, now_millis};

/// Notes longer than this are rejected
const MAX_NOTE_LEN: usize = 2000;

impl OrderManager {
    pub fn add_note(
        &self,
        order_id: &str,
        note_type: NoteType,
        content: &str,
        author: Option<&str>,
    ) -> EngineResult<OrderNote> {
        let content = content.trim();
        if content.is_empty() {
            return Err(EngineError::Validation("note content is required".into()));
        }
        if content.chars().count() > MAX_NOTE_LEN {
            return Err(EngineError::Validation(format!(
                "note exceeds {} characters",
                MAX_NOTE_LEN
            )));
        }

        let txn = self.storage.begin_write()?;
        if self.storage.get_order_txn(&txn, order_id)?.is_none() {
            return Err(EngineError::not_found(Entity::Order, order_id));
        }
        let note = self.storage.append_note(
            &txn,
            OrderNote {
                id: new_id(),
                order_id: order_id.to_string(),
                sequence: 0,
                note_type,
                content: content.to_string(),
                author: author.map(str::to_string),
                created_at: now_millis(),
            },
        )?;
        txn.commit().map_err(StorageError::from)?;

        tracing::debug!(order_id = %order_id, note_type = ?note_type, "Order note added");
        Ok(note)
    }

    /// Notes for an order, oldest first
    pub fn list_notes(&self, order_id: &str) -> EngineResult<Vec<OrderNote>> {
        self.get_order(order_id)?;
        Ok(self.storage.get_notes(order_id)?)
    }
}
