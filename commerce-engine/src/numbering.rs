//! Human-readable document numbers
//!
//! `PREFIX + window date + zero-padded sequence`, e.g. `ORD202610160001`.
//! The sequence comes from an atomic increment on a per-window counter
//! inside the caller's write transaction, so two orders created at the same
//! time can never receive the same number. Counters are never decremented:
//! an aborted transaction rolls its increment back with it.

use crate::storage::{CommerceStorage, StorageResult};
use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use redb::WriteTransaction;

/// Kind of document being numbered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumberKind {
    Order,
    Invoice,
    Shipment,
    Payment,
}

impl NumberKind {
    pub const fn prefix(&self) -> &'static str {
        match self {
            NumberKind::Order => "ORD",
            NumberKind::Invoice => "INV",
            NumberKind::Shipment => "SHP",
            NumberKind::Payment => "PAY",
        }
    }

    /// chrono format of the generation window
    ///
    /// Invoices restart monthly, everything else daily.
    pub const fn window_format(&self) -> &'static str {
        match self {
            NumberKind::Invoice => "%Y%m",
            _ => "%Y%m%d",
        }
    }
}

/// Window key for `now` (Unix millis) in the business time zone
pub fn window_key(kind: NumberKind, tz: Tz, now: i64) -> String {
    let utc: DateTime<Utc> = Utc.timestamp_millis_opt(now).single().unwrap_or_default();
    utc.with_timezone(&tz).format(kind.window_format()).to_string()
}

pub fn format_number(kind: NumberKind, window: &str, sequence: u64) -> String {
    format!("{}{}{:04}", kind.prefix(), window, sequence)
}

/// Issue the next number for `kind` within the current window
pub fn next_number(
    storage: &CommerceStorage,
    txn: &WriteTransaction,
    kind: NumberKind,
    tz: Tz,
    now: i64,
) -> StorageResult<String> {
    let window = window_key(kind, tz, now);
    let counter_key = format!("{}:{}", kind.prefix(), window);
    let sequence = storage.increment_counter(txn, &counter_key)?;
    Ok(format_number(kind, &window, sequence))
}
