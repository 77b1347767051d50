//! Shared types for the commerce engine
//!
//! Domain model (carts, orders, ledgers), sync diagnostics, and the
//! unified error code table used by the engine and by the exposed
//! admin/customer-facing layers.

pub mod error;
pub mod models;
pub mod order;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCode};
