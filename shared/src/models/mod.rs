//! Data models
//!
//! Shared between the engine and the admin/customer-facing layers.
//! All IDs are `String` (UUID v4), timestamps are Unix millis.

pub mod cart;
pub mod product;
pub mod sync;

// Re-exports
pub use cart::*;
pub use product::*;
pub use sync::*;
