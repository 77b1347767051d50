//! Error codes and the client-facing error envelope
//!
//! The engine has its own error enum; at the boundary it is converted into
//! an [`AppError`], whose [`ErrorCode`] is stable across releases. Codes
//! are grouped by thousands (see [`ErrorCategory`]).
//!
//! ```
//! use shared::error::{ApiResponse, AppError, ErrorCode};
//!
//! let err = AppError::new(ErrorCode::CartEmpty).with_detail("cart_id", "c-1");
//! let response: ApiResponse<()> = err.into();
//! assert_eq!(response.code, 3002);
//! ```

mod category;
mod codes;
mod http;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{ApiResponse, AppError, AppResult};
