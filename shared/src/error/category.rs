//! Error code families

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

/// Family an [`ErrorCode`] belongs to, by its thousands digit
///
/// | Range | Family |
/// |-------|--------|
/// | 0xxx | general |
/// | 3xxx | cart |
/// | 4xxx | order |
/// | 5xxx | payment and invoice |
/// | 6xxx | product and stock |
/// | 7xxx | shipment |
/// | 9xxx | system |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    General,
    Cart,
    Order,
    Payment,
    Product,
    Shipment,
    System,
}

impl ErrorCategory {
    pub const fn of(code: u16) -> Self {
        match code / 1000 {
            0 => Self::General,
            3 => Self::Cart,
            4 => Self::Order,
            5 => Self::Payment,
            6 => Self::Product,
            7 => Self::Shipment,
            _ => Self::System,
        }
    }

    /// Whether the caller can fix the request and try again
    pub const fn is_client_side(&self) -> bool {
        !matches!(self, Self::System)
    }
}

impl ErrorCode {
    pub const fn category(&self) -> ErrorCategory {
        ErrorCategory::of(self.code())
    }
}
