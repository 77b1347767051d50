//! Product view as returned by the catalog lookup

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Catalog publication status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    Draft,
    #[default]
    Published,
    Archived,
}

/// Product information resolved from the catalog
///
/// Only the fields the cart and order snapshots need. The catalog itself
/// is owned by another service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductInfo {
    pub id: String,
    pub name: String,
    /// Localized display name (e.g. the storefront's secondary language)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_localized: Option<String>,
    pub sku: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub is_active: bool,
    pub status: ProductStatus,
    pub base_price: Decimal,
}

impl ProductInfo {
    /// A product can be sold only when active and published
    pub fn is_sellable(&self) -> bool {
        self.is_active && self.status == ProductStatus::Published
    }
}
