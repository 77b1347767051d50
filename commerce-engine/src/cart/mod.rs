//! Cart Store and Cart Reconciler
//!
//! - [`CartStore`] - one active cart per customer, line/coupon mutations
//! - [`CartReconciler`] - sync of a client-cached cart against live data
//! - [`PricingRules`] - aggregate computation (tax, shipping, coupon cap)

pub mod reconciler;
pub mod store;
pub mod totals;

pub use reconciler::CartReconciler;
pub use store::CartStore;
pub use totals::PricingRules;
