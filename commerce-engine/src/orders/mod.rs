//! Order lifecycle
//!
//! # 模块结构
//!
//! ```text
//! orders/
//! ├── factory.rs        # 购物车 → 订单 + 发票
//! ├── state_machine.rs  # 状态转换、副作用、历史记录
//! ├── query.rs          # 查询、过滤
//! ├── notes.rs          # 订单备注
//! └── rating.rs         # 订单评分
//! ```
//!
//! All operations are methods on [`OrderManager`]; each mutating method is
//! one redb write transaction.

pub mod factory;
pub mod notes;
pub mod query;
pub mod rating;
pub mod state_machine;

pub use state_machine::replay_status;

use crate::storage::CommerceStorage;
use chrono_tz::Tz;
use rust_decimal::Decimal;

/// Order operations over the shared storage
#[derive(Debug, Clone)]
pub struct OrderManager {
    storage: CommerceStorage,
    business_tz: Tz,
    /// Per-item informational tax
    tax_rate: Decimal,
}

impl OrderManager {
    pub fn new(storage: CommerceStorage, business_tz: Tz, tax_rate: Decimal) -> Self {
        Self {
            storage,
            business_tz,
            tax_rate,
        }
    }
}
