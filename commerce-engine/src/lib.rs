//! Commerce Engine - 购物车同步与订单生命周期引擎
//!
//! # 架构概述
//!
//! - **购物车** (`cart`): 每个客户一个活动购物车，同步时按实时价格/库存校正
//! - **订单** (`orders`): 购物车 → 不可变订单，受状态机约束
//! - **账本** (`ledger`): 支付、发货记录，发货状态驱动订单状态
//! - **编号** (`numbering`): 按日/月窗口的原子递增编号
//! - **存储** (`storage`): 嵌入式 redb，每个操作一个写事务
//!
//! # 模块结构
//!
//! ```text
//! commerce-engine/src/
//! ├── core/          # 配置
//! ├── utils/         # 日志、重试
//! ├── oracles/       # 库存/价格/商品/客户 外部接口
//! ├── cart/          # 购物车存储、同步、合计
//! ├── orders/        # 工厂、状态机、查询、备注、评分
//! ├── ledger/        # 支付、发货
//! └── engine/        # CommerceEngine 门面
//! ```

pub mod cart;
pub mod core;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod money;
pub mod numbering;
pub mod oracles;
pub mod orders;
pub mod storage;
pub mod utils;

// Re-export 公共类型
pub use cart::{CartReconciler, CartStore, PricingRules};
pub use crate::core::Config;
pub use engine::CommerceEngine;
pub use error::{EngineError, EngineResult, Entity};
pub use ledger::Ledger;
pub use oracles::{
    CustomerLookup, InMemoryCatalog, OracleError, Oracles, PriceOracle, ProductLookup, StockOracle,
};
pub use orders::{OrderManager, replay_status};
pub use storage::{CommerceStorage, StorageError};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};
