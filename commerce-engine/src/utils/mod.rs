//! 工具模块 - 日志、重试等通用工具
//!
//! # 内容
//!
//! - [`logger`] - tracing 日志初始化
//! - [`retry`] - 重复键冲突的指数退避重试

pub mod logger;
pub mod retry;

pub use retry::{RetryPolicy, retry_with_backoff};
