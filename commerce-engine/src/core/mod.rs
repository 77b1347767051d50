//! 核心模块 - 引擎配置
//!
//! # 模块结构
//!
//! - [`Config`] - 引擎配置 (环境变量 + 默认值)

pub mod config;

pub use config::Config;
