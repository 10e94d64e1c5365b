//! INAIRA Monitor - ODIN INAIRA 相机控制与帧状态监控客户端
//!
//! 这是一个用Rust编写的终端客户端，支持：
//! - 串行轮询适配器快照，不会出现重叠请求
//! - 帧/实验/相机状态面板
//! - 相机配置的本地编辑、差异推送和远端刷新协调
//! - 相机状态切换和后台任务开关
//! - 结构化日志记录

pub mod api;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod model;
pub mod poll;
pub mod reconcile;
pub mod trigger;

#[cfg(test)]
mod logging_tests;

// 重新导出主要类型
pub use api::{HttpOdinClient, OdinApi};
pub use config::Config;
pub use error::{InairaError, Result};
pub use model::{flatten, FlatConfig, Node, Scalar};
pub use poll::{PollScheduler, StatusBoard};
pub use reconcile::ConfigReconciler;

/// 应用程序版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 应用程序名称
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// 应用程序描述
pub const APP_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
