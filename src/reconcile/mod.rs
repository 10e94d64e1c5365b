//! 配置协调模块
//!
//! 维护可编辑的本地配置副本，并与周期性的远端刷新保持同步

pub mod field;
pub mod reconciler;

// 重新导出主要类型
pub use field::{LocalConfig, LocalField};
pub use reconciler::ConfigReconciler;
