//! 快照数据模型
//!
//! 提供带标签的快照节点和展平功能

pub mod flatten;
pub mod value;

// 重新导出主要类型
pub use flatten::{flatten, FlatConfig};
pub use value::{Node, Scalar, ADAPTER_WRAPPER};
