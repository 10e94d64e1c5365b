//! ODIN API 模块
//!
//! 提供访问 INAIRA 控制服务器 JSON 端点的客户端

pub mod client;

// 重新导出主要类型
pub use client::{HttpOdinClient, OdinApi};
