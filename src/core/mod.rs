//! 核心模块
//!
//! 包含交互会话和命令分发

pub mod app;
pub mod session;

// 重新导出主要类型
pub use app::execute_command;
pub use session::{Flow, Session, SessionCommand};
