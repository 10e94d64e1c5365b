//! 轮询模块
//!
//! 提供串行轮询调度、帧状态面板和面板渲染功能

pub mod scheduler;
pub mod status;
pub mod template;

// 重新导出主要类型
pub use scheduler::{PollOutcome, PollScheduler, PollStats};
pub use status::{FrameStatus, StatusBoard};
pub use template::{default_status_template, StatusRenderer};
