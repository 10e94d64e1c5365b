//! 状态切换触发器
//!
//! 向服务器发送仪器状态切换请求，发送后立即返回，不等待响应。
//! 界面上的状态由下一次轮询刷新。

use crate::api::OdinApi;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// 相机状态切换命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateChange {
    Connect,
    Disconnect,
    Arm,
    Disarm,
    Start,
    Stop,
    /// 其他命令原样透传
    Custom(String),
}

impl StateChange {
    /// 请求体中使用的命令字符串
    pub fn as_str(&self) -> &str {
        match self {
            StateChange::Connect => "connect",
            StateChange::Disconnect => "disconnect",
            StateChange::Arm => "arm",
            StateChange::Disarm => "disarm",
            StateChange::Start => "start",
            StateChange::Stop => "stop",
            StateChange::Custom(s) => s,
        }
    }
}

impl FromStr for StateChange {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let change = match s.trim().to_lowercase().as_str() {
            "connect" => StateChange::Connect,
            "disconnect" => StateChange::Disconnect,
            "arm" => StateChange::Arm,
            "disarm" => StateChange::Disarm,
            "start" => StateChange::Start,
            "stop" => StateChange::Stop,
            _ => StateChange::Custom(s.trim().to_string()),
        };
        Ok(change)
    }
}

impl fmt::Display for StateChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 服务器报告的相机状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraState {
    Disconnected,
    Connected,
    Armed,
    Recording,
    Unknown(String),
}

impl CameraState {
    /// 解析 `camera_control/status/camera/state`
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "disconnected" => CameraState::Disconnected,
            "connected" => CameraState::Connected,
            "armed" => CameraState::Armed,
            "recording" => CameraState::Recording,
            _ => CameraState::Unknown(name.to_string()),
        }
    }

    /// 当前状态下可用的切换（对应页面上的按钮）
    pub fn available_changes(&self) -> Vec<StateChange> {
        match self {
            CameraState::Disconnected => vec![StateChange::Connect],
            CameraState::Connected => vec![StateChange::Arm, StateChange::Disconnect],
            CameraState::Armed => vec![StateChange::Start, StateChange::Disarm],
            CameraState::Recording => vec![StateChange::Stop],
            CameraState::Unknown(_) => Vec::new(),
        }
    }
}

impl fmt::Display for CameraState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraState::Disconnected => write!(f, "disconnected"),
            CameraState::Connected => write!(f, "connected"),
            CameraState::Armed => write!(f, "armed"),
            CameraState::Recording => write!(f, "recording"),
            CameraState::Unknown(s) => write!(f, "{s}"),
        }
    }
}

/// 状态切换触发器
#[derive(Clone)]
pub struct StateChangeTrigger {
    api: Arc<dyn OdinApi>,
}

impl StateChangeTrigger {
    /// 创建新的触发器
    pub fn new(api: Arc<dyn OdinApi>) -> Self {
        Self { api }
    }

    /// 发送状态切换请求
    ///
    /// 请求在后台任务中执行，结果只记录日志。返回的句柄在完成时给出是否成功，
    /// 调用方可以忽略它。
    pub fn fire(&self, change: StateChange) -> JoinHandle<bool> {
        let api = Arc::clone(&self.api);
        tokio::spawn(async move {
            match api.put_status_change(change.as_str()).await {
                Ok(()) => {
                    info!("已发送状态切换: {}", change);
                    true
                }
                Err(e) => {
                    warn!("状态切换失败 {}: {}", change, e);
                    false
                }
            }
        })
    }

    /// 开关 workshop 后台任务
    pub fn fire_background_task(&self, enable: bool) -> JoinHandle<bool> {
        let api = Arc::clone(&self.api);
        info!("后台任务切换为 {}", if enable { "启用" } else { "停用" });
        tokio::spawn(async move {
            match api.put_background_task(enable).await {
                Ok(()) => true,
                Err(e) => {
                    warn!("后台任务切换失败: {}", e);
                    false
                }
            }
        })
    }
}
