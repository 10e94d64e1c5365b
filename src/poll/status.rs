//! 帧状态面板
//!
//! 每次轮询无条件覆盖只读的显示字段，不做差异比较和过期检测。

use crate::model::{Node, Scalar};
use crate::trigger::CameraState;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

/// 占位显示
const MISSING: &str = "--";

/// 最新的帧/实验/相机状态
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrameStatus {
    /// 帧号
    pub frame_number: Option<u64>,
    /// 单帧处理时间（毫秒）
    pub process_time: Option<f64>,
    /// 分类置信度
    pub certainty: Option<f64>,
    /// 分类结果
    pub classification: Option<String>,
    /// 通过率
    pub pass_ratio: Option<f64>,
    /// 平均处理时间（毫秒）
    pub avg_processing_time: Option<f64>,
    /// 总帧数
    pub total_frames: Option<u64>,
    /// 相机控制通道是否连接
    pub connected: Option<bool>,
    /// 相机状态名
    pub camera_state: Option<String>,
    /// 是否正在采集
    pub acquiring: Option<bool>,
    /// 已采集帧数
    pub frames_acquired: Option<u64>,
    /// 更新时间
    pub updated_at: Option<DateTime<Utc>>,
}

impl FrameStatus {
    /// 从快照中提取状态
    ///
    /// 快照缺少 `frame` 对象或 `frame.frame_number` 为 null 时返回 `None`。
    pub fn from_snapshot(snapshot: &Node) -> Option<Self> {
        let frame = snapshot.section("frame").filter(|node| node.is_nested())?;
        let frame_number = scalar(frame, "frame_number").filter(|v| !v.is_null())?;

        Some(Self {
            frame_number: frame_number.as_u64(),
            process_time: scalar(frame, "process_time").and_then(Scalar::as_f64),
            certainty: scalar(frame, "certainty").and_then(Scalar::as_f64),
            classification: scalar(frame, "classification")
                .and_then(Scalar::as_str)
                .map(str::to_string),
            // 早期服务端把实验统计放在根上
            pass_ratio: lookup(snapshot, &["experiment/pass_ratio", "pass_ratio"])
                .and_then(Scalar::as_f64),
            avg_processing_time: lookup(
                snapshot,
                &["experiment/avg_processing_time", "avg_processing_time"],
            )
            .and_then(Scalar::as_f64),
            total_frames: lookup(snapshot, &["experiment/total_frames", "total_frames"])
                .and_then(Scalar::as_u64),
            connected: lookup(snapshot, &["camera_control/status/connected"])
                .and_then(Scalar::as_bool),
            camera_state: lookup(snapshot, &["camera_control/status/camera/state"])
                .and_then(Scalar::as_str)
                .map(str::to_string),
            acquiring: lookup(snapshot, &["camera_control/status/acquisition/acquiring"])
                .and_then(Scalar::as_bool),
            frames_acquired: lookup(
                snapshot,
                &["camera_control/status/acquisition/frames_acquired"],
            )
            .and_then(Scalar::as_u64),
            updated_at: Some(Utc::now()),
        })
    }

    /// 解析后的相机状态
    pub fn camera_state(&self) -> Option<CameraState> {
        self.camera_state.as_deref().map(CameraState::parse)
    }

    /// 模板渲染上下文，数值按页面的显示精度格式化
    pub fn display_context(&self) -> Value {
        let actions: Vec<String> = self
            .camera_state()
            .map(|state| {
                state
                    .available_changes()
                    .iter()
                    .map(|c| c.to_string())
                    .collect()
            })
            .unwrap_or_default();

        json!({
            "frame_number": text(self.frame_number),
            "process_time": self.process_time.map(|t| format!("{t}ms")).unwrap_or_else(|| MISSING.to_string()),
            "certainty": fixed(self.certainty, 4),
            "classification": self.classification.clone().unwrap_or_else(|| MISSING.to_string()),
            "pass_ratio": fixed(self.pass_ratio, 4),
            "avg_processing_time": self
                .avg_processing_time
                .map(|t| format!("{t:.2}ms"))
                .unwrap_or_else(|| MISSING.to_string()),
            "total_frames": text(self.total_frames),
            "connected": self.connected,
            "camera_state": self.camera_state.clone().unwrap_or_else(|| MISSING.to_string()),
            "acquiring": self.acquiring.unwrap_or(false),
            "frames_acquired": text(self.frames_acquired),
            "actions": actions,
            "updated_at": self.updated_at.map(|t| t.format("%H:%M:%S").to_string()),
        })
    }
}

fn scalar<'a>(node: &'a Node, path: &str) -> Option<&'a Scalar> {
    node.path(path).and_then(Node::as_scalar)
}

/// 依次尝试多个路径，返回第一个非 null 的标量
fn lookup<'a>(snapshot: &'a Node, paths: &[&str]) -> Option<&'a Scalar> {
    paths
        .iter()
        .filter_map(|path| snapshot.section(path).and_then(Node::as_scalar))
        .find(|value| !value.is_null())
}

fn fixed(value: Option<f64>, places: usize) -> String {
    value
        .map(|v| format!("{v:.places$}"))
        .unwrap_or_else(|| MISSING.to_string())
}

fn text<T: ToString>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| MISSING.to_string())
}

/// 状态面板
#[derive(Debug, Default)]
pub struct StatusBoard {
    current: FrameStatus,
    applied: u64,
    skipped: u64,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// 用快照覆盖显示字段
    ///
    /// # 返回
    /// * `bool` - 快照是否被应用；格式不正确的快照被记录并跳过
    pub fn apply(&mut self, snapshot: &Node) -> bool {
        match FrameStatus::from_snapshot(snapshot) {
            Some(status) => {
                debug!("更新帧状态: {:?}", status.frame_number);
                self.current = status;
                self.applied += 1;
                true
            }
            None => {
                warn!("快照中没有有效的帧数据，跳过本次更新");
                self.skipped += 1;
                false
            }
        }
    }

    /// 当前显示的状态
    pub fn current(&self) -> &FrameStatus {
        &self.current
    }

    /// 已应用的快照数
    pub fn applied(&self) -> u64 {
        self.applied
    }

    /// 被跳过的快照数
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}
