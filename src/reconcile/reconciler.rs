//! 本地/远端配置协调器
//!
//! 周期性刷新远端值的同时保留操作员尚未发送的编辑，
//! 并在需要时只把"已修改且与远端不同"的字段推送回去。

use crate::model::{flatten, FlatConfig, Node, Scalar};
use crate::reconcile::field::{LocalConfig, LocalField};
use tracing::{debug, trace};

/// 配置协调器
///
/// 每个会话创建一次，持有最近一次远端快照、其展平结果和本地副本。
#[derive(Debug, Default)]
pub struct ConfigReconciler {
    /// 最近一次远端快照
    snapshot: Option<Node>,
    /// 最近一次快照的展平结果
    remote: FlatConfig,
    /// 本地副本
    local: LocalConfig,
    /// 正在编辑的字段
    focused: Option<String>,
}

impl ConfigReconciler {
    /// 创建协调器，首次成功刷新后完成初始化
    pub fn new() -> Self {
        Self::default()
    }

    /// 是否已经收到过远端快照
    pub fn is_initialized(&self) -> bool {
        self.snapshot.is_some()
    }

    /// 用远端快照刷新本地副本
    ///
    /// 已修改的字段和当前聚焦的字段保持不变；新出现的字段以未修改状态加入。
    ///
    /// # 返回
    /// * `Vec<String>` - 本地值发生变化、需要重新显示的字段
    pub fn refresh_from_remote(&mut self, snapshot: Node) -> Vec<String> {
        let remote = flatten(&snapshot);
        let mut updated = Vec::new();

        for (name, value) in &remote {
            match self.local.get_mut(name) {
                Some(field) if field.changed => {
                    trace!("字段 {} 有未发送的编辑，跳过刷新", name);
                }
                Some(_) if self.focused.as_deref() == Some(name.as_str()) => {
                    trace!("字段 {} 正在编辑，跳过刷新", name);
                }
                Some(field) => {
                    if field.value != *value {
                        field.value = value.clone();
                        updated.push(name.clone());
                    }
                }
                None => {
                    self.local.insert(name.clone(), LocalField::new(value.clone()));
                    updated.push(name.clone());
                }
            }
        }

        debug!("远端刷新完成: {} 个字段, {} 个更新", remote.len(), updated.len());
        self.remote = remote;
        self.snapshot = Some(snapshot);
        updated
    }

    /// 记录一次本地编辑，不做校验
    pub fn mark_changed(&mut self, field: &str, value: Scalar) {
        debug!("标记字段已修改: {} = {}", field, value);
        self.local.insert(field.to_string(), LocalField::edited(value));
    }

    /// 计算需要推送的差异
    ///
    /// 返回已修改且与远端值不同的字段（远端缺失视为不同），并立即清除这些字段的
    /// 修改标记。清除发生在请求发出之前，请求失败时编辑不会恢复。
    pub fn compute_delta(&mut self, remote: &FlatConfig) -> FlatConfig {
        let mut delta = FlatConfig::new();

        for (name, field) in self.local.iter_mut() {
            if !field.changed {
                continue;
            }
            if remote.get(name) == Some(&field.value) {
                continue;
            }
            delta.insert(name.clone(), field.value.clone());
            field.changed = false;
        }

        debug!("计算配置差异: {} 个字段", delta.len());
        delta
    }

    /// 相对最近一次远端快照计算差异
    pub fn pending_delta(&mut self) -> FlatConfig {
        let remote = self.remote.clone();
        self.compute_delta(&remote)
    }

    /// 放弃所有本地编辑，恢复远端值
    ///
    /// # 返回
    /// * `Vec<String>` - 被恢复的字段
    pub fn reset_to_remote(&mut self, remote: &FlatConfig) -> Vec<String> {
        let mut restored = Vec::new();

        for (name, field) in self.local.iter_mut() {
            if !field.changed {
                continue;
            }
            if let Some(value) = remote.get(name) {
                field.value = value.clone();
            }
            field.changed = false;
            restored.push(name.clone());
        }

        debug!("恢复远端值: {} 个字段", restored.len());
        restored
    }

    /// 相对最近一次远端快照恢复
    pub fn reset_pending(&mut self) -> Vec<String> {
        let remote = self.remote.clone();
        self.reset_to_remote(&remote)
    }

    /// 设置正在编辑的字段
    pub fn set_focus(&mut self, field: impl Into<String>) {
        self.focused = Some(field.into());
    }

    /// 取消聚焦
    pub fn clear_focus(&mut self) {
        self.focused = None;
    }

    pub fn focused(&self) -> Option<&str> {
        self.focused.as_deref()
    }

    /// 本地副本
    pub fn local(&self) -> &LocalConfig {
        &self.local
    }

    /// 单个本地字段
    pub fn field(&self, name: &str) -> Option<&LocalField> {
        self.local.get(name)
    }

    /// 最近一次远端展平结果
    pub fn remote(&self) -> &FlatConfig {
        &self.remote
    }

    /// 最近一次远端快照
    pub fn snapshot(&self) -> Option<&Node> {
        self.snapshot.as_ref()
    }

    /// 有未发送编辑的字段
    pub fn dirty_fields(&self) -> Vec<&str> {
        self.local
            .iter()
            .filter(|(_, field)| field.changed)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}
