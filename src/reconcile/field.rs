//! 本地字段
//!
//! 每个远端字段在本地都有一个影子副本，带有"已修改"标记。

use crate::model::Scalar;
use std::collections::BTreeMap;

/// 本地字段副本
#[derive(Debug, Clone, PartialEq)]
pub struct LocalField {
    /// 当前本地值
    pub value: Scalar,
    /// 是否存在尚未发送的本地编辑
    pub changed: bool,
}

impl LocalField {
    /// 以远端值创建未修改的字段
    pub fn new(value: Scalar) -> Self {
        Self {
            value,
            changed: false,
        }
    }

    /// 创建带有待发送编辑的字段
    pub fn edited(value: Scalar) -> Self {
        Self {
            value,
            changed: true,
        }
    }
}

/// 字段名 → 本地字段
pub type LocalConfig = BTreeMap<String, LocalField>;
