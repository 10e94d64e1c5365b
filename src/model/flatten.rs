//! 快照展平
//!
//! 把任意嵌套的快照投影为单层的 字段名 → 标量 映射。路径信息被丢弃，
//! 不同分支中同名的叶子会相互覆盖，后合并者胜出。

use crate::model::value::{Node, Scalar};
use serde_json::{Map, Value};
use std::collections::btree_map;
use std::collections::{BTreeMap, HashMap};

/// 单层配置映射
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatConfig {
    fields: BTreeMap<String, Scalar>,
}

impl FlatConfig {
    /// 创建空映射
    pub fn new() -> Self {
        Self::default()
    }

    /// 读取字段
    pub fn get(&self, field: &str) -> Option<&Scalar> {
        self.fields.get(field)
    }

    /// 写入字段，返回旧值
    pub fn insert(&mut self, field: impl Into<String>, value: Scalar) -> Option<Scalar> {
        self.fields.insert(field.into(), value)
    }

    /// 是否包含字段
    pub fn contains_key(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// 按字段名排序遍历
    pub fn iter(&self) -> btree_map::Iter<'_, String, Scalar> {
        self.fields.iter()
    }

    /// 转换为一层的快照节点
    pub fn to_node(&self) -> Node {
        Node::Nested(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), Node::Scalar(v.clone())))
                .collect(),
        )
    }

    /// 转换为 JSON 对象，作为 PUT 请求体
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        Value::Object(map)
    }
}

impl FromIterator<(String, Scalar)> for FlatConfig {
    fn from_iter<T: IntoIterator<Item = (String, Scalar)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for FlatConfig {
    type Item = (String, Scalar);
    type IntoIter = btree_map::IntoIter<String, Scalar>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<'a> IntoIterator for &'a FlatConfig {
    type Item = (&'a String, &'a Scalar);
    type IntoIter = btree_map::Iter<'a, String, Scalar>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

/// 待处理的一层条目
///
/// 合并时同名键原位替换，保持首次出现的位置。
#[derive(Default)]
struct Level<'a> {
    entries: Vec<(&'a str, &'a Node)>,
    index: HashMap<&'a str, usize>,
}

impl<'a> Level<'a> {
    fn merge(&mut self, key: &'a str, node: &'a Node) {
        match self.index.get(key) {
            Some(&slot) => self.entries[slot].1 = node,
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push((key, node));
            }
        }
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 展平快照
///
/// 逐层处理：当前层的标量叶子写入结果，嵌套对象的条目合并为下一层，
/// 直到没有嵌套对象为止。根节点本身是标量时没有字段名，结果为空。
pub fn flatten(snapshot: &Node) -> FlatConfig {
    let mut result = FlatConfig::new();

    let mut level = Level::default();
    if let Node::Nested(entries) = snapshot {
        for (key, node) in entries {
            level.merge(key, node);
        }
    }

    while !level.is_empty() {
        let mut next = Level::default();
        for (key, node) in level.entries {
            match node {
                Node::Scalar(value) => {
                    result.insert(key, value.clone());
                }
                Node::Nested(children) => {
                    for (child_key, child) in children {
                        next.merge(child_key, child);
                    }
                }
            }
        }
        level = next;
    }

    result
}
