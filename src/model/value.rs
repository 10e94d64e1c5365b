//! 快照值模型
//!
//! 远端返回的 JSON 被转换为带标签的 [`Node`] 树：每个节点要么是标量叶子，
//! 要么是保持服务端键顺序的嵌套对象。

use serde_json::{Map, Number, Value};
use std::fmt;

/// 新版服务端把所有参数包在该键下
pub const ADAPTER_WRAPPER: &str = "odin_inaira";

/// 叶子标量值
#[derive(Debug, Clone)]
pub enum Scalar {
    /// JSON null
    Null,
    /// 布尔值
    Bool(bool),
    /// 数值
    Number(Number),
    /// 字符串
    Text(String),
}

impl Scalar {
    /// 解析操作员输入的值
    ///
    /// 能解析为 JSON 标量时按 JSON 处理（`12`、`true`、`"abc"`、`null`），
    /// 否则原样作为字符串。不做任何校验。
    pub fn parse_input(raw: &str) -> Self {
        let trimmed = raw.trim();
        match serde_json::from_str::<Value>(trimmed) {
            Ok(Value::Null) => Scalar::Null,
            Ok(Value::Bool(b)) => Scalar::Bool(b),
            Ok(Value::Number(n)) => Scalar::Number(n),
            Ok(Value::String(s)) => Scalar::Text(s),
            _ => Scalar::Text(trimmed.to_string()),
        }
    }

    /// 是否为 null
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// 数值形式
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    /// 无符号整数形式
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Scalar::Number(n) => n.as_u64(),
            _ => None,
        }
    }

    /// 布尔形式
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// 字符串形式
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            _ => None,
        }
    }

    /// 转换回 JSON
    pub fn to_json(&self) -> Value {
        match self {
            Scalar::Null => Value::Null,
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Number(n) => Value::Number(n.clone()),
            Scalar::Text(s) => Value::String(s.clone()),
        }
    }
}

fn number_eq(a: &Number, b: &Number) -> bool {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x == y;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

// 数值按值比较：10 与 10.0 相等
impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Scalar::Null, Scalar::Null) => true,
            (Scalar::Bool(a), Scalar::Bool(b)) => a == b,
            (Scalar::Number(a), Scalar::Number(b)) => number_eq(a, b),
            (Scalar::Text(a), Scalar::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => write!(f, "null"),
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Number(n) => write!(f, "{n}"),
            Scalar::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Number(Number::from(value))
    }
}

impl From<u64> for Scalar {
    fn from(value: u64) -> Self {
        Scalar::Number(Number::from(value))
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Number::from_f64(value)
            .map(Scalar::Number)
            .unwrap_or(Scalar::Null)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

/// 快照节点
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// 叶子
    Scalar(Scalar),
    /// 嵌套对象，保持键的到达顺序
    Nested(Vec<(String, Node)>),
}

impl Node {
    /// 空对象
    pub fn empty() -> Self {
        Node::Nested(Vec::new())
    }

    /// 取直接子节点
    pub fn get(&self, key: &str) -> Option<&Node> {
        match self {
            Node::Nested(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            Node::Scalar(_) => None,
        }
    }

    /// 按 `/` 分隔的路径取节点，忽略首尾及重复的分隔符
    pub fn path(&self, path: &str) -> Option<&Node> {
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .try_fold(self, |node, segment| node.get(segment))
    }

    /// 查找某个参数段
    ///
    /// 先在根上查找，找不到再到 `odin_inaira` 包装下查找，
    /// 兼容不同版本服务端的参数树布局。
    pub fn section(&self, path: &str) -> Option<&Node> {
        self.path(path)
            .or_else(|| self.get(ADAPTER_WRAPPER).and_then(|inner| inner.path(path)))
    }

    /// 叶子标量
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Node::Scalar(s) => Some(s),
            Node::Nested(_) => None,
        }
    }

    /// 是否为嵌套对象
    pub fn is_nested(&self) -> bool {
        matches!(self, Node::Nested(_))
    }

    /// 整棵树中的叶子数量
    pub fn leaf_count(&self) -> usize {
        match self {
            Node::Scalar(_) => 1,
            Node::Nested(entries) => entries.iter().map(|(_, v)| v.leaf_count()).sum(),
        }
    }

    /// 转换回 JSON
    pub fn to_json(&self) -> Value {
        match self {
            Node::Scalar(s) => s.to_json(),
            Node::Nested(entries) => {
                let map: Map<String, Value> = entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect();
                Value::Object(map)
            }
        }
    }
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Node::Scalar(Scalar::Null),
            Value::Bool(b) => Node::Scalar(Scalar::Bool(b)),
            Value::Number(n) => Node::Scalar(Scalar::Number(n)),
            Value::String(s) => Node::Scalar(Scalar::Text(s)),
            // 数组按下标作为键处理
            Value::Array(items) => Node::Nested(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, v)| (i.to_string(), Node::from(v)))
                    .collect(),
            ),
            Value::Object(map) => {
                Node::Nested(map.into_iter().map(|(k, v)| (k, Node::from(v))).collect())
            }
        }
    }
}

impl From<Scalar> for Node {
    fn from(value: Scalar) -> Self {
        Node::Scalar(value)
    }
}
