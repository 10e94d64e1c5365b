//! 错误处理模块
//!
//! 定义应用程序的统一错误类型

use thiserror::Error;

/// INAIRA 监控客户端的主要错误类型
#[derive(Error, Debug)]
pub enum InairaError {
    /// 配置相关错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// ODIN API 相关错误
    #[error("API错误: {0}")]
    Api(#[from] ApiError),

    /// 显示模板错误
    #[error("模板错误: {0}")]
    Template(String),

    /// IO错误
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON序列化/反序列化错误
    #[error("JSON错误: {0}")]
    Json(#[from] serde_json::Error),

    /// 其他错误
    #[error("其他错误: {0}")]
    Other(#[from] anyhow::Error),
}

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 配置文件解析错误
    #[error("配置文件解析失败: {0}")]
    ParseError(String),

    /// 配置验证错误
    #[error("配置验证失败: {0}")]
    ValidationError(String),

    /// 配置文件不存在
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    /// 环境变量替换错误
    #[error("环境变量替换失败: {var}")]
    EnvVarError { var: String },
}

/// ODIN API 错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    /// HTTP请求错误
    #[error("HTTP请求失败: {0}")]
    RequestError(#[from] reqwest::Error),

    /// 超时错误
    #[error("请求超时: {url}")]
    Timeout { url: String },

    /// 非 2xx 状态码
    #[error("服务器返回错误状态: {status} ({url})")]
    Status { status: u16, url: String },

    /// 响应缺少预期字段
    #[error("响应缺少字段: {field}")]
    MissingField { field: String },

    /// 响应体无法解析
    #[error("响应解析失败: {0}")]
    Decode(String),
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, InairaError>;
