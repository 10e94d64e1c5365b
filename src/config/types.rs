//! 配置数据结构定义
//!
//! 定义应用程序的配置结构体和验证逻辑

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// 主配置结构
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// ODIN 服务器配置
    #[serde(default)]
    pub server: ServerConfig,
    /// 适配器内的端点路径
    #[serde(default)]
    pub endpoints: EndpointConfig,
    /// 轮询配置
    #[serde(default)]
    pub polling: PollingConfig,
    /// 显示配置
    #[serde(default)]
    pub display: DisplayConfig,
}

/// ODIN 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// 服务器根地址
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// 查询 /api 之前使用的 API 版本
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// 适配器名称
    #[serde(default = "default_adapter")]
    pub adapter: String,
    /// 请求超时时间（毫秒）
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

/// 端点路径，相对于 `/api/{version}/{adapter}/`
///
/// 后台任务属于 workshop 适配器，相对于 `/api/{version}/`。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EndpointConfig {
    /// 相机配置
    #[serde(default = "default_camera_config_path")]
    pub camera_config: String,
    /// 状态切换
    #[serde(default = "default_status_change_path")]
    pub status_change: String,
    /// 后台任务开关
    #[serde(default = "default_background_task_path")]
    pub background_task: String,
    /// 相机 JSON 配置文件路径
    #[serde(default = "default_config_file_path")]
    pub config_file: String,
}

/// 轮询配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PollingConfig {
    /// 两次轮询之间的间隔（毫秒）
    #[serde(default = "default_poll_interval")]
    pub interval_ms: u64,
    /// 单次轮询超时（毫秒）
    #[serde(default = "default_poll_timeout")]
    pub timeout_ms: u64,
}

/// 显示配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisplayConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// 日志格式：`text` 或 `json`
    #[serde(default = "default_log_format")]
    pub log_format: String,
    /// 日志文件；设置后日志只写入该文件
    pub log_file: Option<PathBuf>,
    /// 状态面板的 Handlebars 模板
    pub template: Option<String>,
}

// 默认值函数
fn default_base_url() -> String {
    "http://127.0.0.1:8888".to_string()
}
fn default_api_version() -> String {
    "0.1".to_string()
}
fn default_adapter() -> String {
    "inaira".to_string()
}
fn default_request_timeout() -> u64 {
    2000
}
fn default_camera_config_path() -> String {
    "camera_control/config/camera/".to_string()
}
fn default_status_change_path() -> String {
    "camera_control/status_change".to_string()
}
fn default_background_task_path() -> String {
    "workshop/background_task".to_string()
}
fn default_config_file_path() -> String {
    "camera_control/config_file".to_string()
}
fn default_poll_interval() -> u64 {
    500
}
fn default_poll_timeout() -> u64 {
    2000
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_version: default_api_version(),
            adapter: default_adapter(),
            request_timeout_ms: default_request_timeout(),
        }
    }
}

impl ServerConfig {
    /// 请求超时
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            camera_config: default_camera_config_path(),
            status_change: default_status_change_path(),
            background_task: default_background_task_path(),
            config_file: default_config_file_path(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval(),
            timeout_ms: default_poll_timeout(),
        }
    }
}

impl PollingConfig {
    /// 轮询间隔
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// 单次轮询超时
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl DisplayConfig {
    /// 是否输出 JSON 格式日志
    pub fn json_logs(&self) -> bool {
        self.log_format == "json"
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            log_file: None,
            template: None,
        }
    }
}

/// 配置验证函数
///
/// # 参数
/// * `config` - 要验证的配置
///
/// # 返回
/// * `Result<(), String>` - 验证结果，错误时返回错误信息
pub fn validate_config(config: &Config) -> Result<(), String> {
    // 验证服务器地址
    let base_url = &config.server.base_url;
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(format!("服务器地址格式无效: {}", base_url));
    }

    if config.server.api_version.trim().is_empty() {
        return Err("API版本不能为空".to_string());
    }

    if config.server.adapter.trim().is_empty() || config.server.adapter.contains('/') {
        return Err(format!("适配器名称无效: {}", config.server.adapter));
    }

    if config.server.request_timeout_ms == 0 {
        return Err("请求超时时间不能为0".to_string());
    }

    // 验证端点路径
    for (name, path) in [
        ("camera_config", &config.endpoints.camera_config),
        ("status_change", &config.endpoints.status_change),
        ("background_task", &config.endpoints.background_task),
        ("config_file", &config.endpoints.config_file),
    ] {
        if path.trim_matches('/').is_empty() {
            return Err(format!("端点 {} 的路径不能为空", name));
        }
    }

    // 验证轮询参数
    if config.polling.interval_ms == 0 {
        return Err("轮询间隔不能为0".to_string());
    }

    if config.polling.timeout_ms == 0 {
        return Err("轮询超时时间不能为0".to_string());
    }

    // 验证日志级别
    let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_log_levels.contains(&config.display.log_level.as_str()) {
        return Err(format!(
            "无效的日志级别: {}，支持的级别: {:?}",
            config.display.log_level, valid_log_levels
        ));
    }

    let valid_log_formats = ["text", "json"];
    if !valid_log_formats.contains(&config.display.log_format.as_str()) {
        return Err(format!(
            "无效的日志格式: {}，支持的格式: {:?}",
            config.display.log_format, valid_log_formats
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.server.base_url, "http://127.0.0.1:8888");
        assert_eq!(config.server.api_version, "0.1");
        assert_eq!(config.server.adapter, "inaira");
        assert_eq!(config.polling.interval(), Duration::from_millis(500));
        assert_eq!(config.endpoints.status_change, "camera_control/status_change");
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let mut config = Config::default();
        config.display.template = Some("{{frame_number}}".to_string());

        // 测试序列化
        let serialized = toml::to_string(&config).expect("序列化失败");
        assert!(!serialized.is_empty());

        // 测试反序列化
        let deserialized: Config = toml::from_str(&serialized).expect("反序列化失败");
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: Config = toml::from_str("").expect("解析失败");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_config_validation_invalid_url() {
        let mut config = Config::default();
        config.server.base_url = "127.0.0.1:8888".to_string();

        let result = validate_config(&config);
        assert!(result.unwrap_err().contains("服务器地址格式无效"));
    }

    #[test]
    fn test_config_validation_zero_interval() {
        let mut config = Config::default();
        config.polling.interval_ms = 0;

        let result = validate_config(&config);
        assert!(result.unwrap_err().contains("轮询间隔"));
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = Config::default();
        config.display.log_level = "verbose".to_string();

        let result = validate_config(&config);
        assert!(result.unwrap_err().contains("无效的日志级别"));
    }

    #[test]
    fn test_config_validation_accepts_trace_level() {
        let mut config = Config::default();
        config.display.log_level = "trace".to_string();

        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_config_validation_log_format() {
        let mut config = Config::default();
        config.display.log_format = "json".to_string();
        assert!(validate_config(&config).is_ok());
        assert!(config.display.json_logs());

        config.display.log_format = "xml".to_string();
        assert!(validate_config(&config).unwrap_err().contains("无效的日志格式"));
    }

    #[test]
    fn test_display_log_options_from_toml() {
        let config: Config = toml::from_str(
            "[display]\nlog_format = \"json\"\nlog_file = \"/var/log/inaira.log\"\n",
        )
        .expect("解析失败");

        assert!(config.display.json_logs());
        assert_eq!(
            config.display.log_file,
            Some(PathBuf::from("/var/log/inaira.log"))
        );
        assert_eq!(config.endpoints.config_file, "camera_control/config_file");
    }

    #[test]
    fn test_config_validation_empty_endpoint() {
        let mut config = Config::default();
        config.endpoints.camera_config = "/".to_string();

        let result = validate_config(&config);
        assert!(result.unwrap_err().contains("camera_config"));
    }
}
