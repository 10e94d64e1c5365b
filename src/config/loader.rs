//! 配置加载器实现
//!
//! 提供TOML配置文件解析、环境变量替换和错误处理功能

use crate::config::types::{validate_config, Config};
use crate::error::{ConfigError, Result};
use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};

/// 默认配置文件名
pub const DEFAULT_CONFIG_FILE: &str = "inaira.toml";

/// `init` 命令写出的配置模板
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# INAIRA 监控客户端配置

[server]
base_url = "http://127.0.0.1:8888"
# 查询 /api 之前使用的版本
api_version = "0.1"
adapter = "inaira"
request_timeout_ms = 2000

[endpoints]
camera_config = "camera_control/config/camera/"
status_change = "camera_control/status_change"
background_task = "workshop/background_task"
config_file = "camera_control/config_file"

[polling]
interval_ms = 500
timeout_ms = 2000

[display]
log_level = "info"
# text 或 json
log_format = "text"
# 设置后日志写入文件而不是终端
# log_file = "/var/log/inaira-monitor.log"
"#;

/// 配置加载器trait，定义配置加载接口
#[async_trait]
pub trait ConfigLoader: Send + Sync {
    /// 从文件加载配置
    ///
    /// # 参数
    /// * `path` - 配置文件路径
    ///
    /// # 返回
    /// * `Result<Config>` - 加载的配置或错误
    async fn load_from_file<P: AsRef<Path> + Send>(&self, path: P) -> Result<Config>;

    /// 从字符串加载配置
    async fn load_from_string(&self, content: &str) -> Result<Config>;

    /// 验证配置
    fn validate(&self, config: &Config) -> Result<()>;
}

/// TOML配置加载器实现
#[derive(Debug, Clone)]
pub struct TomlConfigLoader {
    /// 是否启用环境变量替换
    enable_env_substitution: bool,
}

impl TomlConfigLoader {
    /// 创建新的TOML配置加载器
    ///
    /// # 参数
    /// * `enable_env_substitution` - 是否启用环境变量替换
    pub fn new(enable_env_substitution: bool) -> Self {
        Self {
            enable_env_substitution,
        }
    }

    /// 替换字符串中的 `${VAR_NAME}` 环境变量
    fn substitute_env_vars(&self, content: &str) -> Result<String> {
        if !self.enable_env_substitution {
            return Ok(content.to_string());
        }

        let env_var_regex = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}")
            .map_err(|e| ConfigError::ParseError(format!("正则表达式错误: {}", e)))?;

        let mut result = content.to_string();

        for captures in env_var_regex.captures_iter(content) {
            let full_match = &captures[0];
            let var_name = &captures[1];

            match std::env::var(var_name) {
                Ok(value) => {
                    result = result.replace(full_match, &value);
                }
                Err(_) => {
                    return Err(ConfigError::EnvVarError {
                        var: var_name.to_string(),
                    }
                    .into());
                }
            }
        }

        Ok(result)
    }

    /// 解析TOML内容
    fn parse_toml(&self, content: &str) -> Result<Config> {
        let processed_content = self.substitute_env_vars(content)?;

        let config: Config = toml::from_str(&processed_content)
            .map_err(|e| ConfigError::ParseError(format!("TOML解析失败: {}", e)))?;

        Ok(config)
    }

    /// 加载配置；文件不存在时使用默认配置
    pub async fn load_or_default<P: AsRef<Path> + Send>(&self, path: P) -> Result<Config> {
        let path = path.as_ref();
        if path.exists() {
            self.load_from_file(path).await
        } else {
            log::warn!("配置文件不存在，使用默认配置: {}", path.display());
            Ok(Config::default())
        }
    }
}

#[async_trait]
impl ConfigLoader for TomlConfigLoader {
    async fn load_from_file<P: AsRef<Path> + Send>(&self, path: P) -> Result<Config> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_string_lossy().to_string(),
            }
            .into());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::ParseError(format!("读取文件失败: {}", e)))?;

        let config = self.parse_toml(&content)?;
        self.validate(&config)?;

        log::info!("成功加载配置文件: {}", path.display());
        log::debug!("配置内容: {:?}", config);

        Ok(config)
    }

    async fn load_from_string(&self, content: &str) -> Result<Config> {
        let config = self.parse_toml(content)?;
        self.validate(&config)?;

        log::debug!("成功解析配置字符串");

        Ok(config)
    }

    fn validate(&self, config: &Config) -> Result<()> {
        validate_config(config).map_err(|e| ConfigError::ValidationError(e).into())
    }
}

/// 获取默认配置文件路径
///
/// 当前目录存在 `inaira.toml` 时使用它，否则使用用户配置目录下的
/// `inaira-monitor/inaira.toml`。
pub fn get_default_config_path() -> PathBuf {
    if Path::new(DEFAULT_CONFIG_FILE).exists() {
        PathBuf::from(DEFAULT_CONFIG_FILE)
    } else {
        dirs::config_dir()
            .map(|config_dir| config_dir.join(crate::APP_NAME).join(DEFAULT_CONFIG_FILE))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const TEST_CONFIG_TOML: &str = r#"
[server]
base_url = "http://odin.local:8888"
adapter = "inaira"

[polling]
interval_ms = 1000
"#;

    const TEST_CONFIG_WITH_ENV_VARS: &str = r#"
[server]
base_url = "http://${INAIRA_TEST_HOST}:8888"
"#;

    #[tokio::test]
    async fn test_toml_parsing() {
        let loader = TomlConfigLoader::new(false);
        let config = loader.load_from_string(TEST_CONFIG_TOML).await.unwrap();

        assert_eq!(config.server.base_url, "http://odin.local:8888");
        assert_eq!(config.polling.interval_ms, 1000);
        // 未指定的字段使用默认值
        assert_eq!(config.polling.timeout_ms, 2000);
        assert_eq!(config.server.api_version, "0.1");
    }

    #[tokio::test]
    #[serial]
    async fn test_env_var_substitution() {
        env::set_var("INAIRA_TEST_HOST", "10.0.0.5");

        let loader = TomlConfigLoader::new(true);
        let config = loader
            .load_from_string(TEST_CONFIG_WITH_ENV_VARS)
            .await
            .unwrap();

        assert_eq!(config.server.base_url, "http://10.0.0.5:8888");

        env::remove_var("INAIRA_TEST_HOST");
    }

    #[tokio::test]
    #[serial]
    async fn test_env_var_substitution_missing_var() {
        env::remove_var("INAIRA_TEST_HOST");

        let loader = TomlConfigLoader::new(true);
        let result = loader.load_from_string(TEST_CONFIG_WITH_ENV_VARS).await;

        assert!(result.is_err());
        if let Err(e) = result {
            assert!(e.to_string().contains("INAIRA_TEST_HOST"));
        }
    }

    #[tokio::test]
    async fn test_validation_error_is_reported() {
        let loader = TomlConfigLoader::new(false);
        let result = loader
            .load_from_string("[polling]\ninterval_ms = 0\n")
            .await;

        assert!(result.unwrap_err().to_string().contains("配置验证失败"));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(TEST_CONFIG_TOML.as_bytes()).unwrap();

        let loader = TomlConfigLoader::new(false);
        let config = loader.load_from_file(file.path()).await.unwrap();
        assert_eq!(config.server.base_url, "http://odin.local:8888");
    }

    #[tokio::test]
    async fn test_missing_file() {
        let loader = TomlConfigLoader::new(false);
        let result = loader.load_from_file("/nonexistent/inaira.toml").await;
        assert!(result.unwrap_err().to_string().contains("配置文件不存在"));

        let config = loader
            .load_or_default("/nonexistent/inaira.toml")
            .await
            .unwrap();
        assert_eq!(config, Config::default());
    }

    #[tokio::test]
    async fn test_default_template_is_valid() {
        let loader = TomlConfigLoader::new(false);
        let config = loader
            .load_from_string(DEFAULT_CONFIG_TEMPLATE)
            .await
            .unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_substitute_env_vars_disabled() {
        let loader = TomlConfigLoader::new(false);
        let content = "test ${VAR} content";
        let result = loader.substitute_env_vars(content).unwrap();
        assert_eq!(result, content);
    }

    #[test]
    fn test_load_or_default_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let loader = TomlConfigLoader::new(true);

        let config =
            tokio_test::block_on(loader.load_or_default(dir.path().join("missing.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_get_default_config_path() {
        let path = get_default_config_path();
        assert!(path.to_string_lossy().ends_with(DEFAULT_CONFIG_FILE));
    }
}
