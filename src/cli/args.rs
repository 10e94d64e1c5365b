//! 命令行参数定义
//!
//! 使用clap定义应用程序的命令行接口

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// INAIRA Monitor - ODIN INAIRA 相机控制与帧状态监控客户端
#[derive(Parser, Debug, Clone)]
#[command(
    name = "inaira-monitor",
    version = crate::VERSION,
    about = crate::APP_DESCRIPTION,
    long_about = None
)]
pub struct Args {
    /// 配置文件路径
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "配置文件路径",
        env = "INAIRA_CONFIG"
    )]
    pub config: Option<PathBuf>,

    /// 日志级别
    #[arg(
        short,
        long,
        value_enum,
        help = "日志级别（默认使用配置文件中的设置）",
        env = "INAIRA_LOG_LEVEL"
    )]
    pub log_level: Option<LogLevel>,

    /// 是否启用详细输出
    #[arg(short, long, help = "启用详细输出（status 显示完整快照）")]
    pub verbose: bool,

    /// 覆盖服务器地址
    #[arg(
        short,
        long,
        value_name = "URL",
        help = "服务器地址，覆盖配置文件中的 server.base_url",
        env = "INAIRA_BASE_URL"
    )]
    pub base_url: Option<String>,

    /// 子命令
    #[command(subcommand)]
    pub command: Commands,
}

/// 日志级别枚举
#[derive(ValueEnum, Clone, Debug, PartialEq)]
pub enum LogLevel {
    /// 跟踪级别
    Trace,
    /// 调试级别
    Debug,
    /// 信息级别
    Info,
    /// 警告级别
    Warn,
    /// 错误级别
    Error,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// 子命令定义
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// 持续轮询并进入交互会话
    Watch {
        /// 不读取标准输入，只显示状态
        #[arg(long, help = "不读取标准输入，只显示状态")]
        no_input: bool,

        /// 轮询间隔（毫秒）
        #[arg(
            short,
            long,
            value_name = "MILLIS",
            help = "轮询间隔（毫秒），覆盖 polling.interval_ms"
        )]
        interval: Option<u64>,
    },

    /// 获取一次快照并显示帧状态
    Status {
        /// 输出格式
        #[arg(short, long, value_enum, default_value = "text", help = "输出格式")]
        format: OutputFormat,
    },

    /// 列出服务器上已加载的适配器
    Adapters,

    /// 查看或修改相机配置
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// 请求相机状态切换
    Change {
        /// 切换命令（connect/disconnect/arm/disarm/start/stop）
        #[arg(value_name = "CHANGE", help = "切换命令")]
        change: String,
    },

    /// 开关 workshop 后台任务
    BackgroundTask {
        /// 目标状态
        #[arg(value_enum, value_name = "STATE", help = "目标状态")]
        state: Toggle,
    },

    /// 初始化配置文件
    Init {
        /// 配置文件路径
        #[arg(
            value_name = "FILE",
            help = "配置文件路径",
            default_value = crate::config::loader::DEFAULT_CONFIG_FILE
        )]
        config_path: PathBuf,

        /// 是否覆盖现有文件
        #[arg(short, long, help = "覆盖现有文件")]
        force: bool,
    },

    /// 验证配置文件
    Validate {
        /// 配置文件路径
        #[arg(value_name = "FILE", help = "配置文件路径")]
        config_path: Option<PathBuf>,

        /// 是否显示详细信息
        #[arg(short, long, help = "显示详细信息")]
        verbose: bool,
    },

    /// 显示版本信息
    Version {
        /// 输出格式
        #[arg(short, long, value_enum, default_value = "text", help = "输出格式")]
        format: OutputFormat,
    },
}

/// 相机配置子命令
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// 显示展平后的相机配置
    Show {
        /// 输出格式
        #[arg(short, long, value_enum, default_value = "text", help = "输出格式")]
        format: OutputFormat,
    },

    /// 修改相机配置字段并推送差异
    Set {
        /// `字段=值` 形式的赋值
        #[arg(value_name = "FIELD=VALUE", required = true, help = "字段=值")]
        assignments: Vec<String>,
    },

    /// 让相机控制器加载服务器上的 JSON 配置文件
    Load {
        /// 服务器上的文件路径
        #[arg(value_name = "PATH", help = "服务器上的 JSON 配置文件路径")]
        path: String,
    },
}

/// 输出格式枚举
#[derive(ValueEnum, Clone, Debug, PartialEq)]
pub enum OutputFormat {
    /// 文本格式
    Text,
    /// JSON格式
    Json,
}

/// 开关
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    pub fn enabled(self) -> bool {
        matches!(self, Toggle::On)
    }
}

impl Args {
    /// 获取配置文件路径
    pub fn get_config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(crate::config::get_default_config_path)
    }

    /// 是否启用详细输出
    pub fn is_verbose(&self) -> bool {
        self.verbose || matches!(self.log_level, Some(LogLevel::Debug) | Some(LogLevel::Trace))
    }
}

/// 解析 `字段=值` 形式的赋值
pub fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((field, value)) if !field.trim().is_empty() => {
            Ok((field.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("无效的赋值: {}（应为 字段=值）", raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_watch() {
        let args = Args::try_parse_from(["inaira-monitor", "watch", "--no-input", "-i", "250"])
            .unwrap();
        match args.command {
            Commands::Watch { no_input, interval } => {
                assert!(no_input);
                assert_eq!(interval, Some(250));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_config_set() {
        let args = Args::try_parse_from([
            "inaira-monitor",
            "--base-url",
            "http://odin:8888",
            "config",
            "set",
            "frame_rate=10",
            "exposure_time=0.02",
        ])
        .unwrap();

        assert_eq!(args.base_url.as_deref(), Some("http://odin:8888"));
        match args.command {
            Commands::Config {
                action: ConfigAction::Set { assignments },
            } => assert_eq!(assignments, vec!["frame_rate=10", "exposure_time=0.02"]),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_config_set_requires_assignment() {
        assert!(Args::try_parse_from(["inaira-monitor", "config", "set"]).is_err());
    }

    #[test]
    fn test_background_toggle() {
        let args =
            Args::try_parse_from(["inaira-monitor", "background-task", "on"]).unwrap();
        match args.command {
            Commands::BackgroundTask { state } => assert!(state.enabled()),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("frame_rate = 10").unwrap(),
            ("frame_rate".to_string(), "10".to_string())
        );
        assert_eq!(
            parse_assignment("note=a=b").unwrap(),
            ("note".to_string(), "a=b".to_string())
        );
        assert!(parse_assignment("frame_rate").is_err());
        assert!(parse_assignment("=10").is_err());
    }

    #[test]
    fn test_parse_config_load() {
        let args = Args::try_parse_from([
            "inaira-monitor",
            "config",
            "load",
            "/opt/inaira/pco_edge.json",
        ])
        .unwrap();
        match args.command {
            Commands::Config {
                action: ConfigAction::Load { path },
            } => assert_eq!(path, "/opt/inaira/pco_edge.json"),
            other => panic!("unexpected command: {other:?}"),
        }

        assert!(Args::try_parse_from(["inaira-monitor", "config", "load"]).is_err());
    }

    #[test]
    fn test_verbose_flag() {
        let args = Args::try_parse_from(["inaira-monitor", "status"]).unwrap();
        assert!(!args.is_verbose());

        let args = Args::try_parse_from(["inaira-monitor", "-v", "status"]).unwrap();
        assert!(args.is_verbose());

        let args =
            Args::try_parse_from(["inaira-monitor", "--log-level", "debug", "status"]).unwrap();
        assert!(args.is_verbose());
    }

    #[test]
    fn test_explicit_config_path() {
        let args =
            Args::try_parse_from(["inaira-monitor", "-c", "/tmp/x.toml", "adapters"]).unwrap();
        assert_eq!(args.get_config_path(), PathBuf::from("/tmp/x.toml"));
    }
}
