//! 应用程序核心逻辑
//!
//! 包含主函数和命令分发

use crate::cli::args::{Args, Commands};
use crate::cli::commands::{
    AdaptersCommand, BackgroundTaskCommand, ChangeCommand, Command, ConfigCommand, InitCommand,
    StatusCommand, ValidateCommand, VersionCommand, WatchCommand,
};
use crate::config::{ConfigLoader, DisplayConfig, TomlConfigLoader};
use crate::logging::{LogConfig, LoggingSystem};
use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, error};

/// 应用程序主函数
pub async fn main() -> Result<()> {
    // 解析命令行参数
    let args = Args::parse();

    // 初始化日志系统
    let log_config = resolve_log_config(&args).await;

    let _logging_system = LoggingSystem::setup_logging(log_config).context("初始化日志系统失败")?;

    debug!("{} v{} 启动", crate::APP_NAME, crate::VERSION);

    // 执行命令
    if let Err(e) = execute_command(&args).await {
        error!("命令执行失败: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// 确定日志配置
///
/// 级别以命令行/环境变量优先，其次是配置文件；格式和日志文件来自配置文件。
async fn resolve_log_config(args: &Args) -> LogConfig {
    let config_path = args.get_config_path();

    // 日志系统尚未初始化，配置错误留给命令本身报告
    let display = if config_path.exists() {
        TomlConfigLoader::new(true)
            .load_from_file(&config_path)
            .await
            .ok()
            .map(|config| config.display)
    } else {
        None
    };

    let cli_level = args.log_level.clone().map(log::LevelFilter::from);
    log_config_from(cli_level, display.as_ref())
}

/// 由命令行级别和配置文件的显示配置组合出日志配置
///
/// 设置了日志文件时只写入文件，不再输出到终端。
fn log_config_from(
    cli_level: Option<log::LevelFilter>,
    display: Option<&DisplayConfig>,
) -> LogConfig {
    let level = cli_level
        .or_else(|| display.and_then(|d| d.log_level.parse().ok()))
        .unwrap_or(log::LevelFilter::Info);
    let file_path = display.and_then(|d| d.log_file.clone());

    LogConfig {
        level,
        console: file_path.is_none(),
        json_format: display.is_some_and(DisplayConfig::json_logs),
        file_path,
        ..Default::default()
    }
}

/// 执行CLI命令
pub async fn execute_command(args: &Args) -> Result<()> {
    let command: Box<dyn Command> = match &args.command {
        Commands::Watch { .. } => Box::new(WatchCommand),
        Commands::Status { .. } => Box::new(StatusCommand),
        Commands::Adapters => Box::new(AdaptersCommand),
        Commands::Config { .. } => Box::new(ConfigCommand),
        Commands::Change { .. } => Box::new(ChangeCommand),
        Commands::BackgroundTask { .. } => Box::new(BackgroundTaskCommand),
        Commands::Init { .. } => Box::new(InitCommand),
        Commands::Validate { .. } => Box::new(ValidateCommand),
        Commands::Version { .. } => Box::new(VersionCommand),
    };

    command
        .execute(args)
        .await
        .with_context(|| format!("执行 {} 命令失败", command_name(&args.command)))
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Watch { .. } => "watch",
        Commands::Status { .. } => "status",
        Commands::Adapters => "adapters",
        Commands::Config { .. } => "config",
        Commands::Change { .. } => "change",
        Commands::BackgroundTask { .. } => "background-task",
        Commands::Init { .. } => "init",
        Commands::Validate { .. } => "validate",
        Commands::Version { .. } => "version",
    }
}
