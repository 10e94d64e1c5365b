//! 命令处理逻辑
//!
//! 实现各种CLI命令的处理逻辑

use crate::api::{HttpOdinClient, OdinApi};
use crate::cli::args::{parse_assignment, Args, Commands, ConfigAction, OutputFormat};
use crate::config::loader::DEFAULT_CONFIG_TEMPLATE;
use crate::config::{validate_config, Config, ConfigLoader, TomlConfigLoader};
use crate::core::Session;
use crate::error::{ConfigError, InairaError, Result};
use crate::model::{flatten, FlatConfig, Node, Scalar};
use crate::poll::{FrameStatus, PollScheduler, StatusRenderer};
use crate::reconcile::ConfigReconciler;
use crate::trigger::{StateChange, StateChangeTrigger};
use async_trait::async_trait;
use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// 命令处理器trait
#[async_trait]
pub trait Command: Send + Sync {
    /// 执行命令
    async fn execute(&self, args: &Args) -> Result<()>;
}

/// 加载配置并应用命令行覆盖
pub async fn load_config(args: &Args) -> Result<Config> {
    let loader = TomlConfigLoader::new(true);
    let mut config = loader.load_or_default(args.get_config_path()).await?;

    if let Some(base_url) = &args.base_url {
        config.server.base_url = base_url.clone();
    }

    validate_config(&config).map_err(ConfigError::ValidationError)?;
    Ok(config)
}

/// 创建客户端并查询 API 版本
///
/// 版本查询失败时继续使用配置中的版本。
pub async fn connect(config: &Config) -> Result<Arc<HttpOdinClient>> {
    let client = HttpOdinClient::new(&config.server, &config.endpoints)?;

    match client.api_version().await {
        Ok(version) => info!("已连接 {}，API版本 {}", config.server.base_url, version),
        Err(e) => warn!(
            "查询API版本失败，使用配置的版本 {}: {}",
            config.server.api_version, e
        ),
    }

    Ok(Arc::new(client))
}

/// 取出快照中的相机配置段
fn camera_section<'a>(snapshot: &'a Node, config: &Config) -> Result<&'a Node> {
    let path = config.endpoints.camera_config.trim_matches('/');
    snapshot.section(path).ok_or_else(|| {
        InairaError::Other(anyhow::anyhow!("快照中没有相机配置段: {}", path))
    })
}

/// 持续监控命令
pub struct WatchCommand;

#[async_trait]
impl Command for WatchCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Watch { no_input, interval } = &args.command {
            let mut config = load_config(args).await?;
            if let Some(interval_ms) = interval {
                config.polling.interval_ms = *interval_ms;
                validate_config(&config).map_err(ConfigError::ValidationError)?;
            }

            let interactive = input_enabled(*no_input, std::io::stdin().is_terminal());
            self.watch(&config, interactive).await
        } else {
            Ok(())
        }
    }
}

/// 是否从标准输入读取会话命令
///
/// 只有 `--no-input` 关闭输入；标准输入不是终端时按行读取管道中的命令。
fn input_enabled(no_input: bool, stdin_is_terminal: bool) -> bool {
    if no_input {
        return false;
    }
    if !stdin_is_terminal {
        info!("标准输入不是终端，按行读取命令直到输入结束");
    }
    true
}

impl WatchCommand {
    async fn watch(&self, config: &Config, interactive: bool) -> Result<()> {
        let client = connect(config).await?;
        let api: Arc<dyn OdinApi> = client;

        let renderer = StatusRenderer::new(config.display.template.as_deref())?;
        let scheduler = Arc::new(PollScheduler::new(Arc::clone(&api), &config.polling));
        let session = Session::new(api, renderer, &config.endpoints.camera_config);

        let (shutdown_tx, _) = broadcast::channel(1);

        // 设置Ctrl+C信号处理
        let shutdown_tx_clone = shutdown_tx.clone();
        tokio::spawn(async move {
            match signal::ctrl_c().await {
                Ok(()) => {
                    info!("收到中断信号，正在停止...");
                    let _ = shutdown_tx_clone.send(());
                }
                Err(err) => {
                    error!("监听中断信号失败: {}", err);
                }
            }
        });

        session.run(scheduler, shutdown_tx, interactive).await
    }
}

/// 状态命令
pub struct StatusCommand;

#[async_trait]
impl Command for StatusCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Status { format } = &args.command {
            let config = load_config(args).await?;
            let client = connect(&config).await?;

            let (snapshot, adapters) =
                futures::future::join(client.snapshot(), client.adapters()).await;
            let snapshot = snapshot?;
            let adapters = adapters.unwrap_or_else(|e| {
                warn!("获取适配器列表失败: {}", e);
                Vec::new()
            });

            let status = FrameStatus::from_snapshot(&snapshot);
            let full = args.is_verbose().then(|| flatten(&snapshot));
            self.display_status(&config, status.as_ref(), &adapters, full.as_ref(), format)
        } else {
            Ok(())
        }
    }
}

impl StatusCommand {
    fn display_status(
        &self,
        config: &Config,
        status: Option<&FrameStatus>,
        adapters: &[String],
        full: Option<&FlatConfig>,
        format: &OutputFormat,
    ) -> Result<()> {
        match format {
            OutputFormat::Json => {
                let report = status_report(config, status, adapters, full);
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            OutputFormat::Text => {
                println!("服务器: {}", config.server.base_url);
                if !adapters.is_empty() {
                    println!("适配器: {}", adapters.join(", "));
                }
                match status {
                    Some(status) => {
                        let renderer = StatusRenderer::new(config.display.template.as_deref())?;
                        println!("{}", renderer.render(status)?);
                    }
                    None => println!("快照中没有有效的帧数据"),
                }
                if let Some(full) = full {
                    println!("完整快照:");
                    for (name, value) in full {
                        println!("  {} = {}", name, value);
                    }
                }
            }
        }
        Ok(())
    }
}

/// `status --format json` 的输出；详细模式下附带展平后的完整快照
fn status_report(
    config: &Config,
    status: Option<&FrameStatus>,
    adapters: &[String],
    full: Option<&FlatConfig>,
) -> serde_json::Value {
    let mut report = serde_json::json!({
        "server": config.server.base_url,
        "adapters": adapters,
        "status": status,
    });
    if let (Some(full), Some(map)) = (full, report.as_object_mut()) {
        map.insert("snapshot".to_string(), full.to_json());
    }
    report
}

/// 适配器列表命令
pub struct AdaptersCommand;

#[async_trait]
impl Command for AdaptersCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        let config = load_config(args).await?;
        let client = connect(&config).await?;

        for adapter in client.adapters().await? {
            let marker = if adapter == config.server.adapter { "*" } else { " " };
            println!("{} {}", marker, adapter);
        }
        Ok(())
    }
}

/// 相机配置命令
pub struct ConfigCommand;

#[async_trait]
impl Command for ConfigCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Config { action } = &args.command {
            let config = load_config(args).await?;
            let client = connect(&config).await?;

            match action {
                ConfigAction::Load { path } => {
                    client.put_config_file(path).await?;
                    println!("已请求加载配置文件: {}", path);
                    Ok(())
                }
                ConfigAction::Show { format } => {
                    let snapshot = client.snapshot().await?;
                    let section = camera_section(&snapshot, &config)?;
                    if args.is_verbose() && *format == OutputFormat::Text {
                        println!("# 相机配置段: {}", config.endpoints.camera_config);
                    }
                    self.show(&flatten(section), format)
                }
                ConfigAction::Set { assignments } => {
                    let snapshot = client.snapshot().await?;
                    let section = camera_section(&snapshot, &config)?;
                    let delta = build_delta(section, assignments)?;
                    if delta.is_empty() {
                        println!("没有需要发送的修改");
                        return Ok(());
                    }
                    client.put_camera_config(&delta).await?;
                    for (name, value) in &delta {
                        println!("{} = {}", name, value);
                    }
                    info!("已发送 {} 个字段", delta.len());
                    Ok(())
                }
            }
        } else {
            Ok(())
        }
    }
}

impl ConfigCommand {
    fn show(&self, flat: &FlatConfig, format: &OutputFormat) -> Result<()> {
        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&flat.to_json())?),
            OutputFormat::Text => {
                for (name, value) in flat {
                    println!("{} = {}", name, value);
                }
            }
        }
        Ok(())
    }
}

/// 把 `字段=值` 赋值应用到远端配置，得到需要推送的差异
///
/// 与远端相同的值不会被发送。
pub fn build_delta(section: &Node, assignments: &[String]) -> Result<FlatConfig> {
    let mut reconciler = ConfigReconciler::new();
    reconciler.refresh_from_remote(section.clone());

    for raw in assignments {
        let (field, value) =
            parse_assignment(raw).map_err(|e| InairaError::Other(anyhow::anyhow!(e)))?;
        if reconciler.field(&field).is_none() {
            warn!("远端配置中没有字段 {}，仍然发送", field);
        }
        reconciler.mark_changed(&field, Scalar::parse_input(&value));
    }

    Ok(reconciler.pending_delta())
}

/// 状态切换命令
pub struct ChangeCommand;

#[async_trait]
impl Command for ChangeCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Change { change } = &args.command {
            let config = load_config(args).await?;
            let client = connect(&config).await?;
            let trigger = StateChangeTrigger::new(client);

            let change: StateChange = match change.parse() {
                Ok(change) => change,
                Err(never) => match never {},
            };
            let sent = trigger
                .fire(change.clone())
                .await
                .map_err(|e| InairaError::Other(e.into()))?;

            if sent {
                println!("已请求状态切换: {}", change);
                Ok(())
            } else {
                Err(InairaError::Other(anyhow::anyhow!("状态切换失败: {}", change)))
            }
        } else {
            Ok(())
        }
    }
}

/// 后台任务开关命令
pub struct BackgroundTaskCommand;

#[async_trait]
impl Command for BackgroundTaskCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::BackgroundTask { state } = &args.command {
            let config = load_config(args).await?;
            let client = connect(&config).await?;
            let trigger = StateChangeTrigger::new(client);

            let sent = trigger
                .fire_background_task(state.enabled())
                .await
                .map_err(|e| InairaError::Other(e.into()))?;

            if sent {
                println!("后台任务已{}", if state.enabled() { "启用" } else { "停用" });
                Ok(())
            } else {
                Err(InairaError::Other(anyhow::anyhow!("后台任务切换失败")))
            }
        } else {
            Ok(())
        }
    }
}

/// 版本命令
pub struct VersionCommand;

#[async_trait]
impl Command for VersionCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Version { format } = &args.command {
            match format {
                OutputFormat::Json => {
                    let version_info = serde_json::json!({
                        "name": crate::APP_NAME,
                        "version": crate::VERSION,
                        "description": crate::APP_DESCRIPTION
                    });
                    println!("{}", serde_json::to_string_pretty(&version_info)?);
                }
                OutputFormat::Text => {
                    println!("{} v{}", crate::APP_NAME, crate::VERSION);
                    println!("{}", crate::APP_DESCRIPTION);
                }
            }
        }
        Ok(())
    }
}

/// 初始化命令
pub struct InitCommand;

#[async_trait]
impl Command for InitCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Init { config_path, force } = &args.command {
            self.create_config_file(config_path, *force).await
        } else {
            Ok(())
        }
    }
}

impl InitCommand {
    /// 创建配置文件
    async fn create_config_file(&self, config_path: &Path, force: bool) -> Result<()> {
        // 检查文件是否已存在
        if config_path.exists() && !force {
            eprintln!("配置文件已存在: {}", config_path.display());
            eprintln!("使用 --force 参数覆盖现有文件");
            return Ok(());
        }

        if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(config_path, DEFAULT_CONFIG_TEMPLATE).await?;

        println!("配置文件已创建: {}", config_path.display());
        println!("请编辑 server.base_url 指向 ODIN 服务器");

        Ok(())
    }
}

/// 验证命令
pub struct ValidateCommand;

#[async_trait]
impl Command for ValidateCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Validate {
            config_path,
            verbose,
        } = &args.command
        {
            let config_file = config_path
                .clone()
                .unwrap_or_else(|| args.get_config_path());

            self.validate_config_file(&config_file, *verbose).await
        } else {
            Ok(())
        }
    }
}

impl ValidateCommand {
    /// 验证配置文件
    async fn validate_config_file(&self, config_path: &Path, verbose: bool) -> Result<()> {
        println!("验证配置文件: {}", config_path.display());

        let loader = TomlConfigLoader::new(true);
        let config = loader.load_from_file(config_path).await?;

        println!("配置验证通过！");
        if verbose {
            println!("服务器:");
            println!("  地址: {}", config.server.base_url);
            println!("  API版本: {}", config.server.api_version);
            println!("  适配器: {}", config.server.adapter);
            println!("  请求超时: {}ms", config.server.request_timeout_ms);
            println!("端点:");
            println!("  相机配置: {}", config.endpoints.camera_config);
            println!("  状态切换: {}", config.endpoints.status_change);
            println!("  后台任务: {}", config.endpoints.background_task);
            println!("  配置文件: {}", config.endpoints.config_file);
            println!("轮询:");
            println!("  间隔: {}ms", config.polling.interval_ms);
            println!("  超时: {}ms", config.polling.timeout_ms);
            println!("显示:");
            println!("  日志级别: {}", config.display.log_level);
            println!("  日志格式: {}", config.display.log_format);
            if let Some(log_file) = &config.display.log_file {
                println!("  日志文件: {}", log_file.display());
            }
            println!(
                "  模板: {}",
                if config.display.template.is_some() { "自定义" } else { "默认" }
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn section() -> Node {
        Node::from(json!({
            "acquisition": {"frame_rate": 12, "exposure_time": 0.02},
            "trigger": {"mode": "internal"}
        }))
    }

    #[test]
    fn test_build_delta_skips_unchanged_values() {
        let delta = build_delta(
            &section(),
            &["frame_rate=10".to_string(), "mode=internal".to_string()],
        )
        .unwrap();

        assert_eq!(delta.len(), 1);
        assert_eq!(delta.get("frame_rate"), Some(&Scalar::from(10i64)));
    }

    #[test]
    fn test_build_delta_parses_text_and_numbers() {
        let delta = build_delta(
            &section(),
            &["mode=external".to_string(), "exposure_time=0.5".to_string()],
        )
        .unwrap();

        assert_eq!(delta.get("mode"), Some(&Scalar::from("external")));
        assert_eq!(delta.get("exposure_time"), Some(&Scalar::from(0.5)));
    }

    #[test]
    fn test_build_delta_rejects_bad_assignment() {
        assert!(build_delta(&section(), &["frame_rate".to_string()]).is_err());
    }

    #[test]
    fn test_camera_section_lookup() {
        let snapshot = Node::from(json!({
            "odin_inaira": {"camera_control": {"config": {"camera": {"frame_rate": 1}}}}
        }));
        let config = Config::default();
        assert!(camera_section(&snapshot, &config).is_ok());
        assert!(camera_section(&Node::from(json!({})), &config).is_err());
    }

    #[test]
    fn test_piped_stdin_still_reads_commands() {
        assert!(input_enabled(false, true));
        assert!(input_enabled(false, false));
        assert!(!input_enabled(true, true));
        assert!(!input_enabled(true, false));
    }

    #[test]
    fn test_status_report_includes_snapshot_when_verbose() {
        let config = Config::default();
        let snapshot = Node::from(json!({
            "frame": {"frame_number": 3},
            "camera_control": {"config": {"camera": {"frame_rate": 12}}}
        }));
        let full = flatten(&snapshot);

        let report = status_report(&config, None, &["inaira".to_string()], Some(&full));
        assert_eq!(report["snapshot"]["frame_number"], json!(3));
        assert_eq!(report["snapshot"]["frame_rate"], json!(12));
        assert_eq!(report["adapters"], json!(["inaira"]));

        let report = status_report(&config, None, &[], None);
        assert!(report.get("snapshot").is_none());
    }

    #[tokio::test]
    async fn test_init_writes_default_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("inaira.toml");

        InitCommand.create_config_file(&path, false).await.unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, DEFAULT_CONFIG_TEMPLATE);

        std::fs::write(&path, "custom").unwrap();
        InitCommand.create_config_file(&path, false).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "custom");
    }
}
