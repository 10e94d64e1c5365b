//! 交互会话
//!
//! 终端版的控制面板：唯一持有协调器和状态面板的任务，合并轮询结果、
//! 操作员命令和关闭信号。

use crate::api::OdinApi;
use crate::error::Result;
use crate::model::{FlatConfig, Scalar};
use crate::poll::{PollOutcome, PollScheduler, StatusBoard, StatusRenderer};
use crate::reconcile::ConfigReconciler;
use crate::trigger::{StateChange, StateChangeTrigger};
use std::io::BufRead;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

/// 会话帮助信息
pub const SESSION_HELP: &str = "\
可用命令:
  show                 显示本地配置（* 表示未发送的修改，> 表示正在编辑）
  status               显示最新的帧状态
  set <字段> <值>      修改本地配置
  focus <字段>         开始编辑字段，刷新时不覆盖
  blur                 结束编辑
  send                 发送已修改且与远端不同的字段
  reset                放弃所有修改，恢复远端值
  load <路径>          让相机控制器加载服务器上的 JSON 配置文件
  change <命令>        请求状态切换（connect/disconnect/arm/disarm/start/stop）
  background on|off    开关后台任务
  help                 显示本帮助
  quit                 退出";

/// 操作员命令
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    Show,
    Status,
    Set { field: String, value: Scalar },
    Focus(String),
    Blur,
    Send,
    Reset,
    Load(String),
    Change(StateChange),
    Background(bool),
    Help,
    Quit,
}

impl FromStr for SessionCommand {
    type Err = String;

    fn from_str(line: &str) -> std::result::Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        let command = match verb.to_lowercase().as_str() {
            "show" | "ls" => SessionCommand::Show,
            "status" => SessionCommand::Status,
            "set" => {
                let (field, value) = rest
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| "用法: set <字段> <值>".to_string())?;
                SessionCommand::Set {
                    field: field.to_string(),
                    value: Scalar::parse_input(value),
                }
            }
            "focus" if !rest.is_empty() => SessionCommand::Focus(rest.to_string()),
            "focus" => return Err("用法: focus <字段>".to_string()),
            "blur" => SessionCommand::Blur,
            "send" => SessionCommand::Send,
            "reset" => SessionCommand::Reset,
            "load" if !rest.is_empty() => SessionCommand::Load(rest.to_string()),
            "load" => return Err("用法: load <路径>".to_string()),
            "change" if !rest.is_empty() => {
                SessionCommand::Change(rest.parse().unwrap_or(StateChange::Custom(rest.to_string())))
            }
            "change" => return Err("用法: change <命令>".to_string()),
            "background" => match rest.to_lowercase().as_str() {
                "on" | "true" | "enable" => SessionCommand::Background(true),
                "off" | "false" | "disable" => SessionCommand::Background(false),
                _ => return Err("用法: background on|off".to_string()),
            },
            "help" | "?" => SessionCommand::Help,
            "quit" | "exit" | "q" => SessionCommand::Quit,
            other => return Err(format!("未知命令: {}（输入 help 查看帮助）", other)),
        };

        Ok(command)
    }
}

/// 命令执行后的去向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// 交互会话
pub struct Session {
    /// API 客户端
    api: Arc<dyn OdinApi>,
    /// 状态切换触发器
    trigger: StateChangeTrigger,
    /// 配置协调器
    reconciler: ConfigReconciler,
    /// 状态面板
    board: StatusBoard,
    /// 面板渲染器
    renderer: StatusRenderer,
    /// 快照中相机配置段的路径
    config_section: String,
    /// 上次输出时的帧号和相机状态
    last_announced: Option<(Option<u64>, Option<String>)>,
}

impl Session {
    /// 创建新的会话
    ///
    /// # 参数
    /// * `api` - API 客户端
    /// * `renderer` - 状态面板渲染器
    /// * `config_section` - 快照中相机配置段的路径，如 `camera_control/config/camera`
    pub fn new(api: Arc<dyn OdinApi>, renderer: StatusRenderer, config_section: &str) -> Self {
        Self {
            trigger: StateChangeTrigger::new(Arc::clone(&api)),
            api,
            reconciler: ConfigReconciler::new(),
            board: StatusBoard::new(),
            renderer,
            config_section: config_section.trim_matches('/').to_string(),
            last_announced: None,
        }
    }

    /// 配置协调器
    pub fn reconciler(&self) -> &ConfigReconciler {
        &self.reconciler
    }

    /// 状态面板
    pub fn board(&self) -> &StatusBoard {
        &self.board
    }

    /// 应用一次轮询结果
    ///
    /// # 返回
    /// * `Vec<String>` - 需要输出到终端的行
    pub fn apply_outcome(&mut self, outcome: PollOutcome) -> Vec<String> {
        let snapshot = match outcome {
            PollOutcome::Snapshot(snapshot) => snapshot,
            // 失败已由调度器记录，等待下一次轮询
            PollOutcome::Failed(_) | PollOutcome::TimedOut => return Vec::new(),
        };

        let mut output = Vec::new();

        if self.board.apply(&snapshot) {
            let status = self.board.current();
            let key = (status.frame_number, status.camera_state.clone());
            if self.last_announced.as_ref() != Some(&key) {
                self.last_announced = Some(key);
                output.push(self.render_status());
            }
        }

        match snapshot.section(&self.config_section) {
            Some(section) => {
                let first = !self.reconciler.is_initialized();
                let updated = self.reconciler.refresh_from_remote(section.clone());
                if first {
                    output.push(format!("已加载相机配置: {} 个字段", self.reconciler.local().len()));
                } else {
                    for name in updated {
                        if let Some(field) = self.reconciler.field(&name) {
                            output.push(format!("  {} = {}", name, field.value));
                        }
                    }
                }
            }
            None => debug!("快照中没有相机配置段: {}", self.config_section),
        }

        output
    }

    /// 执行操作员命令
    pub async fn execute(&mut self, command: SessionCommand) -> (Flow, Vec<String>) {
        let output = match command {
            SessionCommand::Show => self.describe_local(),
            SessionCommand::Status => vec![self.render_status()],
            SessionCommand::Set { field, value } => {
                let line = format!("{} = {}（未发送）", field, value);
                self.reconciler.mark_changed(&field, value);
                vec![line]
            }
            SessionCommand::Focus(field) => {
                let line = format!("正在编辑: {}", field);
                self.reconciler.set_focus(field);
                vec![line]
            }
            SessionCommand::Blur => {
                self.reconciler.clear_focus();
                vec!["结束编辑".to_string()]
            }
            SessionCommand::Send => self.send_delta().await,
            SessionCommand::Reset => {
                let restored = self.reconciler.reset_pending();
                if restored.is_empty() {
                    vec!["没有需要恢复的修改".to_string()]
                } else {
                    vec![format!("已恢复远端值: {}", restored.join(", "))]
                }
            }
            SessionCommand::Load(path) => match self.api.put_config_file(&path).await {
                Ok(()) => {
                    info!("已请求加载相机配置文件: {}", path);
                    vec![format!("已请求加载配置文件: {}", path)]
                }
                Err(e) => {
                    warn!("加载相机配置文件失败: {} ({})", path, e);
                    vec![format!("加载配置文件失败: {}", e)]
                }
            },
            SessionCommand::Change(change) => {
                // 不等待响应，按钮状态由下一次轮询刷新
                let _ = self.trigger.fire(change.clone());
                vec![format!("已请求状态切换: {}", change)]
            }
            SessionCommand::Background(enable) => {
                let _ = self.trigger.fire_background_task(enable);
                vec![format!("已请求{}后台任务", if enable { "启用" } else { "停用" })]
            }
            SessionCommand::Help => vec![SESSION_HELP.to_string()],
            SessionCommand::Quit => return (Flow::Quit, Vec::new()),
        };

        (Flow::Continue, output)
    }

    /// 发送待推送的差异
    ///
    /// 修改标记在请求发出前已被清除，失败时这些修改会丢失，这里只把丢失的
    /// 字段报告出来。
    ///
    /// 与远端相同的修改不会发送，但仍保持修改状态，刷新不再更新它们；远端
    /// 之后被改动时，下一次发送会推回旧值。这些字段会在输出中列出。
    async fn send_delta(&mut self) -> Vec<String> {
        let delta = self.reconciler.pending_delta();
        let mut output = Vec::new();

        if delta.is_empty() {
            output.push("没有需要发送的修改".to_string());
        } else {
            let summary = describe_delta(&delta);
            match self.api.put_camera_config(&delta).await {
                Ok(()) => {
                    info!("已发送相机配置: {}", summary);
                    output.push(format!("已发送: {}", summary));
                }
                Err(e) => {
                    warn!("发送相机配置失败，以下修改已丢失: {} ({})", summary, e);
                    output.push(format!("发送失败: {}（修改已丢失: {}）", e, summary));
                }
            }
        }

        let held = self.reconciler.dirty_fields().join(", ");
        if !held.is_empty() {
            warn!("以下字段与远端相同，未发送但仍标记为已修改: {}", held);
            output.push(format!("仍标记为已修改（与远端相同，reset 可放弃）: {}", held));
        }

        output
    }

    fn render_status(&self) -> String {
        match self.renderer.render(self.board.current()) {
            Ok(text) => text,
            Err(e) => {
                warn!("渲染状态面板失败: {}", e);
                format!("{:?}", self.board.current())
            }
        }
    }

    fn describe_local(&self) -> Vec<String> {
        if !self.reconciler.is_initialized() && self.reconciler.local().is_empty() {
            return vec!["尚未收到相机配置".to_string()];
        }

        let focused = self.reconciler.focused();
        self.reconciler
            .local()
            .iter()
            .map(|(name, field)| {
                let marker = match (focused == Some(name.as_str()), field.changed) {
                    (true, _) => '>',
                    (false, true) => '*',
                    (false, false) => ' ',
                };
                match self.reconciler.remote().get(name) {
                    Some(remote) if field.changed && *remote != field.value => {
                        format!("{} {} = {}（远端: {}）", marker, name, field.value, remote)
                    }
                    Some(_) if field.changed => {
                        format!("{} {} = {}（与远端相同）", marker, name, field.value)
                    }
                    _ => format!("{} {} = {}", marker, name, field.value),
                }
            })
            .collect()
    }

    /// 运行交互会话，直到 `quit`、标准输入关闭（交互模式）或关闭信号
    ///
    /// # 参数
    /// * `scheduler` - 轮询调度器
    /// * `shutdown_tx` - 关闭信号发送器
    /// * `interactive` - 是否从标准输入读取命令
    pub async fn run(
        mut self,
        scheduler: Arc<PollScheduler>,
        shutdown_tx: broadcast::Sender<()>,
        interactive: bool,
    ) -> Result<()> {
        let (outcome_tx, mut outcome_rx) = mpsc::channel(16);
        let poll_handle = Arc::clone(&scheduler).spawn(outcome_tx, shutdown_tx.subscribe());
        let mut shutdown_rx = shutdown_tx.subscribe();

        let (input_tx, mut input_rx) = mpsc::unbounded_channel();
        if interactive {
            spawn_stdin_reader(input_tx);
            println!("输入 help 查看可用命令");
        }

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                Some(outcome) = outcome_rx.recv() => {
                    for line in self.apply_outcome(outcome) {
                        println!("{line}");
                    }
                }
                line = input_rx.recv(), if interactive => match line {
                    Some(text) => {
                        if text.trim().is_empty() {
                            continue;
                        }
                        match text.parse::<SessionCommand>() {
                            Ok(command) => {
                                let (flow, output) = self.execute(command).await;
                                for line in output {
                                    println!("{line}");
                                }
                                if flow == Flow::Quit {
                                    break;
                                }
                            }
                            Err(message) => println!("{message}"),
                        }
                    }
                    None => {
                        debug!("标准输入已关闭");
                        break;
                    }
                },
                else => break,
            }
        }

        let _ = shutdown_tx.send(());
        if let Err(e) = poll_handle.await {
            warn!("轮询任务异常退出: {}", e);
        }

        let stats = scheduler.stats().await;
        info!(
            "会话结束: 轮询 {} 次, 成功 {}, 失败 {}, 超时 {}",
            stats.polls, stats.successes, stats.failures, stats.timeouts
        );

        Ok(())
    }
}

/// 在独立线程中逐行读取标准输入
///
/// 阻塞读取不占用运行时的线程，退出时也不必等待未完成的读取。
fn spawn_stdin_reader(tx: mpsc::UnboundedSender<String>) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(text) => {
                    if tx.send(text).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("读取标准输入失败: {}", e);
                    break;
                }
            }
        }
    });
}

/// `a=1, b=2` 形式的差异摘要
pub fn describe_delta(delta: &FlatConfig) -> String {
    delta
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_session_commands() {
        assert_eq!("show".parse::<SessionCommand>(), Ok(SessionCommand::Show));
        assert_eq!(
            "set frame_rate 12".parse::<SessionCommand>(),
            Ok(SessionCommand::Set {
                field: "frame_rate".to_string(),
                value: Scalar::from(12i64),
            })
        );
        assert_eq!(
            "  focus exposure_time ".parse::<SessionCommand>(),
            Ok(SessionCommand::Focus("exposure_time".to_string()))
        );
        assert_eq!(
            "change ARM".parse::<SessionCommand>(),
            Ok(SessionCommand::Change(StateChange::Arm))
        );
        assert_eq!(
            "background off".parse::<SessionCommand>(),
            Ok(SessionCommand::Background(false))
        );
        assert_eq!("q".parse::<SessionCommand>(), Ok(SessionCommand::Quit));
    }

    #[test]
    fn test_parse_errors() {
        assert!("set frame_rate".parse::<SessionCommand>().is_err());
        assert!("focus".parse::<SessionCommand>().is_err());
        assert!("background maybe".parse::<SessionCommand>().is_err());
        assert!("frobnicate".parse::<SessionCommand>()
            .unwrap_err()
            .contains("未知命令"));
    }

    #[test]
    fn test_set_keeps_text_values() {
        assert_eq!(
            "set trigger_source external sync".parse::<SessionCommand>(),
            Ok(SessionCommand::Set {
                field: "trigger_source".to_string(),
                value: Scalar::from("external sync"),
            })
        );
    }

    #[test]
    fn test_parse_load_keeps_whole_path() {
        assert_eq!(
            "load /tmp/camera config.json".parse::<SessionCommand>(),
            Ok(SessionCommand::Load("/tmp/camera config.json".to_string()))
        );
        assert!("load".parse::<SessionCommand>()
            .unwrap_err()
            .contains("load <路径>"));
    }

    #[test]
    fn test_describe_delta() {
        let delta: FlatConfig = [
            ("frame_rate".to_string(), Scalar::from(10i64)),
            ("exposure_time".to_string(), Scalar::from(0.02)),
        ]
        .into_iter()
        .collect();
        assert_eq!(describe_delta(&delta), "exposure_time=0.02, frame_rate=10");
    }
}
