//! 轮询调度器模块
//!
//! 每次只发出一个轮询请求，上一次请求返回（或超时）之后才安排下一次，
//! 因此不会出现重叠的请求。

use crate::api::OdinApi;
use crate::config::PollingConfig;
use crate::model::Node;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

/// 单次轮询的结果
#[derive(Debug, Clone)]
pub enum PollOutcome {
    /// 成功获取快照
    Snapshot(Node),
    /// 请求失败
    Failed(String),
    /// 超过轮询超时
    TimedOut,
}

/// 轮询统计
#[derive(Debug, Clone, Default)]
pub struct PollStats {
    /// 已完成的轮询次数
    pub polls: u64,
    /// 成功次数
    pub successes: u64,
    /// 失败次数
    pub failures: u64,
    /// 超时次数
    pub timeouts: u64,
    /// 最后成功时间
    pub last_success: Option<DateTime<Utc>>,
}

/// 轮询调度器
pub struct PollScheduler {
    /// API 客户端
    api: Arc<dyn OdinApi>,
    /// 两次轮询之间的间隔
    interval: Duration,
    /// 单次轮询超时
    poll_timeout: Duration,
    /// 统计信息
    stats: Arc<RwLock<PollStats>>,
}

impl PollScheduler {
    /// 创建新的轮询调度器
    pub fn new(api: Arc<dyn OdinApi>, config: &PollingConfig) -> Self {
        Self {
            api,
            interval: config.interval(),
            poll_timeout: config.timeout(),
            stats: Arc::new(RwLock::new(PollStats::default())),
        }
    }

    /// 执行一次轮询
    pub async fn poll_once(&self) -> PollOutcome {
        let outcome = match timeout(self.poll_timeout, self.api.snapshot()).await {
            Ok(Ok(snapshot)) => PollOutcome::Snapshot(snapshot),
            Ok(Err(e)) => PollOutcome::Failed(e.to_string()),
            Err(_) => PollOutcome::TimedOut,
        };

        let mut stats = self.stats.write().await;
        stats.polls += 1;
        match &outcome {
            PollOutcome::Snapshot(_) => {
                stats.successes += 1;
                stats.last_success = Some(Utc::now());
            }
            PollOutcome::Failed(e) => {
                stats.failures += 1;
                warn!("轮询失败: {}", e);
            }
            PollOutcome::TimedOut => {
                stats.timeouts += 1;
                warn!("轮询超时 ({}ms)", self.poll_timeout.as_millis());
            }
        }

        outcome
    }

    /// 运行轮询循环，直到收到关闭信号或接收端关闭
    ///
    /// # 参数
    /// * `sink` - 轮询结果的接收端
    /// * `shutdown` - 关闭信号
    pub async fn run(
        &self,
        sink: mpsc::Sender<PollOutcome>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        info!(
            "启动轮询: 间隔 {}ms, 超时 {}ms",
            self.interval.as_millis(),
            self.poll_timeout.as_millis()
        );

        loop {
            let outcome = tokio::select! {
                _ = shutdown.recv() => break,
                outcome = self.poll_once() => outcome,
            };

            if sink.send(outcome).await.is_err() {
                debug!("轮询结果接收端已关闭");
                break;
            }

            tokio::select! {
                _ = shutdown.recv() => break,
                _ = sleep(self.interval) => {}
            }
        }

        info!("轮询已停止");
    }

    /// 在后台任务中运行轮询循环
    pub fn spawn(
        self: Arc<Self>,
        sink: mpsc::Sender<PollOutcome>,
        shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(sink, shutdown).await })
    }

    /// 获取统计信息
    pub async fn stats(&self) -> PollStats {
        self.stats.read().await.clone()
    }
}
