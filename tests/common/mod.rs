//! 测试用的 ODIN API 替身

#![allow(dead_code)]

use async_trait::async_trait;
use inaira_monitor::api::OdinApi;
use inaira_monitor::error::{ApiError, Result};
use inaira_monitor::model::{FlatConfig, Node};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// 可编排的 API 替身
///
/// 按顺序返回预先放入的快照，最后一个快照会重复返回。
#[derive(Default)]
pub struct FakeApi {
    snapshots: Mutex<Vec<Value>>,
    pub delay: Duration,
    pub fail_snapshots: AtomicBool,
    pub fail_puts: AtomicBool,
    pub calls: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub sent_configs: Mutex<Vec<FlatConfig>>,
    pub sent_config_files: Mutex<Vec<String>>,
    pub sent_changes: Mutex<Vec<String>>,
    pub sent_background: Mutex<Vec<bool>>,
}

impl FakeApi {
    pub fn with_snapshots(snapshots: Vec<Value>) -> Self {
        Self {
            snapshots: Mutex::new(snapshots),
            ..Default::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn push_snapshot(&self, snapshot: Value) {
        self.snapshots.lock().unwrap().push(snapshot);
    }

    fn next_snapshot(&self) -> Value {
        let mut snapshots = self.snapshots.lock().unwrap();
        if snapshots.len() > 1 {
            snapshots.remove(0)
        } else {
            snapshots.first().cloned().unwrap_or(Value::Null)
        }
    }

    fn put_result(&self) -> Result<()> {
        if self.fail_puts.load(Ordering::SeqCst) {
            Err(ApiError::Status {
                status: 500,
                url: "fake".to_string(),
            }
            .into())
        } else {
            Ok(())
        }
    }
}

/// 离开作用域时减少在途计数，超时取消时也会执行
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl OdinApi for FakeApi {
    async fn api_version(&self) -> Result<String> {
        Ok("0.1".to_string())
    }

    async fn adapters(&self) -> Result<Vec<String>> {
        Ok(vec!["inaira".to_string()])
    }

    async fn snapshot(&self) -> Result<Node> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if self.fail_snapshots.load(Ordering::SeqCst) {
            return Err(ApiError::Status {
                status: 502,
                url: "fake".to_string(),
            }
            .into());
        }

        Ok(Node::from(self.next_snapshot()))
    }

    async fn put_camera_config(&self, delta: &FlatConfig) -> Result<()> {
        self.sent_configs.lock().unwrap().push(delta.clone());
        self.put_result()
    }

    async fn put_config_file(&self, path: &str) -> Result<()> {
        self.sent_config_files.lock().unwrap().push(path.to_string());
        self.put_result()
    }

    async fn put_status_change(&self, change: &str) -> Result<()> {
        self.sent_changes.lock().unwrap().push(change.to_string());
        self.put_result()
    }

    async fn put_background_task(&self, enable: bool) -> Result<()> {
        self.sent_background.lock().unwrap().push(enable);
        self.put_result()
    }
}
