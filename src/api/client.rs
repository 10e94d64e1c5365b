//! ODIN HTTP API 客户端
//!
//! 封装 INAIRA 控制服务器的 JSON 端点

use crate::config::{EndpointConfig, ServerConfig};
use crate::error::{ApiError, Result};
use crate::model::{FlatConfig, Node};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderValue};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// ODIN API 访问接口
#[async_trait]
pub trait OdinApi: Send + Sync {
    /// 查询服务器 API 版本，并在后续请求中使用它
    async fn api_version(&self) -> Result<String>;

    /// 查询已加载的适配器列表
    async fn adapters(&self) -> Result<Vec<String>>;

    /// 获取适配器的完整参数快照
    async fn snapshot(&self) -> Result<Node>;

    /// 推送相机配置差异
    ///
    /// # 参数
    /// * `delta` - 只包含需要修改的字段的单层对象
    async fn put_camera_config(&self, delta: &FlatConfig) -> Result<()>;

    /// 让相机控制器加载服务器端的 JSON 配置文件
    async fn put_config_file(&self, path: &str) -> Result<()>;

    /// 请求仪器状态切换
    async fn put_status_change(&self, change: &str) -> Result<()>;

    /// 开关 workshop 后台任务
    async fn put_background_task(&self, enable: bool) -> Result<()>;
}

/// 基于 reqwest 的 ODIN API 客户端
pub struct HttpOdinClient {
    /// HTTP客户端
    client: Client,
    /// 服务器根地址，不带末尾斜杠
    base_url: String,
    /// 适配器名称
    adapter: String,
    /// 端点路径
    endpoints: EndpointConfig,
    /// 当前使用的 API 版本
    version: RwLock<String>,
}

impl HttpOdinClient {
    /// 创建新的客户端
    ///
    /// # 参数
    /// * `server` - 服务器配置
    /// * `endpoints` - 端点路径配置
    pub fn new(server: &ServerConfig, endpoints: &EndpointConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(server.request_timeout())
            .user_agent(format!("{}/{}", crate::APP_NAME, crate::VERSION))
            .build()
            .map_err(ApiError::RequestError)?;

        Ok(Self {
            client,
            base_url: server.base_url.trim_end_matches('/').to_string(),
            adapter: server.adapter.trim_matches('/').to_string(),
            endpoints: endpoints.clone(),
            version: RwLock::new(server.api_version.clone()),
        })
    }

    /// 当前使用的 API 版本
    pub async fn current_version(&self) -> String {
        self.version.read().await.clone()
    }

    /// 拼接 `/api/{version}/` 下的地址
    async fn versioned_url(&self, path: &str) -> String {
        let version = self.version.read().await;
        format!(
            "{}/api/{}/{}",
            self.base_url,
            version,
            path.trim_start_matches('/')
        )
    }

    /// 拼接适配器下的地址
    async fn adapter_url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            self.versioned_url(&format!("{}/", self.adapter)).await
        } else {
            self.versioned_url(&format!("{}/{}", self.adapter, path)).await
        }
    }

    /// 发送请求并检查状态码
    async fn send(&self, request: RequestBuilder, url: &str) -> Result<Response> {
        let response = request
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .send()
            .await
            .map_err(|e| Self::map_request_error(e, url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            }
            .into());
        }

        Ok(response)
    }

    async fn get_json(&self, url: &str) -> Result<Value> {
        debug!("GET {}", url);
        let response = self.send(self.client.get(url), url).await?;
        let body = response
            .json::<Value>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(body)
    }

    async fn put_json(&self, url: &str, body: &Value) -> Result<()> {
        debug!("PUT {} {}", url, body);
        self.send(self.client.put(url).json(body), url).await?;
        Ok(())
    }

    fn map_request_error(error: reqwest::Error, url: &str) -> ApiError {
        if error.is_timeout() {
            ApiError::Timeout {
                url: url.to_string(),
            }
        } else {
            ApiError::RequestError(error)
        }
    }
}

/// 把 `/api` 响应中的版本值转换为路径片段
///
/// 服务器可能把版本作为字符串或数字返回。
fn version_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait]
impl OdinApi for HttpOdinClient {
    async fn api_version(&self) -> Result<String> {
        let url = format!("{}/api", self.base_url);
        let body = self.get_json(&url).await?;

        let version = body
            .get("api")
            .and_then(version_from_value)
            .ok_or_else(|| ApiError::MissingField {
                field: "api".to_string(),
            })?;

        let mut current = self.version.write().await;
        if *current != version {
            info!("API版本: {} -> {}", current, version);
            *current = version.clone();
        }

        Ok(version)
    }

    async fn adapters(&self) -> Result<Vec<String>> {
        let url = self.versioned_url("adapters/").await;
        let body = self.get_json(&url).await?;

        let adapters = body
            .get("adapters")
            .and_then(Value::as_array)
            .ok_or_else(|| ApiError::MissingField {
                field: "adapters".to_string(),
            })?;

        Ok(adapters
            .iter()
            .filter_map(|a| a.as_str().map(str::to_string))
            .collect())
    }

    async fn snapshot(&self) -> Result<Node> {
        let url = self.adapter_url("").await;
        let body = self.get_json(&url).await?;
        Ok(Node::from(body))
    }

    async fn put_camera_config(&self, delta: &FlatConfig) -> Result<()> {
        let url = self.adapter_url(&self.endpoints.camera_config).await;
        self.put_json(&url, &delta.to_json()).await
    }

    async fn put_config_file(&self, path: &str) -> Result<()> {
        let url = self.adapter_url(&self.endpoints.config_file).await;
        self.put_json(&url, &json!({ "config_file": path })).await
    }

    async fn put_status_change(&self, change: &str) -> Result<()> {
        let url = self.adapter_url(&self.endpoints.status_change).await;
        self.put_json(&url, &json!({ "change": change })).await
    }

    async fn put_background_task(&self, enable: bool) -> Result<()> {
        let url = self.versioned_url(&self.endpoints.background_task).await;
        self.put_json(&url, &json!({ "enable": enable })).await
    }
}
