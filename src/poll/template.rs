//! 状态面板模板
//!
//! 使用 Handlebars 渲染状态面板

use crate::error::{InairaError, Result};
use crate::poll::status::FrameStatus;
use handlebars::Handlebars;

const TEMPLATE_NAME: &str = "status";

/// 默认的状态面板模板
pub fn default_status_template() -> String {
    r#"[{{updated_at}}] 帧号: {{frame_number}}  处理时间: {{process_time}}
  分类: {{classification}}  置信度: {{certainty}}
  通过率: {{pass_ratio}}  平均处理时间: {{avg_processing_time}}  总帧数: {{total_frames}}
  相机: {{camera_state}}{{#if acquiring}} (采集中, {{frames_acquired}} 帧){{/if}}{{#if actions}}  可用操作: {{#each actions}}{{this}}{{#unless @last}}/{{/unless}}{{/each}}{{/if}}"#
        .to_string()
}

/// 状态面板渲染器
pub struct StatusRenderer {
    registry: Handlebars<'static>,
}

impl StatusRenderer {
    /// 创建渲染器
    ///
    /// # 参数
    /// * `template` - 自定义模板，`None` 时使用默认模板
    pub fn new(template: Option<&str>) -> Result<Self> {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);

        let source = template
            .map(str::to_string)
            .unwrap_or_else(default_status_template);
        registry
            .register_template_string(TEMPLATE_NAME, source)
            .map_err(|e| InairaError::Template(e.to_string()))?;

        Ok(Self { registry })
    }

    /// 渲染状态
    pub fn render(&self, status: &FrameStatus) -> Result<String> {
        self.registry
            .render(TEMPLATE_NAME, &status.display_context())
            .map_err(|e| InairaError::Template(e.to_string()))
    }
}
