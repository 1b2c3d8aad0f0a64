//! AI 服务边界
//!
//! 编排层只依赖这个 trait：上传文档、查询处理状态、单轮生成。
//! 生产环境使用 [`GeminiClient`](crate::clients::GeminiClient)，测试中可替换为脚本化实现。

use std::path::Path;

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::{DocumentState, JobHandle};

/// 单轮生成请求
///
/// 会话以"文档 + 指令"作为第一条用户消息，随后只发送一条 `follow_up`。
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system_instruction: Option<String>,
    pub document: JobHandle,
    pub instruction: String,
    pub follow_up: String,
}

#[async_trait]
pub trait AiService: Send + Sync {
    /// 上传本地文件，返回任务句柄
    async fn upload_document(&self, path: &Path, mime_type: &str) -> AppResult<JobHandle>;

    /// 查询文档当前的处理状态
    async fn document_state(&self, handle: &JobHandle) -> AppResult<DocumentState>;

    /// 基于已就绪的文档生成文本
    async fn generate(&self, request: &GenerationRequest) -> AppResult<String>;

    /// 模型名称（用于日志和错误信息）
    fn model_name(&self) -> &str;
}
