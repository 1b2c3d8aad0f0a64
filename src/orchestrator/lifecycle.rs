//! 生命周期编排器 - 编排层
//!
//! ## 职责
//!
//! 对界面层暴露全部操作，是唯一同时认识存储、轮询和会话的模块。
//!
//! ## 核心功能
//!
//! 1. **初始化**：校验配置、打开存储、创建 AI 客户端
//! 2. **导入作业说明**：委托 `BriefFlow`
//! 3. **提交并评估**：委托 `SubmissionFlow`
//! 4. **查询**：列出项目、读取项目
//! 5. **重置**：重置调用方持有的 `Session`，不删除任何记录

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::clients::{AiService, GeminiClient};
use crate::config::Config;
use crate::error::AppResult;
use crate::models::{ProgressReporter, ProjectRecord};
use crate::orchestrator::session::Session;
use crate::services::{JobPoller, PromptSession, RecordStore};
use crate::utils::logging::log_startup;
use crate::workflow::{BriefFlow, FlowCtx, SubmissionFlow, SubmissionResult};

/// 生命周期编排器
pub struct Orchestrator {
    store: Arc<RecordStore>,
    brief_flow: BriefFlow,
    submission_flow: SubmissionFlow,
    progress: ProgressReporter,
}

impl Orchestrator {
    /// 使用 Gemini 客户端初始化
    pub fn initialize(config: &Config) -> AppResult<Self> {
        config.validate()?;
        log_startup(config);

        let service: Arc<dyn AiService> = Arc::new(GeminiClient::new(config)?);
        Self::with_service(config, service)
    }

    /// 使用任意 AI 服务实现初始化
    pub fn with_service(config: &Config, service: Arc<dyn AiService>) -> AppResult<Self> {
        let store = Arc::new(RecordStore::open(&config.projects_dir)?);
        let poller = Arc::new(JobPoller::new(service.clone(), config));
        let session = Arc::new(PromptSession::new(service));

        Ok(Self {
            brief_flow: BriefFlow::new(store.clone(), poller.clone(), session.clone()),
            submission_flow: SubmissionFlow::new(store.clone(), poller, session),
            store,
            progress: ProgressReporter::silent(),
        })
    }

    /// 设置进度推送器
    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// 导入作业说明并生成完成计划
    ///
    /// 成功时返回新保存的项目记录，计划文本在 `brief_content` 中
    pub async fn ingest_brief(&self, name: &str, file_bytes: &[u8], file_name: &str) -> AppResult<ProjectRecord> {
        self.ingest_brief_cancellable(name, file_bytes, file_name, CancellationToken::new())
            .await
    }

    pub async fn ingest_brief_cancellable(
        &self,
        name: &str,
        file_bytes: &[u8],
        file_name: &str,
        cancel: CancellationToken,
    ) -> AppResult<ProjectRecord> {
        let ctx = FlowCtx::new(name, cancel, self.progress.clone());
        self.brief_flow.run(&ctx, file_bytes, file_name).await
    }

    /// 列出所有项目（字典序）
    pub fn list_projects(&self) -> AppResult<Vec<String>> {
        self.store.list_project_names()
    }

    /// 读取项目记录，不存在时返回 `NotFound`
    pub fn load_project(&self, name: &str) -> AppResult<ProjectRecord> {
        self.store.load(name)
    }

    /// 提交作业并评估
    pub async fn submit_for_evaluation(
        &self,
        name: &str,
        file_bytes: &[u8],
        comments: Option<String>,
    ) -> AppResult<SubmissionResult> {
        self.submit_for_evaluation_cancellable(name, file_bytes, comments, CancellationToken::new())
            .await
    }

    pub async fn submit_for_evaluation_cancellable(
        &self,
        name: &str,
        file_bytes: &[u8],
        comments: Option<String>,
        cancel: CancellationToken,
    ) -> AppResult<SubmissionResult> {
        let ctx = FlowCtx::new(name, cancel, self.progress.clone());
        self.submission_flow.run(&ctx, file_bytes, comments).await
    }

    /// 重置当前项目为默认的未保存项目
    pub fn reset_active_project(&self, session: &mut Session) {
        info!("🔄 重置会话 (原项目: {})", session.active_project());
        session.reset();
    }
}
