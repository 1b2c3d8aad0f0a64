//! 提交与评估流程 - 流程层
//!
//! 流程顺序：
//! 1. 确认项目存在
//! 2. 保存提交文件（文件名带时间戳和随机后缀）
//! 3. 上传 → 等待就绪 → 以原始作业指南评估
//! 4. 追加提交记录
//!
//! 第 3 步的任何失败都不会丢失提交：记录照常追加，只是没有评估结果。
//! 存储错误总是原样返回。

use std::path::Path;
use std::sync::Arc;

use chrono::Local;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::models::{ProgressEvent, ProjectRecord, Submission};
use crate::services::{JobPoller, PromptSession, RecordStore};
use crate::utils::{truncate_text, write_file_atomic};
use crate::workflow::flow_ctx::FlowCtx;

const SUBMISSION_MIME_TYPE: &str = "application/pdf";

/// 提交结果
///
/// 明确区分"已保存并评估"和"已保存但未评估"
#[derive(Debug)]
pub enum SubmissionResult {
    /// 提交已保存并完成评估
    Evaluated { record: ProjectRecord },
    /// 提交已保存，但评估失败
    SavedWithoutEvaluation { record: ProjectRecord, reason: AppError },
}

impl SubmissionResult {
    pub fn record(&self) -> &ProjectRecord {
        match self {
            SubmissionResult::Evaluated { record } | SubmissionResult::SavedWithoutEvaluation { record, .. } => record,
        }
    }

    /// 本次追加的提交
    pub fn submission(&self) -> Option<&Submission> {
        self.record().latest_submission()
    }

    pub fn evaluation(&self) -> Option<&str> {
        self.submission().and_then(|s| s.evaluation.as_deref())
    }

    /// 评估失败的原因
    pub fn failure(&self) -> Option<&AppError> {
        match self {
            SubmissionResult::Evaluated { .. } => None,
            SubmissionResult::SavedWithoutEvaluation { reason, .. } => Some(reason),
        }
    }

    pub fn is_evaluated(&self) -> bool {
        matches!(self, SubmissionResult::Evaluated { .. })
    }
}

pub struct SubmissionFlow {
    store: Arc<RecordStore>,
    poller: Arc<JobPoller>,
    session: Arc<PromptSession>,
}

impl SubmissionFlow {
    pub fn new(store: Arc<RecordStore>, poller: Arc<JobPoller>, session: Arc<PromptSession>) -> Self {
        Self {
            store,
            poller,
            session,
        }
    }

    pub async fn run(
        &self,
        ctx: &FlowCtx,
        file_bytes: &[u8],
        comments: Option<String>,
    ) -> AppResult<SubmissionResult> {
        let record = self.store.load(&ctx.project_name)?;

        let saved_at = Local::now().naive_local();
        let saved_path = self.store.submission_path(&ctx.project_name, "pdf", saved_at)?;
        write_file_atomic(&saved_path, file_bytes)?;
        info!("{} 💾 提交文件已保存: {}", ctx, saved_path.display());

        let (evaluation, failure) = match self.evaluate(ctx, &saved_path, &record.brief_content).await {
            Ok(text) => {
                info!("{} ✓ 评估完成: {}", ctx, truncate_text(&text, 80));
                (Some(text), None)
            }
            Err(e) if e.degrades_to_unevaluated() => {
                warn!("{} ⚠️ 评估失败，提交已保存但未评估: {}", ctx, e);
                (None, Some(e))
            }
            Err(e) => return Err(e),
        };

        ctx.progress.emit(ProgressEvent::Saving);
        let submission = Submission::new(saved_path.display().to_string(), comments, evaluation).saved_at(saved_at);
        let record = self.store.append_submission(&ctx.project_name, submission)?;

        Ok(match failure {
            None => SubmissionResult::Evaluated { record },
            Some(reason) => SubmissionResult::SavedWithoutEvaluation { record, reason },
        })
    }

    async fn evaluate(&self, ctx: &FlowCtx, saved_path: &Path, original_brief: &str) -> AppResult<String> {
        ctx.progress.emit(ProgressEvent::Uploading {
            file_name: saved_path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
        });
        let handle = self
            .poller
            .submit_and_wait(saved_path, SUBMISSION_MIME_TYPE, &ctx.cancel, &ctx.progress)
            .await?;

        ctx.progress.emit(ProgressEvent::Generating);
        self.session.evaluate_submission(&handle, original_brief).await
    }
}
