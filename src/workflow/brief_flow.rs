//! 作业说明导入流程 - 流程层
//!
//! 流程顺序：
//! 1. 暂存上传的文件（临时文件，流程结束后自动删除）
//! 2. 上传 → 等待就绪
//! 3. 生成完成计划
//! 4. 保存项目记录
//!
//! 任一步骤失败都不会写入任何记录。

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use tempfile::NamedTempFile;
use tracing::{error, info};

use crate::error::{AppError, AppResult};
use crate::models::{ProgressEvent, ProjectRecord};
use crate::services::record_store::validate_project_name;
use crate::services::{JobPoller, PromptSession, RecordStore};
use crate::utils::truncate_text;
use crate::workflow::flow_ctx::FlowCtx;

pub struct BriefFlow {
    store: Arc<RecordStore>,
    poller: Arc<JobPoller>,
    session: Arc<PromptSession>,
}

impl BriefFlow {
    pub fn new(store: Arc<RecordStore>, poller: Arc<JobPoller>, session: Arc<PromptSession>) -> Self {
        Self {
            store,
            poller,
            session,
        }
    }

    pub async fn run(&self, ctx: &FlowCtx, file_bytes: &[u8], file_name: &str) -> AppResult<ProjectRecord> {
        validate_project_name(&ctx.project_name)?;
        info!("{} 📄 开始解析作业说明: {}", ctx, file_name);

        match self.generate_plan(ctx, file_bytes, file_name).await {
            Ok(plan) => {
                info!("{} ✓ 计划已生成: {}", ctx, truncate_text(&plan, 80));
                ctx.progress.emit(ProgressEvent::Saving);
                self.store.create_or_replace(&ctx.project_name, &plan, file_name)
            }
            Err(e) => {
                error!("{} ❌ 作业说明解析失败，未保存任何内容: {}", ctx, e);
                Err(e)
            }
        }
    }

    async fn generate_plan(&self, ctx: &FlowCtx, file_bytes: &[u8], file_name: &str) -> AppResult<String> {
        // 临时文件在本函数返回时删除
        let spooled = spool_upload(self.store.project_dir(), file_bytes, file_name)?;

        ctx.progress.emit(ProgressEvent::Uploading {
            file_name: file_name.to_string(),
        });
        let handle = self
            .poller
            .submit_and_wait(spooled.path(), mime_type_for(file_name), &ctx.cancel, &ctx.progress)
            .await?;

        ctx.progress.emit(ProgressEvent::Generating);
        self.session.generate_plan(&handle).await
    }
}

/// 根据文件扩展名推断 MIME 类型，无法识别时按 PDF 处理
pub fn mime_type_for(file_name: &str) -> &'static str {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("txt") => "text/plain",
        Some("md") => "text/markdown",
        Some("html") | Some("htm") => "text/html",
        _ => "application/pdf",
    }
}

fn spool_upload(dir: &Path, file_bytes: &[u8], file_name: &str) -> AppResult<NamedTempFile> {
    let suffix = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default();

    let mut spooled = tempfile::Builder::new()
        .prefix("upload_")
        .suffix(&suffix)
        .tempfile_in(dir)
        .map_err(|e| AppError::persistence(dir.display().to_string(), e))?;
    let spooled_path = spooled.path().display().to_string();
    spooled
        .write_all(file_bytes)
        .and_then(|_| spooled.flush())
        .map_err(|e| AppError::persistence(&spooled_path, e))?;

    Ok(spooled)
}
