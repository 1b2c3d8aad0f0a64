//! 远程任务轮询 - 业务能力层
//!
//! 只负责"上传文档并等待服务端处理完成"能力，不关心流程

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::clients::AiService;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{DocumentState, JobHandle, PollOutcome, ProgressEvent, ProgressReporter};

/// 远程任务轮询器
///
/// 固定间隔轮询，不做指数退避。等待可以被截止时间或取消令牌打断。
pub struct JobPoller {
    service: Arc<dyn AiService>,
    poll_interval: Duration,
    timeout: Option<Duration>,
}

impl JobPoller {
    pub fn new(service: Arc<dyn AiService>, config: &Config) -> Self {
        Self::with_timing(service, config.poll_interval(), config.poll_timeout())
    }

    /// 使用自定义的轮询间隔和超时
    pub fn with_timing(service: Arc<dyn AiService>, poll_interval: Duration, timeout: Option<Duration>) -> Self {
        Self {
            service,
            poll_interval,
            timeout,
        }
    }

    /// 上传本地文档
    pub async fn submit_document(&self, path: &Path, mime_type: &str) -> AppResult<JobHandle> {
        info!("📤 正在上传文档: {}", path.display());
        let handle = self.service.upload_document(path, mime_type).await?;
        info!("✓ 文档已上传: {}", handle);
        Ok(handle)
    }

    /// 等待所有文档就绪
    ///
    /// 按顺序逐个等待；第一个失败的文档会立即结束等待并返回
    /// [`PollOutcome::Failed`]。每个文档就绪后推送一次进度。
    ///
    /// # 返回
    /// - `Ok(PollOutcome)`：Ready / Failed / TimedOut / Cancelled
    /// - `Err`：查询状态时发生网络或服务错误
    pub async fn await_ready(
        &self,
        handles: &[JobHandle],
        cancel: &CancellationToken,
        progress: &ProgressReporter,
    ) -> AppResult<PollOutcome> {
        let total = handles.len();
        let started = Instant::now();
        let deadline = self.timeout.map(|t| started + t);

        info!("⏳ 等待 {} 个文档处理完成...", total);
        progress.emit(ProgressEvent::Processing { completed: 0, total });

        for (i, handle) in handles.iter().enumerate() {
            loop {
                // 状态查询本身也受取消和截止时间约束
                let state = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        warn!("⚠️ 等待已取消: {}", handle);
                        return Ok(PollOutcome::Cancelled);
                    }
                    state = self.service.document_state(handle) => state?,
                    _ = sleep_until_deadline(deadline) => {
                        let waited = Instant::now() - started;
                        warn!("⚠️ 查询文档 {} 状态超时 ({:?})", handle, waited);
                        return Ok(PollOutcome::TimedOut {
                            handle: handle.clone(),
                            waited,
                        });
                    }
                };

                match state {
                    DocumentState::Ready => break,
                    DocumentState::Failed => {
                        warn!("❌ 文档处理失败: {}", handle);
                        return Ok(PollOutcome::Failed {
                            handle: handle.clone(),
                        });
                    }
                    DocumentState::Processing => {
                        debug!("文档 {} 仍在处理中", handle);
                    }
                }

                let now = Instant::now();
                let wake_at = match deadline {
                    Some(deadline) if now >= deadline => {
                        let waited = now - started;
                        warn!("⚠️ 等待文档 {} 超时 ({:?})", handle, waited);
                        return Ok(PollOutcome::TimedOut {
                            handle: handle.clone(),
                            waited,
                        });
                    }
                    Some(deadline) => (now + self.poll_interval).min(deadline),
                    None => now + self.poll_interval,
                };

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        warn!("⚠️ 等待已取消: {}", handle);
                        return Ok(PollOutcome::Cancelled);
                    }
                    _ = tokio::time::sleep_until(wake_at) => {}
                }
            }

            progress.emit(ProgressEvent::Processing {
                completed: i + 1,
                total,
            });
        }

        info!("✓ 文档处理完成");
        Ok(PollOutcome::Ready)
    }

    /// 上传单个文档并等待其就绪
    ///
    /// 非 Ready 的结果转换为对应的错误：Failed → `Processing`，
    /// TimedOut → `Timeout`，Cancelled → `Cancelled`。
    pub async fn submit_and_wait(
        &self,
        path: &Path,
        mime_type: &str,
        cancel: &CancellationToken,
        progress: &ProgressReporter,
    ) -> AppResult<JobHandle> {
        let handle = self.submit_document(path, mime_type).await?;

        match self.await_ready(std::slice::from_ref(&handle), cancel, progress).await? {
            PollOutcome::Ready => Ok(handle),
            PollOutcome::Failed { handle } => Err(AppError::processing(
                handle.to_string(),
                "服务端将文档标记为不可用",
            )),
            PollOutcome::TimedOut { handle, waited } => Err(AppError::Timeout {
                handle: handle.to_string(),
                waited,
            }),
            PollOutcome::Cancelled => Err(AppError::Cancelled),
        }
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
