//! 流程上下文
//!
//! 封装"我正在处理哪个项目"以及取消令牌和进度推送器。
//! 项目名称始终显式传入，不存在全局的"当前项目"。

use std::fmt::Display;

use tokio_util::sync::CancellationToken;

use crate::models::ProgressReporter;

#[derive(Debug, Clone)]
pub struct FlowCtx {
    /// 项目名称
    pub project_name: String,

    /// 取消令牌，在轮询间隙检查
    pub cancel: CancellationToken,

    /// 进度推送
    pub progress: ProgressReporter,
}

impl FlowCtx {
    pub fn new(project_name: impl Into<String>, cancel: CancellationToken, progress: ProgressReporter) -> Self {
        Self {
            project_name: project_name.into(),
            cancel,
            progress,
        }
    }
}

impl Display for FlowCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[项目 {}]", self.project_name)
    }
}
