//! 远程文档任务相关类型

use std::fmt::Display;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// 已上传到 AI 服务的文档句柄
///
/// `name` 是服务端资源名（如 `files/abc123`），用于轮询状态；
/// `uri` 用于在生成请求中引用该文档。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle {
    pub name: String,
    pub uri: String,
    pub mime_type: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Display for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.display_name {
            Some(display_name) => write!(f, "{} ({})", self.name, display_name),
            None => f.write_str(&self.name),
        }
    }
}

/// 服务端报告的文档处理状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentState {
    Processing,
    Ready,
    Failed,
}

/// 等待文档就绪的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// 所有文档均可用
    Ready,
    /// 某个文档处理失败
    Failed { handle: JobHandle },
    /// 超过截止时间仍未就绪
    TimedOut { handle: JobHandle, waited: Duration },
    /// 调用方取消
    Cancelled,
}

impl PollOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, PollOutcome::Ready)
    }
}
