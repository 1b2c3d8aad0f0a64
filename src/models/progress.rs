//! 进度事件
//!
//! 长时间等待（上传、轮询、生成）期间向界面层推送进度。

use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// 正在上传文档
    Uploading { file_name: String },
    /// 等待文档处理，`completed / total` 个已就绪
    Processing { completed: usize, total: usize },
    /// 正在生成文本
    Generating,
    /// 正在保存结果
    Saving,
}

impl ProgressEvent {
    /// 处理进度比例（0.0 ~ 1.0），非处理阶段返回 `None`
    pub fn fraction(&self) -> Option<f32> {
        match self {
            ProgressEvent::Processing { total: 0, .. } => Some(1.0),
            ProgressEvent::Processing { completed, total } => Some(*completed as f32 / *total as f32),
            _ => None,
        }
    }
}

/// 进度推送器，没有订阅者时所有事件被丢弃
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    sender: Option<UnboundedSender<ProgressEvent>>,
}

impl ProgressReporter {
    pub fn new(sender: UnboundedSender<ProgressEvent>) -> Self {
        Self { sender: Some(sender) }
    }

    pub fn silent() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: ProgressEvent) {
        if let Some(sender) = &self.sender {
            // 接收端已关闭说明界面不再关心进度
            let _ = sender.send(event);
        }
    }
}
