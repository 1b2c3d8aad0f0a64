use std::time::Duration;

/// 应用程序错误类型
///
/// 封闭的错误分类，调用方按变体分支处理，而不是匹配错误文本。
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 文档上传失败（网络错误或服务拒绝）
    #[error("文档上传失败 ({path}): {source}")]
    Upload {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// 服务端处理文档失败，或查询处理状态失败
    #[error("文档处理失败 ({handle}): {reason}")]
    Processing { handle: String, reason: String },

    /// 文本生成失败或返回内容不可用
    #[error("内容生成失败 (模型: {model}): {reason}")]
    Generation { model: String, reason: String },

    /// 项目不存在（或记录已损坏）
    #[error("项目不存在: {name}")]
    NotFound { name: String },

    /// 存储写入/读取失败
    #[error("存储操作失败 ({path}): {source}")]
    Persistence {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// 等待文档就绪超时
    #[error("等待文档 {handle} 就绪超时 (已等待 {waited:?})")]
    Timeout { handle: String, waited: Duration },

    /// 调用方取消了等待
    #[error("操作已取消")]
    Cancelled,

    /// 项目名称不合法
    #[error("项目名称不合法: {name:?} ({reason})")]
    InvalidProjectName { name: String, reason: &'static str },

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建上传错误
    pub fn upload(path: impl Into<String>, source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        AppError::Upload {
            path: path.into(),
            source: source.into(),
        }
    }

    /// 创建处理错误
    pub fn processing(handle: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::Processing {
            handle: handle.into(),
            reason: reason.into(),
        }
    }

    /// 创建生成错误
    pub fn generation(model: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::Generation {
            model: model.into(),
            reason: reason.into(),
        }
    }

    /// 创建存储错误
    pub fn persistence(path: impl Into<String>, source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        AppError::Persistence {
            path: path.into(),
            source: source.into(),
        }
    }

    pub fn not_found(name: impl Into<String>) -> Self {
        AppError::NotFound { name: name.into() }
    }

    /// 是否为可恢复的用户输入问题（而非系统故障）
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            AppError::NotFound { .. } | AppError::InvalidProjectName { .. }
        )
    }

    /// 评估阶段的失败是否应降级为"已保存但未评估"
    ///
    /// 存储错误永远不会被降级。
    pub fn degrades_to_unevaluated(&self) -> bool {
        matches!(
            self,
            AppError::Upload { .. }
                | AppError::Processing { .. }
                | AppError::Generation { .. }
                | AppError::Timeout { .. }
                | AppError::Cancelled
        )
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
