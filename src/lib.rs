//! # Assignment Evaluator
//!
//! 作业助手：导入作业说明并生成完成计划，提交作业后由 AI 服务按原始要求评估。
//!
//! ## 架构设计
//!
//! ### ① 外部服务层（Clients）
//! - `clients/` - AI 服务边界
//! - `AiService` - 上传文档、查询处理状态、单轮生成
//! - `GeminiClient` - 基于 Gemini REST API 的实现
//!
//! ### ② 业务能力层（Services）
//! - `RecordStore` - 项目记录与索引的持久化
//! - `JobPoller` - 上传并等待文档就绪（可取消、有截止时间）
//! - `PromptSession` - 构建提示词并执行单轮生成
//! - `report` - 渲染评估报告
//!
//! ### ③ 流程层（Workflow）
//! - `BriefFlow` - 作业说明 → 计划 → 保存
//! - `SubmissionFlow` - 提交 → 评估 → 追加记录（评估失败也保留提交）
//!
//! ### ④ 编排层（Orchestration）
//! - `Orchestrator` - 对界面层暴露的全部操作
//! - `Session` - 调用方持有的会话状态

pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::{AiService, GeminiClient, GenerationRequest};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{
    DocumentState, JobHandle, PollOutcome, ProgressEvent, ProgressReporter, ProjectRecord, ProjectStatus, Submission,
    SubmissionStatus,
};
pub use orchestrator::{Orchestrator, Session, DEFAULT_PROJECT_NAME};
pub use workflow::SubmissionResult;
