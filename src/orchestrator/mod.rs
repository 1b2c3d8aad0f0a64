//! 编排层（Orchestration Layer）
//!
//! ## 层次关系
//!
//! ```text
//! orchestrator::Orchestrator (界面层调用的全部操作)
//!     ↓
//! workflow::BriefFlow / SubmissionFlow (单个项目的一次流程)
//!     ↓
//! services (能力层：存储 / 轮询 / 提示词 / 报告)
//!     ↓
//! clients (外部服务：AiService / GeminiClient)
//! ```
//!
//! ## 设计原则
//!
//! 1. **显式上下文**：项目名称由调用方传入，会话状态由调用方持有
//! 2. **向下依赖**：编排层 → workflow → services → clients
//! 3. **只追加**：任何操作都不删除项目记录或提交记录

pub mod lifecycle;
pub mod session;

pub use lifecycle::Orchestrator;
pub use session::{Session, DEFAULT_PROJECT_NAME};
