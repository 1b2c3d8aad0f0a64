pub mod brief_flow;
pub mod flow_ctx;
pub mod submission_flow;

pub use brief_flow::BriefFlow;
pub use flow_ctx::FlowCtx;
pub use submission_flow::{SubmissionFlow, SubmissionResult};
