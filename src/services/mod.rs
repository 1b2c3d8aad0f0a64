pub mod job_poller;
pub mod prompt_builder;
pub mod record_store;
pub mod report;

pub use job_poller::JobPoller;
pub use prompt_builder::{build_evaluation_prompt, PromptSession};
pub use record_store::RecordStore;
pub use report::{render_evaluation_report, report_file_name};
