pub mod grade;
pub mod job;
pub mod progress;
pub mod project;

pub use grade::extract_grade;
pub use job::{DocumentState, JobHandle, PollOutcome};
pub use progress::{ProgressEvent, ProgressReporter};
pub use project::{ProjectRecord, ProjectStatus, Submission, SubmissionStatus};
