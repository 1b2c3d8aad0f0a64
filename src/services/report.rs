//! 评估报告 - 业务能力层
//!
//! 把一次提交的评估结果渲染成可下载的 Markdown 报告

use crate::models::Submission;

/// 默认的报告文件名
pub fn report_file_name(project_name: &str) -> String {
    format!("evaluation_{}.md", project_name)
}

/// 渲染评估报告
///
/// 未评估的提交返回 `None`
pub fn render_evaluation_report(project_name: &str, submission: &Submission) -> Option<String> {
    let evaluation = submission.evaluation.as_deref()?;

    let mut report = format!(
        "# Assignment Evaluation Report\n\n## {}\n\nSubmission Date: {}\n",
        project_name,
        submission.date.format("%Y-%m-%d %H:%M")
    );
    if let Some(grade) = &submission.grade {
        report.push_str(&format!("Proposed Grade: {}\n", grade));
    }
    if let Some(comments) = &submission.comments {
        report.push_str(&format!("Comments: {}\n", comments));
    }
    report.push('\n');
    report.push_str(evaluation);
    report.push('\n');

    Some(report)
}
