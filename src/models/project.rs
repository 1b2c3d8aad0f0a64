//! 项目记录数据模型
//!
//! 与原有 `projects/*.json` 文件格式保持兼容：状态值序列化为
//! `"In Progress"` / `"Submitted"` / `"Evaluated"`，时间为本地 ISO-8601。

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

use crate::models::grade::extract_grade;

/// 项目状态
///
/// 只会沿 InProgress → Submitted → Evaluated 前进；重新提交可以在
/// Submitted / Evaluated 之间切换，但永远不会回到 InProgress。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectStatus {
    #[serde(rename = "In Progress")]
    InProgress,
    Submitted,
    Evaluated,
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProjectStatus::InProgress => "In Progress",
            ProjectStatus::Submitted => "Submitted",
            ProjectStatus::Evaluated => "Evaluated",
        };
        f.write_str(s)
    }
}

/// 单次提交的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionStatus {
    Submitted,
    Evaluated,
}

/// 一次提交记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub date: NaiveDateTime,
    pub file_path: String,
    #[serde(default, deserialize_with = "deserialize_comments")]
    pub comments: Option<String>,
    pub status: SubmissionStatus,
    #[serde(default)]
    pub evaluation: Option<String>,
    #[serde(default)]
    pub grade: Option<String>,
}

impl Submission {
    /// 创建新的提交记录
    ///
    /// `status` 与 `grade` 都由 `evaluation` 推导，调用方无法单独设置。
    pub fn new(file_path: impl Into<String>, comments: Option<String>, evaluation: Option<String>) -> Self {
        let status = if evaluation.is_some() {
            SubmissionStatus::Evaluated
        } else {
            SubmissionStatus::Submitted
        };
        let grade = evaluation.as_deref().and_then(extract_grade);

        Self {
            date: Local::now().naive_local(),
            file_path: file_path.into(),
            comments: comments.filter(|c| !c.trim().is_empty()),
            status,
            evaluation,
            grade,
        }
    }

    /// 使用提交文件保存时的时间，而不是评估结束的时间
    pub fn saved_at(mut self, date: NaiveDateTime) -> Self {
        self.date = date;
        self
    }
}

/// 项目记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub name: String,
    pub brief_content: String,
    pub original_file: String,
    pub created_date: NaiveDateTime,
    pub status: ProjectStatus,
    #[serde(default)]
    pub submissions: Vec<Submission>,
}

impl ProjectRecord {
    /// 创建全新的项目记录（无提交，状态为 InProgress）
    pub fn new(
        name: impl Into<String>,
        brief_content: impl Into<String>,
        original_file: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            brief_content: brief_content.into(),
            original_file: original_file.into(),
            created_date: Local::now().naive_local(),
            status: ProjectStatus::InProgress,
            submissions: Vec::new(),
        }
    }

    /// 追加提交并重新计算项目状态
    pub fn push_submission(&mut self, submission: Submission) {
        self.status = match submission.status {
            SubmissionStatus::Evaluated => ProjectStatus::Evaluated,
            SubmissionStatus::Submitted => ProjectStatus::Submitted,
        };
        self.submissions.push(submission);
    }

    pub fn latest_submission(&self) -> Option<&Submission> {
        self.submissions.last()
    }
}

// 旧记录中的空字符串等同于未填写
fn deserialize_comments<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|c| !c.trim().is_empty()))
}
