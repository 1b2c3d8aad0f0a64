//! 成绩提取
//!
//! 从评估文本中尽力提取成绩（字母等级、分数或百分比）。
//! 结果只是派生字段，提取不到是正常情况，不视为错误。

use regex::Regex;
use std::sync::OnceLock;

fn grade_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"\b(?i:grade|marks?|score)\W{0,6}(?:(?i:of)\s+)?(?:([A-F][+-]?)(?:[^A-Za-z]|$)|(\d{1,3}(?:\.\d+)?(?:\s*/\s*\d{1,3}|\s*%)?))",
        )
        .expect("成绩正则表达式无效")
    })
}

/// 从评估文本中提取成绩
///
/// # 返回
/// 找到第一个成绩时返回其文本（例如 `B+`、`85/100`、`72%`），否则返回 `None`
pub fn extract_grade(evaluation: &str) -> Option<String> {
    let captures = grade_pattern().captures(evaluation)?;
    captures
        .get(1)
        .or_else(|| captures.get(2))
        .map(|m| m.as_str().split_whitespace().collect::<String>())
}
