//! 界面会话状态
//!
//! 由调用方持有并显式传入，编排器本身不保存"当前项目"。

/// 未保存项目的默认名称
pub const DEFAULT_PROJECT_NAME: &str = "Untitled Project";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    active_project: String,
    selected_submission: Option<usize>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            active_project: DEFAULT_PROJECT_NAME.to_string(),
            selected_submission: None,
        }
    }

    pub fn active_project(&self) -> &str {
        &self.active_project
    }

    /// 切换当前项目，同时清除提交选择
    pub fn select_project(&mut self, name: impl Into<String>) {
        self.active_project = name.into();
        self.selected_submission = None;
    }

    pub fn select_submission(&mut self, index: usize) {
        self.selected_submission = Some(index);
    }

    pub fn selected_submission(&self) -> Option<usize> {
        self.selected_submission
    }

    /// 当前项目是否仍是未保存的默认项目
    pub fn is_placeholder(&self) -> bool {
        self.active_project == DEFAULT_PROJECT_NAME
    }

    /// 清除所有临时选择，回到默认项目
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
