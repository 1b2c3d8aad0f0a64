//! 提示词与单轮会话 - 业务能力层
//!
//! 只负责"构建提示词并获取生成文本"能力，不关心流程

use std::sync::Arc;

use tracing::{debug, info};

use crate::clients::{AiService, GenerationRequest};
use crate::error::{AppError, AppResult};
use crate::models::JobHandle;
use crate::utils::truncate_text;

/// 系统指令：作业助手的角色设定
pub const SYSTEM_INSTRUCTION: &str = "You are a student assignment helper and your job is to understand \
the uploaded assignment brief, analyze it, check details like deliverables, \
grading scheme, assignment requirements and any special instructions and \
finally prepare a road map (step by step guideline) for the students \
which they can follow to complete the assignment.";

/// 解析作业说明时与文档一起发送的指令
pub const BRIEF_INSTRUCTION: &str = "Please help me with this assignment";

/// 生成完成计划的追问
pub const PLAN_FOLLOW_UP: &str = "Generate step by step guide for the completion of this assignment";

/// 评估提交时的追问
pub const EVALUATION_FOLLOW_UP: &str = "Please provide a comprehensive evaluation of this submission.";

/// 构建评估提示词
///
/// 嵌入完整的作业指南，并附上五条固定的评估要求。纯函数，无副作用。
pub fn build_evaluation_prompt(original_brief: &str) -> String {
    format!(
        r#"Original Assignment Guide:
{}

Task: Analyze the submitted PDF file based on the above criteria and:
1. Propose a grade/marks for this submission
2. Provide detailed feedback explaining the grade
3. Identify specific strengths and areas for improvement
4. Give constructive suggestions for enhancement
5. Compare the submission against the key requirements outlined in the original guide"#,
        original_brief
    )
}

/// 单轮会话
///
/// 职责：
/// - 以"文档 + 指令"开启会话
/// - 只发送一条追问，不重试
/// - 返回生成文本
pub struct PromptSession {
    service: Arc<dyn AiService>,
}

impl PromptSession {
    pub fn new(service: Arc<dyn AiService>) -> Self {
        Self { service }
    }

    /// 执行一次单轮生成
    ///
    /// # 参数
    /// - `document`: 已就绪的文档句柄
    /// - `instruction`: 与文档一起发送的指令
    /// - `follow_up`: 唯一的一条追问
    ///
    /// # 返回
    /// 去除首尾空白后的生成文本；服务错误原样返回
    pub async fn run_single_turn(
        &self,
        document: &JobHandle,
        instruction: &str,
        follow_up: &str,
    ) -> AppResult<String> {
        let request = GenerationRequest {
            system_instruction: Some(SYSTEM_INSTRUCTION.to_string()),
            document: document.clone(),
            instruction: instruction.to_string(),
            follow_up: follow_up.to_string(),
        };

        info!("🤖 正在生成内容 (模型: {})...", self.service.model_name());
        let text = self.service.generate(&request).await?;
        let text = text.trim();

        if text.is_empty() {
            return Err(AppError::generation(self.service.model_name(), "返回内容为空"));
        }

        debug!("生成结果预览: {}", truncate_text(text, 80));
        Ok(text.to_string())
    }

    /// 根据作业说明生成完成计划
    pub async fn generate_plan(&self, brief: &JobHandle) -> AppResult<String> {
        self.run_single_turn(brief, BRIEF_INSTRUCTION, PLAN_FOLLOW_UP).await
    }

    /// 根据原始作业指南评估提交
    pub async fn evaluate_submission(&self, submission: &JobHandle, original_brief: &str) -> AppResult<String> {
        let prompt = build_evaluation_prompt(original_brief);
        self.run_single_turn(submission, &prompt, EVALUATION_FOLLOW_UP).await
    }
}
