//! Gemini API 客户端
//!
//! 通过 REST 接口完成三件事：
//! - 可恢复上传（`/upload/v1beta/files`）
//! - 查询文件处理状态（`/v1beta/files/{id}`）
//! - 单轮内容生成（`/v1beta/models/{model}:generateContent`）

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::clients::ai_service::{AiService, GenerationRequest};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{DocumentState, JobHandle};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini 文件资源
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiFile {
    name: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    uri: String,
    #[serde(default)]
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: GeminiFile,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

/// Gemini 客户端
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    api_base_url: String,
    model_name: String,
}

impl GeminiClient {
    /// 创建新的 Gemini 客户端
    ///
    /// 每个请求都受 `request_timeout_secs` 限制，状态查询不会无限挂起
    pub fn new(config: &Config) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| AppError::Config(format!("无法创建 HTTP 客户端: {}", e)))?;

        Ok(Self {
            client,
            api_key: config.gemini_api_key.clone(),
            api_base_url: config.gemini_api_base_url.trim_end_matches('/').to_string(),
            model_name: config.gemini_model_name.clone(),
        })
    }

    /// 读取非 2xx 响应的正文，用于错误信息
    async fn error_body(response: reqwest::Response) -> String {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        format!("HTTP {}: {}", status.as_u16(), body)
    }
}

#[async_trait]
impl AiService for GeminiClient {
    async fn upload_document(&self, path: &Path, mime_type: &str) -> AppResult<JobHandle> {
        let path_display = path.display().to_string();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| AppError::upload(&path_display, e))?;
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path_display.clone());

        debug!("开始上传文件: {} ({} 字节)", display_name, bytes.len());

        // 第一步：申请上传地址
        let start = self
            .client
            .post(format!("{}/upload/v1beta/files", self.api_base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&json!({ "file": { "display_name": display_name } }))
            .send()
            .await
            .map_err(|e| AppError::upload(&path_display, e))?;

        if !start.status().is_success() {
            let body = Self::error_body(start).await;
            warn!("申请上传地址失败: {}", body);
            return Err(AppError::upload(&path_display, body));
        }

        let upload_url = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| AppError::upload(&path_display, "响应中缺少 x-goog-upload-url"))?;

        // 第二步：上传文件内容并结束会话
        let response = self
            .client
            .post(upload_url)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(bytes)
            .send()
            .await
            .map_err(|e| AppError::upload(&path_display, e))?;

        if !response.status().is_success() {
            let body = Self::error_body(response).await;
            warn!("上传文件内容失败: {}", body);
            return Err(AppError::upload(&path_display, body));
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| AppError::upload(&path_display, e))?;

        debug!("文件已上传: {} -> {}", display_name, uploaded.file.uri);

        Ok(JobHandle {
            name: uploaded.file.name,
            uri: uploaded.file.uri,
            mime_type: uploaded.file.mime_type.unwrap_or_else(|| mime_type.to_string()),
            display_name: uploaded.file.display_name.or(Some(display_name)),
        })
    }

    async fn document_state(&self, handle: &JobHandle) -> AppResult<DocumentState> {
        let response = self
            .client
            .get(format!("{}/v1beta/{}", self.api_base_url, handle.name))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| AppError::processing(&handle.name, e.to_string()))?;

        if !response.status().is_success() {
            let body = Self::error_body(response).await;
            return Err(AppError::processing(&handle.name, body));
        }

        let file: GeminiFile = response
            .json()
            .await
            .map_err(|e| AppError::processing(&handle.name, e.to_string()))?;

        let state = parse_state(file.state.as_deref());
        debug!("文件 {} 状态: {:?}", file.name, state);
        Ok(state)
    }

    async fn generate(&self, request: &GenerationRequest) -> AppResult<String> {
        debug!("调用 Gemini API，模型: {}", self.model_name);
        debug!("指令长度: {} 字符", request.instruction.len());

        let response = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.api_base_url, self.model_name
            ))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&build_generate_body(request))
            .send()
            .await
            .map_err(|e| {
                warn!("Gemini API 调用失败: {}", e);
                AppError::generation(&self.model_name, e.to_string())
            })?;

        if !response.status().is_success() {
            let body = Self::error_body(response).await;
            warn!("Gemini API 返回错误: {}", body);
            return Err(AppError::generation(&self.model_name, body));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AppError::generation(&self.model_name, e.to_string()))?;

        debug!("Gemini API 调用成功");

        extract_text(&parsed).map_err(|reason| AppError::generation(&self.model_name, reason))
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

// ========== 辅助函数 ==========

/// 将服务端状态映射为 [`DocumentState`]
///
/// 只有 `PROCESSING` 是中间态；除 `ACTIVE` 以外的终态都视为失败。
fn parse_state(state: Option<&str>) -> DocumentState {
    match state {
        Some("PROCESSING") => DocumentState::Processing,
        Some("ACTIVE") => DocumentState::Ready,
        _ => DocumentState::Failed,
    }
}

/// 构建 generateContent 请求体
fn build_generate_body(request: &GenerationRequest) -> Value {
    let mut body = json!({
        "contents": [
            {
                "role": "user",
                "parts": [
                    {
                        "fileData": {
                            "mimeType": request.document.mime_type,
                            "fileUri": request.document.uri,
                        }
                    },
                    { "text": request.instruction },
                ]
            },
            {
                "role": "user",
                "parts": [{ "text": request.follow_up }]
            }
        ],
        "generationConfig": {
            "temperature": 1.0,
            "topP": 0.95,
            "topK": 40,
            "maxOutputTokens": 8192,
            "responseMimeType": "text/plain",
        }
    });

    if let Some(system_instruction) = &request.system_instruction {
        body["systemInstruction"] = json!({ "parts": [{ "text": system_instruction }] });
    }

    body
}

/// 提取生成的文本
fn extract_text(response: &GenerateContentResponse) -> Result<String, String> {
    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.as_deref())
    {
        return Err(format!("请求被拦截: {}", reason));
    }

    let candidate = response
        .candidates
        .first()
        .ok_or_else(|| "返回结果为空".to_string())?;

    let text: String = candidate
        .content
        .as_ref()
        .map(|c| c.parts.iter().filter_map(|p| p.text.as_deref()).collect())
        .unwrap_or_default();

    let text = text.trim();
    if text.is_empty() {
        return Err(format!(
            "返回内容为空 (finishReason: {})",
            candidate.finish_reason.as_deref().unwrap_or("未知")
        ));
    }

    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request() -> GenerationRequest {
        GenerationRequest {
            system_instruction: Some("You are a student assignment helper".to_string()),
            document: JobHandle {
                name: "files/abc123".to_string(),
                uri: "https://generativelanguage.googleapis.com/v1beta/files/abc123".to_string(),
                mime_type: "application/pdf".to_string(),
                display_name: Some("brief.pdf".to_string()),
            },
            instruction: "Please help me with this assignment".to_string(),
            follow_up: "Generate step by step guide".to_string(),
        }
    }

    #[test]
    fn test_client_builds_from_config() {
        let config = Config {
            gemini_api_base_url: "https://example.test/".to_string(),
            ..Config::default()
        };
        let client = GeminiClient::new(&config).unwrap();
        assert_eq!(client.api_base_url, "https://example.test");
        assert_eq!(client.model_name(), "gemini-2.0-flash-exp");
    }

    #[test]
    fn test_parse_state() {
        assert_eq!(parse_state(Some("PROCESSING")), DocumentState::Processing);
        assert_eq!(parse_state(Some("ACTIVE")), DocumentState::Ready);
        assert_eq!(parse_state(Some("FAILED")), DocumentState::Failed);
        assert_eq!(parse_state(Some("STATE_UNSPECIFIED")), DocumentState::Failed);
        assert_eq!(parse_state(None), DocumentState::Failed);
    }

    #[test]
    fn test_generate_body_seeds_document_then_follow_up() {
        let body = build_generate_body(&sample_request());

        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 2);
        assert_eq!(
            contents[0]["parts"][0]["fileData"]["fileUri"],
            "https://generativelanguage.googleapis.com/v1beta/files/abc123"
        );
        assert_eq!(contents[0]["parts"][1]["text"], "Please help me with this assignment");
        assert_eq!(contents[1]["parts"][0]["text"], "Generate step by step guide");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 8192);
        assert!(body.get("systemInstruction").is_some());
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "Grade: B+. " }, { "text": "Strong content." }] },
                "finishReason": "STOP"
            }]
        }))
        .unwrap();

        assert_eq!(extract_text(&response).unwrap(), "Grade: B+. Strong content.");
    }

    #[test]
    fn test_extract_text_rejects_empty_and_blocked() {
        let empty: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{ "finishReason": "SAFETY" }]
        }))
        .unwrap();
        assert!(extract_text(&empty).unwrap_err().contains("SAFETY"));

        let blocked: GenerateContentResponse = serde_json::from_value(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        }))
        .unwrap();
        assert!(extract_text(&blocked).is_err());

        assert!(extract_text(&GenerateContentResponse::default()).is_err());
    }

    #[test]
    fn test_upload_response_parsing() {
        let uploaded: UploadResponse = serde_json::from_value(json!({
            "file": {
                "name": "files/abc123",
                "displayName": "brief.pdf",
                "mimeType": "application/pdf",
                "uri": "https://example/files/abc123",
                "state": "PROCESSING"
            }
        }))
        .unwrap();
        assert_eq!(uploaded.file.name, "files/abc123");
        assert_eq!(parse_state(uploaded.file.state.as_deref()), DocumentState::Processing);
    }

    /// 需要真实的 GEMINI_API_KEY
    #[tokio::test]
    #[ignore]
    async fn test_upload_real_document() {
        let _ = tracing_subscriber::fmt::try_init();

        let config = Config::from_env();
        let client = GeminiClient::new(&config).unwrap();
        let path = std::env::var("TEST_PDF").unwrap_or_else(|_| "brief.pdf".to_string());

        let handle = client
            .upload_document(Path::new(&path), "application/pdf")
            .await
            .expect("上传失败");
        println!("已上传: {}", handle);
    }
}
