use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{AppError, AppResult};

/// 程序配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- Gemini 配置 ---
    pub gemini_api_key: String,
    pub gemini_api_base_url: String,
    pub gemini_model_name: String,
    /// 项目记录与提交文件的存储目录
    pub projects_dir: PathBuf,
    /// 轮询文档状态的间隔（秒）
    pub poll_interval_secs: u64,
    /// 等待文档就绪的最长时间（秒），0 表示不限制
    pub poll_timeout_secs: u64,
    /// 单个 HTTP 请求的超时时间（秒）
    pub request_timeout_secs: u64,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini_api_key: String::new(),
            gemini_api_base_url: "https://generativelanguage.googleapis.com".to_string(),
            gemini_model_name: "gemini-2.0-flash-exp".to_string(),
            projects_dir: PathBuf::from("projects"),
            poll_interval_secs: 2,
            poll_timeout_secs: 600,
            request_timeout_secs: 300,
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 从环境变量加载配置（会先读取当前目录下的 `.env`）
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::default().with_env_overrides()
    }

    /// 从 TOML 文件加载配置，环境变量仍然可以覆盖文件中的值
    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("无法读取配置文件 {}: {}", path.display(), e)))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("无法解析配置文件 {}: {}", path.display(), e)))?;

        let _ = dotenvy::dotenv();
        Ok(config.with_env_overrides())
    }

    fn with_env_overrides(self) -> Self {
        Self {
            gemini_api_key: std::env::var("GEMINI_API_KEY").unwrap_or(self.gemini_api_key),
            gemini_api_base_url: std::env::var("GEMINI_API_BASE_URL").unwrap_or(self.gemini_api_base_url),
            gemini_model_name: std::env::var("GEMINI_MODEL_NAME").unwrap_or(self.gemini_model_name),
            projects_dir: std::env::var("PROJECTS_DIR").map(PathBuf::from).unwrap_or(self.projects_dir),
            poll_interval_secs: std::env::var("POLL_INTERVAL_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(self.poll_interval_secs),
            poll_timeout_secs: std::env::var("POLL_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(self.poll_timeout_secs),
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(self.request_timeout_secs),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(self.verbose_logging),
        }
    }

    /// 检查必需的配置项
    pub fn validate(&self) -> AppResult<()> {
        if self.gemini_api_key.trim().is_empty() {
            return Err(AppError::Config("请设置 GEMINI_API_KEY 环境变量".to_string()));
        }
        if self.poll_interval_secs == 0 {
            return Err(AppError::Config("poll_interval_secs 必须大于 0".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(AppError::Config("request_timeout_secs 必须大于 0".to_string()));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn poll_timeout(&self) -> Option<Duration> {
        (self.poll_timeout_secs > 0).then(|| Duration::from_secs(self.poll_timeout_secs))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
