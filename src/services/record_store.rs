//! 项目记录存储 - 业务能力层
//!
//! 每个项目一个 JSON 文件（`<root>/<name>.json`），另有一个按行排列的
//! 项目索引（`<root>/projects_list.txt`）。
//!
//! 所有写入都经过 [`write_file_atomic`]。创建项目时先写索引、再写记录，
//! 崩溃最多留下一个没有记录的索引条目，读取索引时会被过滤掉。

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::models::{ProjectRecord, Submission};
use crate::utils::write_file_atomic;

const INDEX_FILE: &str = "projects_list.txt";

/// 项目记录存储
///
/// 职责：
/// - 读写单个项目记录
/// - 维护项目索引
/// - 同一项目的读-改-写串行执行
/// - 不访问网络
pub struct RecordStore {
    root: PathBuf,
    index_lock: Mutex<()>,
    project_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl RecordStore {
    /// 创建存储，目录不存在时自动创建
    pub fn open(root: impl Into<PathBuf>) -> AppResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| AppError::persistence(root.display().to_string(), e))?;
        debug!("项目存储目录: {}", root.display());

        Ok(Self {
            root,
            index_lock: Mutex::new(()),
            project_locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn project_dir(&self) -> &Path {
        &self.root
    }

    /// 写入全新的项目记录（同名项目会被覆盖，提交记录清空）
    pub fn create_or_replace(
        &self,
        name: &str,
        brief_content: &str,
        original_file: &str,
    ) -> AppResult<ProjectRecord> {
        validate_project_name(name)?;

        let project_lock = self.project_lock(name);
        let _guard = lock(&project_lock);

        self.register_in_index(name)?;

        let record = ProjectRecord::new(name, brief_content, original_file);
        self.write_record(&record)?;

        info!("✓ 项目已保存: {}", name);
        Ok(record)
    }

    /// 读取项目记录
    ///
    /// 名称不合法、文件不存在或内容损坏时都返回 `NotFound`
    pub fn load(&self, name: &str) -> AppResult<ProjectRecord> {
        if validate_project_name(name).is_err() {
            return Err(AppError::not_found(name));
        }
        let path = self.record_path(name);

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::not_found(name));
            }
            Err(e) => return Err(AppError::persistence(path.display().to_string(), e)),
        };

        serde_json::from_str(&content).map_err(|e| {
            warn!("⚠️ 项目记录已损坏 {}: {}", path.display(), e);
            AppError::not_found(name)
        })
    }

    /// 追加一次提交，并根据是否有评估结果更新项目状态
    pub fn append_submission(&self, name: &str, submission: Submission) -> AppResult<ProjectRecord> {
        validate_project_name(name)?;

        let project_lock = self.project_lock(name);
        let _guard = lock(&project_lock);

        let mut record = self.load(name)?;
        record.push_submission(submission);
        self.write_record(&record)?;

        debug!(
            "项目 {} 追加提交 #{}，当前状态: {}",
            name,
            record.submissions.len(),
            record.status
        );
        Ok(record)
    }

    /// 按字典序列出所有项目名称（过滤掉没有记录文件的索引条目）
    pub fn list_project_names(&self) -> AppResult<Vec<String>> {
        let names = {
            let _guard = lock(&self.index_lock);
            self.read_index()?
        };

        Ok(names
            .into_iter()
            .filter(|name| {
                let exists = validate_project_name(name).is_ok() && self.record_path(name).is_file();
                if !exists {
                    debug!("忽略失效的索引条目: {}", name);
                }
                exists
            })
            .collect())
    }

    /// 生成不会冲突的提交文件路径
    ///
    /// 形如 `<root>/<name>_<YYYYmmdd_HHMMSS>_<8位随机>.<ext>`
    pub fn submission_path(&self, name: &str, extension: &str, saved_at: NaiveDateTime) -> AppResult<PathBuf> {
        validate_project_name(name)?;
        let timestamp = saved_at.format("%Y%m%d_%H%M%S");
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        Ok(self.root.join(format!(
            "{}_{}_{}.{}",
            name,
            timestamp,
            &suffix[..8],
            extension.trim_start_matches('.')
        )))
    }

    // ========== 内部方法 ==========

    fn record_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.json", name))
    }

    fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE)
    }

    fn project_lock(&self, name: &str) -> Arc<Mutex<()>> {
        let mut locks = lock(&self.project_locks);
        locks.entry(name.to_string()).or_default().clone()
    }

    fn write_record(&self, record: &ProjectRecord) -> AppResult<()> {
        let path = self.record_path(&record.name);
        let content = to_pretty_json(record).map_err(|e| AppError::persistence(path.display().to_string(), e))?;
        write_file_atomic(&path, &content)
    }

    fn read_index(&self) -> AppResult<BTreeSet<String>> {
        let path = self.index_path();
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeSet::new()),
            Err(e) => Err(AppError::persistence(path.display().to_string(), e)),
        }
    }

    fn register_in_index(&self, name: &str) -> AppResult<()> {
        let _guard = lock(&self.index_lock);

        let mut names = self.read_index()?;
        if !names.insert(name.to_string()) {
            return Ok(());
        }

        let content: String = names.iter().map(|n| format!("{}\n", n)).collect();
        write_file_atomic(&self.index_path(), content.as_bytes())
    }
}

/// 检查项目名称能否安全地用作文件名和索引行
pub fn validate_project_name(name: &str) -> AppResult<()> {
    let reason = if name.trim().is_empty() {
        Some("名称不能为空")
    } else if name != name.trim() {
        Some("名称首尾不能有空白")
    } else if name.starts_with('.') {
        Some("名称不能以 . 开头")
    } else if name.contains(['/', '\\']) || name.contains("..") {
        Some("名称不能包含路径分隔符")
    } else if name.chars().any(char::is_control) {
        Some("名称不能包含控制字符")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(AppError::InvalidProjectName {
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

// 与旧记录一致使用 4 空格缩进
fn to_pretty_json(record: &ProjectRecord) -> serde_json::Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    serde::Serialize::serialize(record, &mut serializer)?;
    Ok(buf)
}

// 锁中毒只可能来自其他线程 panic，此时数据仍在磁盘上，继续使用
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
