use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use assignment_evaluator::{
    AiService, AppError, AppResult, Config, DocumentState, GenerationRequest, JobHandle, Orchestrator, ProjectStatus,
    Session, SubmissionResult, SubmissionStatus, DEFAULT_PROJECT_NAME,
};
use async_trait::async_trait;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const BRIEF: &str = "Write 500 words on X, grading: content 70%, grammar 30%.";
const EVALUATION: &str = "Grade: B+. Strong content, minor grammar issues.";

/// 脚本化的 AI 服务
///
/// 每个上传的文档按 `states` 脚本依次返回状态（脚本耗尽后重复最后一个），
/// 生成请求按 `replies` 队列依次返回，`None` 表示生成失败。
/// 设置 `break_dir` 后，每次生成都会把该目录替换成普通文件，之后的存储操作必然失败。
struct FakeAiService {
    states: Vec<DocumentState>,
    fail_upload: bool,
    break_dir: Option<PathBuf>,
    replies: Mutex<VecDeque<Option<String>>>,
    pending: Mutex<HashMap<String, VecDeque<DocumentState>>>,
    uploads: Mutex<Vec<Vec<u8>>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl FakeAiService {
    fn new(states: Vec<DocumentState>, replies: Vec<Option<&str>>) -> Self {
        Self {
            states,
            fail_upload: false,
            break_dir: None,
            replies: Mutex::new(replies.into_iter().map(|r| r.map(str::to_string)).collect()),
            pending: Mutex::new(HashMap::new()),
            uploads: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn ready(replies: Vec<Option<&str>>) -> Self {
        Self::new(vec![DocumentState::Processing, DocumentState::Ready], replies)
    }
}

#[async_trait]
impl AiService for FakeAiService {
    async fn upload_document(&self, path: &Path, mime_type: &str) -> AppResult<JobHandle> {
        if self.fail_upload {
            return Err(AppError::upload(path.display().to_string(), "connection refused"));
        }

        let bytes = std::fs::read(path).map_err(|e| AppError::upload(path.display().to_string(), e))?;
        let mut uploads = self.uploads.lock().unwrap();
        uploads.push(bytes);

        let name = format!("files/{}", uploads.len());
        self.pending
            .lock()
            .unwrap()
            .insert(name.clone(), self.states.iter().copied().collect());

        Ok(JobHandle {
            uri: format!("mem://{}", name),
            name,
            mime_type: mime_type.to_string(),
            display_name: None,
        })
    }

    async fn document_state(&self, handle: &JobHandle) -> AppResult<DocumentState> {
        let mut pending = self.pending.lock().unwrap();
        let queue = pending
            .get_mut(&handle.name)
            .ok_or_else(|| AppError::processing(&handle.name, "unknown file"))?;
        Ok(if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            *queue.front().unwrap()
        })
    }

    async fn generate(&self, request: &GenerationRequest) -> AppResult<String> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(dir) = &self.break_dir {
            std::fs::remove_dir_all(dir).unwrap();
            std::fs::write(dir, b"not a directory").unwrap();
        }
        match self.replies.lock().unwrap().pop_front() {
            Some(Some(text)) => Ok(text),
            Some(None) => Err(AppError::generation("fake", "quota exceeded")),
            None => Ok("Step 1: read the brief.".to_string()),
        }
    }

    fn model_name(&self) -> &str {
        "fake"
    }
}

fn orchestrator_at(dir: &Path, service: Arc<FakeAiService>, poll_timeout_secs: u64) -> Orchestrator {
    let config = Config {
        gemini_api_key: "test".to_string(),
        projects_dir: dir.to_path_buf(),
        poll_interval_secs: 2,
        poll_timeout_secs,
        ..Config::default()
    };
    Orchestrator::with_service(&config, service).unwrap()
}

fn setup(service: FakeAiService) -> (TempDir, Arc<FakeAiService>, Orchestrator) {
    let dir = tempfile::tempdir().unwrap();
    let service = Arc::new(service);
    let orchestrator = orchestrator_at(dir.path(), service.clone(), 30);
    (dir, service, orchestrator)
}

fn file_names(dir: &TempDir) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

#[tokio::test(start_paused = true)]
async fn test_ingest_creates_in_progress_project() {
    let (dir, service, orchestrator) = setup(FakeAiService::ready(vec![Some(BRIEF)]));

    let record = orchestrator
        .ingest_brief("Essay1", b"%PDF brief", "brief.pdf")
        .await
        .unwrap();
    assert_eq!(record.brief_content, BRIEF);

    let loaded = orchestrator.load_project("Essay1").unwrap();
    assert_eq!(loaded, record);
    assert_eq!(loaded.status, ProjectStatus::InProgress);
    assert!(loaded.submissions.is_empty());
    assert_eq!(loaded.original_file, "brief.pdf");

    // 上传的是原始字节，暂存文件用完即删
    assert_eq!(service.uploads.lock().unwrap()[0], b"%PDF brief");
    assert_eq!(file_names(&dir), vec!["Essay1.json", "projects_list.txt"]);
    assert_eq!(orchestrator.list_projects().unwrap(), vec!["Essay1".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_ingest_failure_persists_nothing() {
    let (dir, _service, orchestrator) = setup(FakeAiService::ready(vec![None]));

    let result = orchestrator.ingest_brief("Essay1", b"%PDF", "brief.pdf").await;
    assert!(matches!(result, Err(AppError::Generation { .. })));

    assert!(matches!(orchestrator.load_project("Essay1"), Err(AppError::NotFound { .. })));
    assert!(orchestrator.list_projects().unwrap().is_empty());
    assert!(file_names(&dir).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_ingest_processing_failure_persists_nothing() {
    let (_dir, _service, orchestrator) = setup(FakeAiService::new(
        vec![DocumentState::Processing, DocumentState::Failed],
        vec![Some(BRIEF)],
    ));

    let result = orchestrator.ingest_brief("Essay1", b"%PDF", "brief.pdf").await;
    assert!(matches!(result, Err(AppError::Processing { .. })));
    assert!(orchestrator.list_projects().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_ingest_upload_failure() {
    let mut service = FakeAiService::ready(vec![Some(BRIEF)]);
    service.fail_upload = true;
    let (_dir, service, orchestrator) = setup(service);

    let result = orchestrator.ingest_brief("Essay1", b"%PDF", "brief.pdf").await;
    assert!(matches!(result, Err(AppError::Upload { .. })));
    assert!(service.requests.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_submit_evaluates_against_brief() {
    let (_dir, service, orchestrator) = setup(FakeAiService::ready(vec![Some(BRIEF), Some(EVALUATION)]));
    orchestrator.ingest_brief("Essay1", b"%PDF", "brief.pdf").await.unwrap();

    let result = orchestrator
        .submit_for_evaluation("Essay1", b"%PDF essay", Some("final draft".to_string()))
        .await
        .unwrap();

    assert!(result.is_evaluated());
    assert!(result.failure().is_none());
    assert_eq!(result.evaluation(), Some(EVALUATION));

    let record = orchestrator.load_project("Essay1").unwrap();
    assert_eq!(record.status, ProjectStatus::Evaluated);
    assert_eq!(record.submissions.len(), 1);

    let submission = &record.submissions[0];
    assert_eq!(submission.evaluation.as_deref(), Some(EVALUATION));
    // 提交时间与文件名中的时间戳一致
    let stamp = submission.date.format("%Y%m%d_%H%M%S").to_string();
    assert!(submission.file_path.contains(&format!("Essay1_{}_", stamp)));
    assert_eq!(submission.status, SubmissionStatus::Evaluated);
    assert_eq!(submission.comments.as_deref(), Some("final draft"));
    assert_eq!(std::fs::read(&submission.file_path).unwrap(), b"%PDF essay");

    // 评估请求嵌入了项目中保存的计划
    let requests = service.requests.lock().unwrap();
    assert!(requests[1].instruction.contains(BRIEF));
}

#[tokio::test(start_paused = true)]
async fn test_processing_failure_keeps_submission() {
    let (dir, service, orchestrator) = setup(FakeAiService::ready(vec![Some(BRIEF)]));
    orchestrator.ingest_brief("Essay1", b"%PDF", "brief.pdf").await.unwrap();

    // 之后上传的文档都处理失败
    let failing_service = Arc::new(FakeAiService::new(
        vec![DocumentState::Processing, DocumentState::Failed],
        vec![],
    ));
    let failing = orchestrator_at(dir.path(), failing_service.clone(), 30);

    let result = failing
        .submit_for_evaluation("Essay1", b"%PDF essay", None)
        .await
        .unwrap();

    match &result {
        SubmissionResult::SavedWithoutEvaluation { reason, .. } => {
            assert!(matches!(reason, AppError::Processing { .. }));
        }
        other => panic!("应为 SavedWithoutEvaluation，实际为 {:?}", other),
    }

    let record = orchestrator.load_project("Essay1").unwrap();
    assert_eq!(record.status, ProjectStatus::Submitted);
    assert_eq!(record.submissions.len(), 1);
    assert!(record.submissions[0].evaluation.is_none());
    assert!(record.submissions[0].grade.is_none());
    assert!(Path::new(&record.submissions[0].file_path).exists());

    // 处理失败后不会再发起生成请求
    assert_eq!(service.requests.lock().unwrap().len(), 1);
    assert!(failing_service.requests.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_generation_failure_keeps_submission() {
    let (_dir, _service, orchestrator) = setup(FakeAiService::ready(vec![Some(BRIEF), None]));
    orchestrator.ingest_brief("Essay1", b"%PDF", "brief.pdf").await.unwrap();

    let result = orchestrator
        .submit_for_evaluation("Essay1", b"%PDF essay", None)
        .await
        .unwrap();

    assert!(!result.is_evaluated());
    assert!(matches!(result.failure(), Some(AppError::Generation { .. })));
    assert_eq!(result.record().status, ProjectStatus::Submitted);
    assert_eq!(result.submission().unwrap().status, SubmissionStatus::Submitted);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_ingest_persists_nothing() {
    let (_dir, _service, orchestrator) = setup(FakeAiService::new(
        vec![DocumentState::Processing],
        vec![Some(BRIEF)],
    ));

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        trigger.cancel();
    });

    let result = orchestrator
        .ingest_brief_cancellable("Essay1", b"%PDF", "brief.pdf", cancel)
        .await;
    assert!(matches!(result, Err(AppError::Cancelled)));
    assert!(orchestrator.list_projects().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_evaluation_keeps_submission() {
    let (dir, _service, orchestrator) = setup(FakeAiService::ready(vec![Some(BRIEF)]));
    orchestrator.ingest_brief("Essay1", b"%PDF", "brief.pdf").await.unwrap();

    let stuck = orchestrator_at(
        dir.path(),
        Arc::new(FakeAiService::new(vec![DocumentState::Processing], vec![])),
        0,
    );
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = stuck
        .submit_for_evaluation_cancellable("Essay1", b"%PDF essay", None, cancel)
        .await
        .unwrap();

    assert!(matches!(result.failure(), Some(AppError::Cancelled)));
    let record = orchestrator.load_project("Essay1").unwrap();
    assert_eq!(record.status, ProjectStatus::Submitted);
    assert_eq!(record.submissions.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_degrades_submission() {
    let (dir, _service, orchestrator) = setup(FakeAiService::ready(vec![Some(BRIEF)]));
    orchestrator.ingest_brief("Essay1", b"%PDF", "brief.pdf").await.unwrap();

    let stuck = orchestrator_at(
        dir.path(),
        Arc::new(FakeAiService::new(vec![DocumentState::Processing], vec![])),
        10,
    );

    let result = stuck
        .submit_for_evaluation("Essay1", b"%PDF essay", None)
        .await
        .unwrap();

    assert!(matches!(result.failure(), Some(AppError::Timeout { .. })));
    assert_eq!(orchestrator.load_project("Essay1").unwrap().status, ProjectStatus::Submitted);
}

#[tokio::test(start_paused = true)]
async fn test_ingest_surfaces_persistence_failure() {
    let dir = tempfile::tempdir().unwrap();
    let projects = dir.path().join("projects");

    let mut service = FakeAiService::ready(vec![Some(BRIEF)]);
    service.break_dir = Some(projects.clone());
    let orchestrator = orchestrator_at(&projects, Arc::new(service), 30);

    let result = orchestrator.ingest_brief("Essay1", b"%PDF", "brief.pdf").await;
    assert!(matches!(result, Err(AppError::Persistence { .. })), "实际为 {:?}", result);
}

#[tokio::test(start_paused = true)]
async fn test_submit_surfaces_persistence_failure() {
    let dir = tempfile::tempdir().unwrap();
    let projects = dir.path().join("projects");

    let healthy = orchestrator_at(&projects, Arc::new(FakeAiService::ready(vec![Some(BRIEF)])), 30);
    healthy.ingest_brief("Essay1", b"%PDF", "brief.pdf").await.unwrap();

    // 评估本身失败时提交本应降级保存，但存储不可写必须原样返回
    let mut service = FakeAiService::ready(vec![None]);
    service.break_dir = Some(projects.clone());
    let broken = orchestrator_at(&projects, Arc::new(service), 30);

    let result = broken.submit_for_evaluation("Essay1", b"%PDF essay", None).await;
    match result {
        Err(AppError::Persistence { .. }) => {}
        other => panic!("应为 Persistence 错误，实际为 {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_submit_to_missing_project() {
    let (dir, service, orchestrator) = setup(FakeAiService::ready(vec![]));

    let result = orchestrator.submit_for_evaluation("NoSuchProject", b"%PDF", None).await;
    match result {
        Err(e @ AppError::NotFound { .. }) => assert!(e.is_user_error()),
        other => panic!("应为 NotFound，实际为 {:?}", other),
    }

    assert!(file_names(&dir).is_empty());
    assert!(service.uploads.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_submissions_are_append_only() {
    let (_dir, _service, orchestrator) = setup(FakeAiService::ready(vec![
        Some(BRIEF),
        Some(EVALUATION),
        None,
        Some("Grade: A-. Excellent."),
    ]));
    orchestrator.ingest_brief("Essay1", b"%PDF", "brief.pdf").await.unwrap();

    let mut previous = Vec::new();
    let mut statuses = Vec::new();
    for attempt in 0..3 {
        let bytes = format!("%PDF attempt {}", attempt);
        let result = orchestrator
            .submit_for_evaluation("Essay1", bytes.as_bytes(), None)
            .await
            .unwrap();

        let record = result.record();
        assert_eq!(record.submissions.len(), previous.len() + 1);
        assert_eq!(&record.submissions[..previous.len()], &previous[..]);
        previous = record.submissions.clone();
        statuses.push(record.status);
    }

    assert_eq!(
        statuses,
        vec![ProjectStatus::Evaluated, ProjectStatus::Submitted, ProjectStatus::Evaluated]
    );

    // 同一秒内的多次提交也不会覆盖彼此的文件
    let mut paths: Vec<_> = previous.iter().map(|s| s.file_path.clone()).collect();
    paths.sort();
    paths.dedup();
    assert_eq!(paths.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_reingest_resets_project() {
    let (_dir, _service, orchestrator) = setup(FakeAiService::ready(vec![
        Some(BRIEF),
        Some(EVALUATION),
        Some("A brand new plan."),
    ]));
    orchestrator.ingest_brief("Essay1", b"%PDF", "brief.pdf").await.unwrap();
    orchestrator
        .submit_for_evaluation("Essay1", b"%PDF essay", None)
        .await
        .unwrap();

    let record = orchestrator
        .ingest_brief("Essay1", b"%PDF v2", "brief_v2.pdf")
        .await
        .unwrap();

    assert_eq!(record.brief_content, "A brand new plan.");
    assert_eq!(record.original_file, "brief_v2.pdf");
    assert_eq!(record.status, ProjectStatus::InProgress);
    assert!(orchestrator.load_project("Essay1").unwrap().submissions.is_empty());
    assert_eq!(orchestrator.list_projects().unwrap(), vec!["Essay1".to_string()]);
}

#[tokio::test]
async fn test_load_missing_project_is_not_found() {
    let (_dir, _service, orchestrator) = setup(FakeAiService::ready(vec![]));
    let result = orchestrator.load_project("NoSuchProject");
    assert!(matches!(result, Err(AppError::NotFound { ref name }) if name == "NoSuchProject"));
}

#[tokio::test]
async fn test_reset_active_project_keeps_records() {
    let (_dir, _service, orchestrator) = setup(FakeAiService::ready(vec![Some(BRIEF)]));
    orchestrator.ingest_brief("Essay1", b"%PDF", "brief.pdf").await.unwrap();

    let mut session = Session::new();
    session.select_project("Essay1");
    orchestrator.reset_active_project(&mut session);

    assert_eq!(session.active_project(), DEFAULT_PROJECT_NAME);
    assert!(orchestrator.load_project("Essay1").is_ok());
}
