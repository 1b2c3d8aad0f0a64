use std::path::PathBuf;

use anyhow::{Context, Result};
use assignment_evaluator::services::{render_evaluation_report, report_file_name};
use assignment_evaluator::utils::logging;
use assignment_evaluator::{Config, Orchestrator, ProgressEvent, ProgressReporter, ProjectRecord, SubmissionResult};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "assignment-evaluator", about = "作业助手：生成完成计划并评估提交")]
struct Cli {
    /// TOML 配置文件路径（不指定时只读取环境变量）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 导入作业说明并生成完成计划
    Ingest { name: String, file: PathBuf },
    /// 列出所有项目
    List,
    /// 显示项目详情和提交历史
    Show { name: String },
    /// 提交作业并评估
    Submit {
        name: String,
        file: PathBuf,
        #[arg(long)]
        comments: Option<String>,
    },
    /// 导出评估报告（Markdown）
    Report {
        name: String,
        /// 提交序号（从 1 开始），默认最后一次
        #[arg(long)]
        index: Option<usize>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let config = match &cli.config {
        Some(path) => Config::from_toml_file(path)?,
        None => Config::from_env(),
    };

    // 初始化日志
    logging::init(config.verbose_logging);

    let (tx, rx) = mpsc::unbounded_channel();
    let progress_task = tokio::spawn(render_progress(rx));
    let orchestrator = Orchestrator::initialize(&config)?.with_progress(ProgressReporter::new(tx));

    let result = run(&orchestrator, cli.command).await;

    // 关闭发送端，让进度任务结束
    drop(orchestrator);
    let _ = progress_task.await;

    result
}

async fn run(orchestrator: &Orchestrator, command: Command) -> Result<()> {
    match command {
        Command::Ingest { name, file } => {
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("无法读取文件: {}", file.display()))?;
            let file_name = file
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| file.display().to_string());

            let record = orchestrator.ingest_brief(&name, &bytes, &file_name).await?;
            info!("✅ 项目 {} 已保存", record.name);
            println!("{}", record.brief_content);
        }
        Command::List => {
            let names = orchestrator.list_projects()?;
            if names.is_empty() {
                println!("还没有保存的项目");
            }
            for name in names {
                println!("{}", name);
            }
        }
        Command::Show { name } => {
            let record = orchestrator.load_project(&name)?;
            print_project(&record);
        }
        Command::Submit { name, file, comments } => {
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("无法读取文件: {}", file.display()))?;

            let result = orchestrator.submit_for_evaluation(&name, &bytes, comments).await?;
            match &result {
                SubmissionResult::Evaluated { .. } => {
                    info!("✅ 作业已提交并完成评估");
                    println!("{}", result.evaluation().unwrap_or_default());
                }
                SubmissionResult::SavedWithoutEvaluation { reason, .. } => {
                    warn!("⚠️ 作业已保存，但评估失败: {}", reason);
                    println!("提交已保存，但未能完成评估: {}", reason);
                }
            }
        }
        Command::Report { name, index, output } => {
            let record = orchestrator.load_project(&name)?;
            let submission = match index {
                Some(i) => i.checked_sub(1).and_then(|i| record.submissions.get(i)),
                None => record.latest_submission(),
            }
            .with_context(|| format!("项目 {} 没有对应的提交", name))?;

            let report = render_evaluation_report(&record.name, submission)
                .with_context(|| "该提交没有评估结果")?;
            let output = output.unwrap_or_else(|| PathBuf::from(report_file_name(&record.name)));
            tokio::fs::write(&output, report)
                .await
                .with_context(|| format!("无法写入报告: {}", output.display()))?;
            info!("✓ 报告已保存至: {}", output.display());
        }
    }

    Ok(())
}

async fn render_progress(mut rx: mpsc::UnboundedReceiver<ProgressEvent>) {
    while let Some(event) = rx.recv().await {
        match &event {
            ProgressEvent::Uploading { file_name } => info!("📤 上传中: {}", file_name),
            ProgressEvent::Processing { .. } => {
                let percent = event.fraction().unwrap_or_default() * 100.0;
                info!("⏳ 文档处理进度: {:.0}%", percent);
            }
            ProgressEvent::Generating => info!("🤖 生成中..."),
            ProgressEvent::Saving => info!("💾 保存中..."),
        }
    }
}

fn print_project(record: &ProjectRecord) {
    println!("项目名称: {}", record.name);
    println!("状态: {}", record.status);
    println!("创建时间: {}", record.created_date.format("%Y-%m-%d %H:%M"));
    println!("原始文件: {}", record.original_file);
    println!("\n{}\n{}\n", "=".repeat(60), record.brief_content);

    for (idx, submission) in record.submissions.iter().enumerate() {
        println!("{}", "─".repeat(60));
        println!("提交 #{}", idx + 1);
        println!("日期: {}", submission.date.format("%Y-%m-%d %H:%M"));
        println!("文件: {}", submission.file_path);
        if let Some(comments) = &submission.comments {
            println!("备注: {}", comments);
        }
        if let Some(grade) = &submission.grade {
            println!("成绩: {}", grade);
        }
        if submission.evaluation.is_none() {
            println!("(未评估)");
        }
    }
}
