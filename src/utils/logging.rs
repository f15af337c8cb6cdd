/// 日志工具模块
///
/// 初始化 tracing 订阅器，并提供启动和结束时的日志辅助函数
use crate::models::QueryWindow;
use crate::orchestrator::RunOutcome;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// 日志选项
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// 日志文件目录
    pub log_dir: PathBuf,
    /// 默认过滤级别（RUST_LOG 优先）
    pub default_filter: String,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
            default_filter: "info".to_string(),
        }
    }
}

impl LogOptions {
    /// 从环境变量读取：`OCR_LOG_DIR`
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            log_dir: std::env::var("OCR_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.log_dir),
            default_filter: default.default_filter,
        }
    }
}

/// 本次运行的日志文件名
pub fn log_file_name(now: chrono::DateTime<chrono::Local>) -> String {
    format!("ocr-processor-{}.log", now.format("%Y-%m-%d-%H-%M-%S"))
}

/// 初始化日志
///
/// 同时输出到标准输出和 `log_dir` 下按启动时间命名的文件。
/// 日志目录无法创建时只输出到标准输出。
///
/// # 返回
/// 返回日志文件路径（如果有）
pub fn init(options: &LogOptions) -> Result<Option<PathBuf>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&options.default_filter))
        .context("无法解析日志过滤规则")?;

    match open_log_file(&options.log_dir) {
        Ok((path, file)) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(Mutex::new(file))
                        .with_ansi(false),
                )
                .try_init()
                .context("日志订阅器已初始化")?;
            Ok(Some(path))
        }
        Err(e) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .try_init()
                .context("日志订阅器已初始化")?;
            warn!("⚠️ 无法创建日志文件，仅输出到控制台: {:#}", e);
            Ok(None)
        }
    }
}

fn open_log_file(dir: &Path) -> Result<(PathBuf, fs::File)> {
    fs::create_dir_all(dir).with_context(|| format!("无法创建日志目录: {}", dir.display()))?;
    let path = dir.join(log_file_name(chrono::Local::now()));
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("无法打开日志文件: {}", path.display()))?;
    Ok((path, file))
}

/// 记录程序启动信息
pub fn log_startup(config_path: &Path, window: QueryWindow) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - OCR 文档处理");
    info!("📄 配置文件: {}", config_path.display());
    info!("🕒 查询窗口: {}", window);
    info!("{}", "=".repeat(60));
}

/// 记录运行结束信息
pub fn log_run_finished(outcome: &RunOutcome, shutdown_reason: Option<&str>) {
    info!("\n{}", "=".repeat(60));
    info!("📊 运行结束: {:?}", outcome);
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    if let Some(reason) = shutdown_reason {
        info!("🛑 关闭原因: {}", reason);
    }
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大字符数
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
