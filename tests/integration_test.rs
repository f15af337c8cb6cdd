use async_trait::async_trait;
use ocr_processor::clients::{RepositorySession, SessionFactory, SessionParameters};
use ocr_processor::config::OcrSettings;
use ocr_processor::models::{ProcessSummary, QueryWindow, RepositoryDescriptor};
use ocr_processor::{App, AppResult, DocumentProcessor, QueryError, RepositoryError, RunOutcome};
use std::collections::VecDeque;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

const CONFIG: &str = r#"
[repository]
url = "http://cmis.test/alfresco/api/-default-/public/cmis/versions/1.1/browser"
username = "ocr"
password = "ocr"

[ocr]
endpoint = "http://ocr.test/extract"
solr_proxy_url = "http://solr-proxy.test"

[retry]
base_delay_ms = 0
"#;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("创建临时配置文件失败");
    file.write_all(content.as_bytes()).expect("写入配置失败");
    file
}

/// 前 `failures` 次列出仓库失败的假工厂
struct FakeFactory {
    failures: usize,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl SessionFactory for FakeFactory {
    async fn get_repositories(
        &self,
        _params: &SessionParameters,
    ) -> Result<Vec<RepositoryDescriptor>, RepositoryError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(RepositoryError::BadStatus {
                endpoint: "http://cmis.test".to_string(),
                status: 503,
            });
        }
        Ok(vec![RepositoryDescriptor {
            repository_id: "-default-".to_string(),
            repository_name: "Main Repository".to_string(),
            repository_url: None,
            root_folder_url: None,
        }])
    }

    async fn create_session(
        &self,
        params: &SessionParameters,
    ) -> Result<RepositorySession, RepositoryError> {
        Ok(RepositorySession::from_descriptor(
            reqwest::Client::new(),
            params,
            &RepositoryDescriptor {
                repository_id: params.repository_id().unwrap_or_default().to_string(),
                repository_name: "Main Repository".to_string(),
                repository_url: None,
                root_folder_url: None,
            },
        ))
    }
}

/// 记录调用次数并按脚本返回的假流水线
struct FakeProcessor {
    script: VecDeque<AppResult<ProcessSummary>>,
    calls: Arc<AtomicUsize>,
    windows: Arc<Mutex<Vec<QueryWindow>>>,
}

#[async_trait]
impl DocumentProcessor for FakeProcessor {
    fn configure(&mut self, _settings: &OcrSettings) {}

    async fn process_recent(&mut self, window: QueryWindow) -> AppResult<ProcessSummary> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.windows.lock().unwrap().push(window);
        self.script
            .pop_front()
            .unwrap_or_else(|| Ok(ProcessSummary::default()))
    }
}

struct Harness {
    factory_calls: Arc<AtomicUsize>,
    processor_calls: Arc<AtomicUsize>,
    processors_built: Arc<AtomicUsize>,
    windows: Arc<Mutex<Vec<QueryWindow>>>,
}

impl Harness {
    fn new() -> Self {
        Self {
            factory_calls: Arc::new(AtomicUsize::new(0)),
            processor_calls: Arc::new(AtomicUsize::new(0)),
            processors_built: Arc::new(AtomicUsize::new(0)),
            windows: Arc::new(Mutex::new(Vec::new())),
        }
    }

    async fn run(
        &self,
        app: &App,
        config_path: &std::path::Path,
        session_failures: usize,
        script: Vec<AppResult<ProcessSummary>>,
    ) -> RunOutcome {
        let factory_calls = self.factory_calls.clone();
        let processor_calls = self.processor_calls.clone();
        let processors_built = self.processors_built.clone();
        let windows = self.windows.clone();

        app.run_with(
            config_path,
            move |_config| {
                Ok(FakeFactory {
                    failures: session_failures,
                    calls: factory_calls,
                })
            },
            move |_session, _config| {
                processors_built.fetch_add(1, Ordering::SeqCst);
                Ok(FakeProcessor {
                    script: script.into(),
                    calls: processor_calls,
                    windows,
                })
            },
        )
        .await
    }
}

fn proxy_down() -> AppResult<ProcessSummary> {
    Err(QueryError::proxy_unavailable("http://solr-proxy.test/index", "connection refused"))
}

#[tokio::test]
async fn test_missing_config_makes_no_network_call() {
    let app = App::new();
    let harness = Harness::new();

    let outcome = harness
        .run(&app, std::path::Path::new("/nonexistent/config.toml"), 0, vec![])
        .await;

    assert_eq!(outcome, RunOutcome::StartupFailed);
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(harness.factory_calls.load(Ordering::SeqCst), 0);
    assert_eq!(harness.processor_calls.load(Ordering::SeqCst), 0);
    assert!(!app.shutdown_signal().is_requested());
}

#[tokio::test]
async fn test_invalid_config_aborts() {
    let app = App::new();
    let harness = Harness::new();
    let config = write_config("[repository]\nurl = \"http://cmis.test\"\n");

    let outcome = harness.run(&app, config.path(), 0, vec![]).await;

    assert_eq!(outcome, RunOutcome::Aborted);
    assert_eq!(outcome.exit_code(), 1);
    assert_eq!(harness.factory_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_session_recovers_on_third_attempt_then_one_cycle() {
    let app = App::new();
    let harness = Harness::new();
    let config = write_config(CONFIG);

    let outcome = harness.run(&app, config.path(), 2, vec![]).await;

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(harness.factory_calls.load(Ordering::SeqCst), 3);
    assert_eq!(harness.processor_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_session_exhausted_never_queries() {
    let app = App::new();
    let harness = Harness::new();
    let config = write_config(CONFIG);

    let outcome = harness.run(&app, config.path(), usize::MAX, vec![]).await;

    assert_eq!(outcome, RunOutcome::SessionExhausted);
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(harness.factory_calls.load(Ordering::SeqCst), 3);
    assert_eq!(harness.processors_built.load(Ordering::SeqCst), 0);
    assert_eq!(harness.processor_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_clean_cycle_uses_one_day_window() {
    let app = App::new();
    let harness = Harness::new();
    let config = write_config(CONFIG);

    let outcome = harness.run(&app, config.path(), 0, vec![]).await;

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(harness.processor_calls.load(Ordering::SeqCst), 1);
    assert_eq!(*harness.windows.lock().unwrap(), vec![QueryWindow::days(1)]);
    assert!(!app.shutdown_signal().is_requested());
}

#[tokio::test]
async fn test_proxy_unavailable_three_times_shuts_down() {
    let app = App::new();
    let harness = Harness::new();
    let config = write_config(CONFIG);

    let outcome = harness
        .run(
            &app,
            config.path(),
            0,
            vec![proxy_down(), proxy_down(), proxy_down(), Ok(ProcessSummary::default())],
        )
        .await;

    assert_eq!(outcome, RunOutcome::ShutdownRequested);
    assert_eq!(harness.processor_calls.load(Ordering::SeqCst), 3);
    assert!(app.shutdown_signal().is_requested());
}

#[tokio::test]
async fn test_proxy_recovers_without_shutdown() {
    let app = App::new();
    let harness = Harness::new();
    let config = write_config(CONFIG);

    let outcome = harness
        .run(&app, config.path(), 0, vec![proxy_down(), proxy_down()])
        .await;

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(harness.processor_calls.load(Ordering::SeqCst), 3);
    assert!(!app.shutdown_signal().is_requested());
}

#[tokio::test]
async fn test_document_fetch_failure_shuts_down_immediately() {
    let app = App::new();
    let harness = Harness::new();
    let config = write_config(CONFIG);

    let outcome = harness
        .run(
            &app,
            config.path(),
            0,
            vec![Err(QueryError::fetch_failed("abc;1.0", "HTTP 404"))],
        )
        .await;

    assert_eq!(outcome, RunOutcome::ShutdownRequested);
    assert_eq!(harness.processor_calls.load(Ordering::SeqCst), 1);
    assert!(app
        .shutdown_signal()
        .reason()
        .unwrap()
        .contains("abc;1.0"));
}

#[tokio::test]
async fn test_unclassified_failure_exits_nonzero() {
    let app = App::new();
    let harness = Harness::new();
    let config = write_config(CONFIG);

    let outcome = harness
        .run(
            &app,
            config.path(),
            0,
            vec![Err(QueryError::Unclassified("HTTP 400".to_string()))],
        )
        .await;

    assert_eq!(outcome, RunOutcome::Aborted);
    assert_eq!(outcome.exit_code(), 1);
    assert!(!app.shutdown_signal().is_requested());
}
