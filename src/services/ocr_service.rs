//! OCR 处理服务 - 业务能力层
//!
//! 查询候选文档 → 下载内容 → OCR → 推送搜索代理。
//! 编排层只看到 `QueryError` 的几种结果，不关心内部步骤。

use crate::clients::{OcrClient, RepositorySession, SolrProxyClient};
use crate::config::{HttpSettings, OcrSettings};
use crate::error::{AppResult, QueryError, ServiceError};
use crate::models::{DocumentRef, IndexDocument, ProcessSummary, QueryWindow};
use crate::utils::logging::truncate_text;
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// 文档获取 / OCR / 索引能力
#[async_trait]
pub trait DocumentProcessor: Send {
    /// 写入运行时配置（端点、凭据）
    fn configure(&mut self, settings: &OcrSettings);

    /// 处理窗口内修改过的所有文档
    async fn process_recent(&mut self, window: QueryWindow) -> AppResult<ProcessSummary>;
}

/// 已配置的下游客户端
struct PipelineClients {
    ocr: OcrClient,
    solr_proxy: SolrProxyClient,
    mime_type: String,
    page_size: u32,
    text_output_dir: Option<PathBuf>,
}

/// 基于 CMIS 会话的 OCR 流水线
pub struct OcrPipeline {
    session: RepositorySession,
    http: reqwest::Client,
    clients: Option<PipelineClients>,
}

impl OcrPipeline {
    /// 创建流水线，OCR 和搜索代理共用一个带超时的 HTTP 客户端
    pub fn new(session: RepositorySession, http: &HttpSettings) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(http.connect_timeout())
            .timeout(http.request_timeout())
            .build()
            .map_err(|e| QueryError::Unclassified(format!("无法创建 HTTP 客户端: {}", e)))?;

        Ok(Self {
            session,
            http: client,
            clients: None,
        })
    }

    async fn process_document(
        &self,
        clients: &PipelineClients,
        document: &DocumentRef,
    ) -> AppResult<bool> {
        let content = self
            .session
            .fetch_content(document)
            .await
            .map_err(|e| QueryError::fetch_failed(&document.object_id, e))?;

        let mime_type = document.mime_type.as_deref().unwrap_or(&clients.mime_type);
        let text = clients
            .ocr
            .extract_text(content, &document.name, mime_type)
            .await
            .map_err(|e| QueryError::fetch_failed(&document.object_id, e))?;

        if text.trim().is_empty() {
            warn!("⚠️ OCR 结果为空，跳过: {}", document.name);
            return Ok(false);
        }
        debug!("OCR 预览 [{}]: {}", document.name, truncate_text(&text, 80));

        if let Some(dir) = &clients.text_output_dir {
            write_text_file(dir, document, &text).await?;
        }

        let index_doc = IndexDocument::new(document, self.session.repository_id(), text);
        clients
            .solr_proxy
            .index(&index_doc)
            .await
            .map_err(|e| classify_proxy_error(&clients.solr_proxy.index_url(), e))?;

        Ok(true)
    }
}

#[async_trait]
impl DocumentProcessor for OcrPipeline {
    fn configure(&mut self, settings: &OcrSettings) {
        self.clients = Some(PipelineClients {
            ocr: OcrClient::new(self.http.clone(), settings.endpoint.clone()),
            solr_proxy: SolrProxyClient::new(
                self.http.clone(),
                &settings.solr_proxy_url,
                settings.solr_proxy_token.clone(),
            ),
            mime_type: settings.mime_type.clone(),
            page_size: settings.page_size,
            text_output_dir: settings.text_output_dir.as_ref().map(PathBuf::from),
        });
        info!("✓ OCR 配置完成");
    }

    async fn process_recent(&mut self, window: QueryWindow) -> AppResult<ProcessSummary> {
        let clients = self
            .clients
            .as_ref()
            .ok_or_else(|| QueryError::Unclassified("OCR 流水线尚未配置".to_string()))?;

        let since = window.since(Utc::now());
        info!("🔍 查询 {} 修改过的文档 (起点 {})", window, since.to_rfc3339());

        let documents = self
            .session
            .query_documents_modified_since(since, &clients.mime_type, clients.page_size)
            .await
            .map_err(|e| QueryError::fetch_failed("cmis:query", e))?;

        let mut summary = ProcessSummary {
            candidates: documents.len(),
            ..Default::default()
        };
        info!("✓ 找到 {} 个待 OCR 的文档", summary.candidates);

        for (idx, document) in documents.iter().enumerate() {
            info!(
                "[文档 {}/{}] 📄 {}",
                idx + 1,
                summary.candidates,
                document.name
            );
            if self.process_document(clients, document).await? {
                summary.indexed += 1;
            } else {
                summary.skipped_empty += 1;
            }
        }

        Ok(summary)
    }
}

/// 搜索代理错误分类：不可达可重试，其余未归类
fn classify_proxy_error(endpoint: &str, err: ServiceError) -> QueryError {
    if err.is_unavailable() {
        QueryError::proxy_unavailable(endpoint, err)
    } else {
        QueryError::Unclassified(err.to_string())
    }
}

/// 文件名中不允许的字符替换为下划线
fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | ';' => '_',
            c => c,
        })
        .collect()
}

async fn write_text_file(dir: &Path, document: &DocumentRef, text: &str) -> AppResult<()> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(format!("{}.txt", sanitize_file_name(&document.object_id)));
    tokio::fs::write(&path, text).await?;
    debug!("识别结果已保存: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::SessionParameters;
    use crate::error::FailureCategory;
    use crate::models::RepositoryDescriptor;

    /// 指向无人监听端口的流水线
    fn unreachable_pipeline() -> OcrPipeline {
        let mut params = SessionParameters::new();
        params.set_basic_authentication("admin", "admin");
        params.set_browser_binding_url("http://127.0.0.1:1/browser");
        let descriptor = RepositoryDescriptor {
            repository_id: "repo".to_string(),
            repository_name: "Repo".to_string(),
            repository_url: None,
            root_folder_url: None,
        };
        let session =
            RepositorySession::from_descriptor(reqwest::Client::new(), &params, &descriptor);
        OcrPipeline::new(session, &HttpSettings::default()).unwrap()
    }

    fn unreachable_settings() -> OcrSettings {
        OcrSettings {
            endpoint: "http://127.0.0.1:1/extract".to_string(),
            solr_proxy_url: "http://127.0.0.1:1".to_string(),
            solr_proxy_token: None,
            mime_type: "application/pdf".to_string(),
            page_size: 100,
            text_output_dir: None,
        }
    }

    #[tokio::test]
    async fn test_unconfigured_pipeline_is_unclassified() {
        let mut pipeline = unreachable_pipeline();
        let err = pipeline.process_recent(QueryWindow::days(1)).await.unwrap_err();
        assert_eq!(err.category(), FailureCategory::Unclassified);
    }

    #[tokio::test]
    async fn test_unreachable_repository_is_fetch_failure() {
        let mut pipeline = unreachable_pipeline();
        pipeline.configure(&unreachable_settings());
        let err = pipeline.process_recent(QueryWindow::days(1)).await.unwrap_err();
        match err {
            QueryError::DocumentFetchFailed { document, .. } => {
                assert_eq!(document, "cmis:query")
            }
            other => panic!("仓库不可达应为文档获取失败: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_refused_proxy_maps_to_proxy_unavailable() {
        let proxy = SolrProxyClient::new(reqwest::Client::new(), "http://127.0.0.1:1", None);
        let document = DocumentRef {
            object_id: "abc;1.0".to_string(),
            name: "scan.pdf".to_string(),
            mime_type: None,
            last_modified: None,
        };
        let index_doc = IndexDocument::new(&document, "repo", "LOT 42".to_string());

        let service_err = proxy.index(&index_doc).await.unwrap_err();
        let err = classify_proxy_error(&proxy.index_url(), service_err);
        assert_eq!(err.category(), FailureCategory::SearchProxyUnavailable);
    }

    #[test]
    fn test_proxy_unavailable_is_retryable_category() {
        let err = classify_proxy_error(
            "http://proxy/index",
            ServiceError::from_status("http://proxy/index", 503),
        );
        assert_eq!(err.category(), FailureCategory::SearchProxyUnavailable);
    }

    #[test]
    fn test_proxy_rejection_is_unclassified() {
        let err = classify_proxy_error(
            "http://proxy/index",
            ServiceError::from_status("http://proxy/index", 400),
        );
        assert_eq!(err.category(), FailureCategory::Unclassified);
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(
            sanitize_file_name("workspace://SpacesStore/abc;1.0"),
            "workspace___SpacesStore_abc_1.0"
        );
    }

    #[tokio::test]
    async fn test_write_text_file() {
        let dir = tempfile::tempdir().unwrap();
        let document = DocumentRef {
            object_id: "abc;1.0".to_string(),
            name: "scan.pdf".to_string(),
            mime_type: None,
            last_modified: None,
        };
        tokio_test::assert_ok!(write_text_file(dir.path(), &document, "LOT 42").await);
        let saved = std::fs::read_to_string(dir.path().join("abc_1.0.txt")).unwrap();
        assert_eq!(saved, "LOT 42");
    }
}
