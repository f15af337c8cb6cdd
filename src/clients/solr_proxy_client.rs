/// 搜索代理客户端
///
/// 把 OCR 文本推送给搜索索引代理
use crate::error::ServiceError;
use crate::models::IndexDocument;
use tracing::debug;

/// 搜索代理客户端
pub struct SolrProxyClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl SolrProxyClient {
    /// 创建新的搜索代理客户端
    pub fn new(client: reqwest::Client, base_url: &str, token: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// 索引接口地址
    pub fn index_url(&self) -> String {
        format!("{}/index", self.base_url)
    }

    /// 推送一篇文档
    ///
    /// 连接失败、超时和 502/503/504 返回 `ServiceError::Unavailable`。
    pub async fn index(&self, document: &IndexDocument) -> Result<(), ServiceError> {
        let url = self.index_url();
        debug!("推送索引: {} -> {}", document.id, url);

        let mut request = self.client.post(&url).json(document);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ServiceError::from_request(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::from_status(&url, status.as_u16()));
        }
        Ok(())
    }
}
