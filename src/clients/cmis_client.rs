//! CMIS 客户端
//!
//! 通过 CMIS 1.1 browser binding 访问内容仓库：列出仓库、建立会话、
//! 查询最近修改的文档、下载文档内容。

use crate::config::HttpSettings;
use crate::error::RepositoryError;
use crate::models::{DocumentRef, RepositoryDescriptor};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};
use tracing::debug;

/// 会话参数
#[derive(Clone, Default)]
pub struct SessionParameters {
    binding_url: Option<String>,
    username: String,
    password: String,
    repository_id: Option<String>,
}

impl SessionParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_basic_authentication(
        &mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) {
        self.username = username.into();
        self.password = password.into();
    }

    pub fn set_browser_binding_url(&mut self, url: impl Into<String>) {
        self.binding_url = Some(url.into().trim_end_matches('/').to_string());
    }

    pub fn set_repository_id(&mut self, repository_id: impl Into<String>) {
        self.repository_id = Some(repository_id.into());
    }

    pub fn binding_url(&self) -> Option<&str> {
        self.binding_url.as_deref()
    }

    pub fn repository_id(&self) -> Option<&str> {
        self.repository_id.as_deref()
    }

    fn require_binding_url(&self) -> Result<&str, RepositoryError> {
        self.binding_url().ok_or_else(|| RepositoryError::Decode {
            endpoint: String::new(),
            reason: "缺少 browser binding 地址".to_string(),
        })
    }
}

impl std::fmt::Debug for SessionParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionParameters")
            .field("binding_url", &self.binding_url)
            .field("username", &self.username)
            .field("repository_id", &self.repository_id)
            .finish()
    }
}

/// 仓库会话工厂
///
/// 会话初始化器只依赖这两个操作。
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// 列出端点上的所有仓库
    async fn get_repositories(
        &self,
        params: &SessionParameters,
    ) -> Result<Vec<RepositoryDescriptor>, RepositoryError>;

    /// 对 `params` 中指定的仓库建立会话
    async fn create_session(
        &self,
        params: &SessionParameters,
    ) -> Result<RepositorySession, RepositoryError>;
}

/// 基于 browser binding 的会话工厂
pub struct CmisSessionFactory {
    client: reqwest::Client,
}

impl CmisSessionFactory {
    /// 创建会话工厂，所有请求都带连接超时和请求超时
    pub fn new(http: &HttpSettings) -> Result<Self, RepositoryError> {
        let client = reqwest::Client::builder()
            .connect_timeout(http.connect_timeout())
            .timeout(http.request_timeout())
            .build()
            .map_err(|source| RepositoryError::Request {
                endpoint: "client".to_string(),
                source,
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SessionFactory for CmisSessionFactory {
    async fn get_repositories(
        &self,
        params: &SessionParameters,
    ) -> Result<Vec<RepositoryDescriptor>, RepositoryError> {
        let url = params.require_binding_url()?;
        debug!("获取仓库列表: {}", url);

        let infos: Map<String, JsonValue> =
            get_json(&self.client, params, url, &[]).await?;
        parse_repository_infos(url, infos)
    }

    async fn create_session(
        &self,
        params: &SessionParameters,
    ) -> Result<RepositorySession, RepositoryError> {
        let binding_url = params.require_binding_url()?;
        let repository_id = params.repository_id().ok_or_else(|| RepositoryError::Decode {
            endpoint: binding_url.to_string(),
            reason: "缺少仓库 ID".to_string(),
        })?;

        let info_url = format!("{}/{}", binding_url, repository_id);
        debug!("获取仓库信息: {}", info_url);

        let infos: Map<String, JsonValue> = get_json(
            &self.client,
            params,
            &info_url,
            &[("cmisselector", "repositoryInfo".to_string())],
        )
        .await?;

        let descriptor = parse_repository_infos(&info_url, infos)?
            .into_iter()
            .find(|d| d.repository_id == repository_id)
            .ok_or_else(|| RepositoryError::NoRepository {
                url: info_url.clone(),
            })?;

        Ok(RepositorySession::from_descriptor(
            self.client.clone(),
            params,
            &descriptor,
        ))
    }
}

/// 已认证的仓库会话
///
/// 进程生命周期内只创建一次，创建后不再修改。
#[derive(Clone)]
pub struct RepositorySession {
    client: reqwest::Client,
    params: SessionParameters,
    repository_id: String,
    repository_name: String,
    repository_url: String,
    root_folder_url: String,
}

impl RepositorySession {
    /// 从仓库描述构建会话，缺失的地址按 browser binding 约定补全
    pub fn from_descriptor(
        client: reqwest::Client,
        params: &SessionParameters,
        descriptor: &RepositoryDescriptor,
    ) -> Self {
        let repository_url = descriptor.repository_url.clone().unwrap_or_else(|| {
            format!(
                "{}/{}",
                params.binding_url().unwrap_or_default(),
                descriptor.repository_id
            )
        });
        let root_folder_url = descriptor
            .root_folder_url
            .clone()
            .unwrap_or_else(|| format!("{}/root", repository_url));

        let mut params = params.clone();
        params.set_repository_id(descriptor.repository_id.clone());

        Self {
            client,
            params,
            repository_id: descriptor.repository_id.clone(),
            repository_name: descriptor.repository_name.clone(),
            repository_url,
            root_folder_url,
        }
    }

    pub fn repository_id(&self) -> &str {
        &self.repository_id
    }

    pub fn repository_name(&self) -> &str {
        &self.repository_name
    }

    pub fn repository_url(&self) -> &str {
        &self.repository_url
    }

    /// 查询 `since` 之后修改过的文档
    ///
    /// # 参数
    /// - `since`: 窗口起点
    /// - `mime_type`: 只返回该类型的文档
    /// - `page_size`: 每页条数，按 `hasMoreItems` 翻页
    pub async fn query_documents_modified_since(
        &self,
        since: DateTime<Utc>,
        mime_type: &str,
        page_size: u32,
    ) -> Result<Vec<DocumentRef>, RepositoryError> {
        let statement = build_modified_since_query(since, mime_type);
        debug!("CMIS 查询: {}", statement);

        let mut documents = Vec::new();
        let mut skip_count: usize = 0;

        loop {
            let page: QueryResultList = get_json(
                &self.client,
                &self.params,
                &self.repository_url,
                &[
                    ("cmisselector", "query".to_string()),
                    ("q", statement.clone()),
                    ("succinct", "true".to_string()),
                    ("maxItems", page_size.to_string()),
                    ("skipCount", skip_count.to_string()),
                ],
            )
            .await?;

            let fetched = page.results.len();
            for result in page.results {
                documents.push(result.into_document(&self.repository_url)?);
            }
            skip_count += fetched;

            if !page.has_more_items || fetched == 0 {
                break;
            }
        }

        Ok(documents)
    }

    /// 下载文档内容
    pub async fn fetch_content(&self, document: &DocumentRef) -> Result<Vec<u8>, RepositoryError> {
        let response = send_get(
            &self.client,
            &self.params,
            &self.root_folder_url,
            &[
                ("objectId", document.object_id.clone()),
                ("cmisselector", "content".to_string()),
            ],
        )
        .await?;

        let bytes = response
            .bytes()
            .await
            .map_err(|source| RepositoryError::Request {
                endpoint: self.root_folder_url.clone(),
                source,
            })?;
        Ok(bytes.to_vec())
    }
}

impl std::fmt::Debug for RepositorySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositorySession")
            .field("repository_id", &self.repository_id)
            .field("repository_url", &self.repository_url)
            .finish()
    }
}

// ========== 请求辅助函数 ==========

async fn send_get(
    client: &reqwest::Client,
    params: &SessionParameters,
    url: &str,
    query: &[(&str, String)],
) -> Result<reqwest::Response, RepositoryError> {
    let response = client
        .get(url)
        .basic_auth(&params.username, Some(&params.password))
        .query(query)
        .send()
        .await
        .map_err(|source| RepositoryError::Request {
            endpoint: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(RepositoryError::BadStatus {
            endpoint: url.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(response)
}

async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    params: &SessionParameters,
    url: &str,
    query: &[(&str, String)],
) -> Result<T, RepositoryError> {
    send_get(client, params, url, query)
        .await?
        .json::<T>()
        .await
        .map_err(|e| RepositoryError::Decode {
            endpoint: url.to_string(),
            reason: e.to_string(),
        })
}

/// 解析 repositoryInfo 响应（以仓库 ID 为键的对象），按仓库 ID 排序
fn parse_repository_infos(
    endpoint: &str,
    infos: Map<String, JsonValue>,
) -> Result<Vec<RepositoryDescriptor>, RepositoryError> {
    let mut descriptors = infos
        .into_iter()
        .map(|(_, info)| {
            serde_json::from_value::<RepositoryDescriptor>(info).map_err(|e| {
                RepositoryError::Decode {
                    endpoint: endpoint.to_string(),
                    reason: e.to_string(),
                }
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    descriptors.sort_by(|a, b| a.repository_id.cmp(&b.repository_id));
    Ok(descriptors)
}

/// 构建"某时间点之后修改过的文档"查询语句
pub fn build_modified_since_query(since: DateTime<Utc>, mime_type: &str) -> String {
    format!(
        "SELECT cmis:objectId, cmis:name, cmis:contentStreamMimeType, cmis:lastModificationDate \
         FROM cmis:document \
         WHERE cmis:lastModificationDate >= TIMESTAMP '{}' \
         AND cmis:contentStreamMimeType = '{}' \
         ORDER BY cmis:lastModificationDate ASC",
        since.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
        escape_literal(mime_type)
    )
}

fn escape_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResultList {
    #[serde(default)]
    results: Vec<QueryResult>,
    #[serde(default)]
    has_more_items: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResult {
    #[serde(default)]
    succinct_properties: Map<String, JsonValue>,
}

impl QueryResult {
    fn into_document(self, endpoint: &str) -> Result<DocumentRef, RepositoryError> {
        let props = self.succinct_properties;
        let object_id = props
            .get("cmis:objectId")
            .and_then(|v| v.as_str())
            .ok_or_else(|| RepositoryError::Decode {
                endpoint: endpoint.to_string(),
                reason: "查询结果缺少 cmis:objectId".to_string(),
            })?
            .to_string();

        let name = props
            .get("cmis:name")
            .and_then(|v| v.as_str())
            .unwrap_or(&object_id)
            .to_string();
        let mime_type = props
            .get("cmis:contentStreamMimeType")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        let last_modified = props
            .get("cmis:lastModificationDate")
            .and_then(|v| v.as_i64())
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single());

        Ok(DocumentRef {
            object_id,
            name,
            mime_type,
            last_modified,
        })
    }
}
