use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 仓库描述（getRepositories 的一项）
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryDescriptor {
    pub repository_id: String,
    #[serde(default)]
    pub repository_name: String,
    /// browser binding 下的仓库地址
    #[serde(default)]
    pub repository_url: Option<String>,
    /// 根目录地址，用于获取文档内容
    #[serde(default)]
    pub root_folder_url: Option<String>,
}

/// 待 OCR 的候选文档
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    pub object_id: String,
    pub name: String,
    pub mime_type: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
}

/// 推送给搜索代理的索引文档
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDocument {
    pub id: String,
    pub name: String,
    pub repository_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
    pub content: String,
}

impl IndexDocument {
    pub fn new(document: &DocumentRef, repository_id: &str, content: String) -> Self {
        Self {
            id: document.object_id.clone(),
            name: document.name.clone(),
            repository_id: repository_id.to_string(),
            last_modified: document.last_modified,
            content,
        }
    }
}

/// 一次查询处理的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessSummary {
    /// 查询到的候选文档数
    pub candidates: usize,
    /// 成功推送到搜索代理的文档数
    pub indexed: usize,
    /// OCR 结果为空而跳过的文档数
    pub skipped_empty: usize,
}
