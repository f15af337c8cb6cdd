//! 错误类型
//!
//! 每一类外部依赖各有一个错误枚举，编排层只对这些封闭的变体做模式匹配。

use std::io;
use std::time::Duration;
use thiserror::Error;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置文件不存在或无法读取
    #[error("无法读取配置文件 ({path}): {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    /// TOML 解析失败
    #[error("配置文件解析失败 ({path}): {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// 字段值不合法
    #[error("配置项 {field} 不合法: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// 内容仓库（CMIS）访问错误
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// 网络请求失败
    #[error("CMIS 请求失败 ({endpoint}): {source}")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// 仓库返回非成功状态码
    #[error("CMIS 返回错误状态 ({endpoint}): HTTP {status}")]
    BadStatus { endpoint: String, status: u16 },
    /// 操作超时
    #[error("CMIS 操作超时 ({operation}): 超过 {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
    /// 端点上没有任何仓库
    #[error("CMIS 端点没有可用的仓库: {url}")]
    NoRepository { url: String },
    /// 响应内容无法解析
    #[error("CMIS 响应解析失败 ({endpoint}): {reason}")]
    Decode { endpoint: String, reason: String },
}

/// HTTP 服务（OCR 引擎、搜索代理）调用错误
#[derive(Debug, Error)]
pub enum ServiceError {
    /// 连接失败、超时或网关不可用
    #[error("服务不可达 ({endpoint}): {reason}")]
    Unavailable { endpoint: String, reason: String },
    /// 服务返回了非成功状态码
    #[error("服务拒绝请求 ({endpoint}): HTTP {status}")]
    Rejected { endpoint: String, status: u16 },
    /// 其他请求错误
    #[error("服务请求失败 ({endpoint}): {reason}")]
    Request { endpoint: String, reason: String },
    /// 响应内容无法解析
    #[error("服务响应解析失败 ({endpoint}): {reason}")]
    Decode { endpoint: String, reason: String },
}

impl ServiceError {
    /// 按状态码分类，502/503/504 视为不可达
    pub fn from_status(endpoint: impl Into<String>, status: u16) -> Self {
        let endpoint = endpoint.into();
        match status {
            502..=504 => ServiceError::Unavailable {
                endpoint,
                reason: format!("HTTP {}", status),
            },
            _ => ServiceError::Rejected { endpoint, status },
        }
    }

    /// 按传输错误分类，连接失败和超时视为不可达
    pub fn from_request(endpoint: impl Into<String>, err: reqwest::Error) -> Self {
        let endpoint = endpoint.into();
        if err.is_connect() || err.is_timeout() {
            ServiceError::Unavailable {
                endpoint,
                reason: err.to_string(),
            }
        } else if err.is_decode() {
            ServiceError::Decode {
                endpoint,
                reason: err.to_string(),
            }
        } else {
            ServiceError::Request {
                endpoint,
                reason: err.to_string(),
            }
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, ServiceError::Unavailable { .. })
    }
}

/// 仓库会话初始化失败（重试次数耗尽）
#[derive(Debug, Error)]
#[error("仓库会话初始化失败，已尝试 {attempts} 次: {last}")]
pub struct SessionBootstrapError {
    pub attempts: u32,
    #[source]
    pub last: RepositoryError,
}

/// 一次查询处理（processRecent）的失败分类
///
/// 变体之间互斥，编排层按声明顺序决定处理策略。
#[derive(Debug, Error)]
pub enum QueryError {
    /// 搜索索引代理不可达，可重试
    #[error("搜索代理不可用 ({endpoint}): {reason}")]
    SearchProxyUnavailable { endpoint: String, reason: String },
    /// 某个文档无法获取或无法 OCR，不可重试
    #[error("获取文档用于 OCR 失败 ({document}): {reason}")]
    DocumentFetchFailed { document: String, reason: String },
    /// 本地 I/O 失败
    #[error("本地 I/O 错误: {0}")]
    Io(#[from] io::Error),
    /// 未归类的失败
    #[error("未归类错误: {0}")]
    Unclassified(String),
}

/// 失败类别，用于日志
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    SearchProxyUnavailable,
    DocumentFetchFailed,
    Io,
    Unclassified,
}

impl FailureCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureCategory::SearchProxyUnavailable => "SearchProxyUnavailable",
            FailureCategory::DocumentFetchFailed => "DocumentFetchFailed",
            FailureCategory::Io => "IoError",
            FailureCategory::Unclassified => "Unclassified",
        }
    }
}

impl std::fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl QueryError {
    /// 返回错误所属的类别
    pub fn category(&self) -> FailureCategory {
        match self {
            QueryError::SearchProxyUnavailable { .. } => FailureCategory::SearchProxyUnavailable,
            QueryError::DocumentFetchFailed { .. } => FailureCategory::DocumentFetchFailed,
            QueryError::Io(_) => FailureCategory::Io,
            QueryError::Unclassified(_) => FailureCategory::Unclassified,
        }
    }

    // ========== 便捷构造函数 ==========

    /// 创建搜索代理不可用错误
    pub fn proxy_unavailable(endpoint: impl Into<String>, reason: impl ToString) -> Self {
        QueryError::SearchProxyUnavailable {
            endpoint: endpoint.into(),
            reason: reason.to_string(),
        }
    }

    /// 创建文档获取失败错误
    pub fn fetch_failed(document: impl Into<String>, reason: impl ToString) -> Self {
        QueryError::DocumentFetchFailed {
            document: document.into(),
            reason: reason.to_string(),
        }
    }
}

/// 应用程序结果类型
pub type AppResult<T, E = QueryError> = Result<T, E>;
