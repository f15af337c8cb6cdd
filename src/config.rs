use crate::error::ConfigError;
use crate::orchestrator::retry::RetryPolicy;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// 首次查询回看的天数（固定值，不从配置文件读取）
pub const DEFAULT_QUERY_WINDOW_DAYS: u32 = 1;

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// 内容仓库连接配置
    pub repository: ConnectionConfig,
    /// OCR 与搜索代理配置
    pub ocr: OcrSettings,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub http: HttpSettings,
}

/// 内容仓库连接配置
#[derive(Clone, Deserialize)]
pub struct ConnectionConfig {
    /// CMIS browser binding 地址
    pub url: String,
    pub username: String,
    #[serde(default)]
    pub password: String,
}

// 密码不进日志
impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// OCR 运行时配置
#[derive(Clone, Debug, Deserialize)]
pub struct OcrSettings {
    /// OCR 引擎地址
    pub endpoint: String,
    /// 搜索索引代理地址
    pub solr_proxy_url: String,
    #[serde(default)]
    pub solr_proxy_token: Option<String>,
    /// 只处理该类型的文档
    #[serde(default = "default_mime_type")]
    pub mime_type: String,
    /// CMIS 查询分页大小
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// 识别结果另存目录（可选）
    #[serde(default)]
    pub text_output_dir: Option<String>,
}

/// 重试配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub session_max_attempts: u32,
    pub search_proxy_max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            session_max_attempts: 3,
            search_proxy_max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
        }
    }
}

impl RetrySettings {
    /// 仓库会话初始化的重试策略
    pub fn session_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.session_max_attempts,
            Duration::from_millis(self.base_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
    }

    /// 搜索代理不可用时的重试策略
    pub fn search_proxy_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.search_proxy_max_attempts,
            Duration::from_millis(self.base_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
    }
}

/// HTTP 超时配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    /// 单次会话握手的总超时
    pub handshake_timeout_secs: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            request_timeout_secs: 60,
            handshake_timeout_secs: 30,
        }
    }
}

impl HttpSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }
}

fn default_mime_type() -> String {
    "application/pdf".to_string()
}

fn default_page_size() -> u32 {
    100
}

impl Config {
    /// 从 TOML 文件加载配置
    ///
    /// 读取后依次应用环境变量覆盖和校验。
    ///
    /// # 参数
    /// - `path`: 配置文件路径
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: display.clone(),
                source,
            })?;

        let mut config = Self::from_toml_str(&content).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: display.clone(),
                source,
            },
            other => other,
        })?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 解析 TOML 文本（不读取环境变量，不校验）
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: String::new(),
            source,
        })
    }

    /// 用环境变量覆盖端点和凭据
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("REPOSITORY_URL") {
            self.repository.url = v;
        }
        if let Some(v) = lookup("REPOSITORY_USERNAME") {
            self.repository.username = v;
        }
        if let Some(v) = lookup("REPOSITORY_PASSWORD") {
            self.repository.password = v;
        }
        if let Some(v) = lookup("OCR_ENDPOINT") {
            self.ocr.endpoint = v;
        }
        if let Some(v) = lookup("SOLR_PROXY_URL") {
            self.ocr.solr_proxy_url = v;
        }
        if let Some(v) = lookup("SOLR_PROXY_TOKEN") {
            self.ocr.solr_proxy_token = Some(v);
        }
    }

    /// 校验必填项
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("repository.url", &self.repository.url),
            ("repository.username", &self.repository.username),
            ("ocr.endpoint", &self.ocr.endpoint),
            ("ocr.solr_proxy_url", &self.ocr.solr_proxy_url),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "不能为空".to_string(),
                });
            }
        }

        if self.retry.session_max_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "retry.session_max_attempts",
                reason: "至少为 1".to_string(),
            });
        }
        if self.retry.search_proxy_max_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "retry.search_proxy_max_attempts",
                reason: "至少为 1".to_string(),
            });
        }
        if self.ocr.page_size == 0 {
            return Err(ConfigError::Invalid {
                field: "ocr.page_size",
                reason: "至少为 1".to_string(),
            });
        }

        // 超时为 0 会让每次请求立即失败
        let timeouts = [
            ("http.connect_timeout_secs", self.http.connect_timeout_secs),
            ("http.request_timeout_secs", self.http.request_timeout_secs),
            ("http.handshake_timeout_secs", self.http.handshake_timeout_secs),
        ];
        for (field, secs) in timeouts {
            if secs == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "至少为 1".to_string(),
                });
            }
        }
        Ok(())
    }
}
