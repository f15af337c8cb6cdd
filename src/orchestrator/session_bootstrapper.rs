//! 仓库会话初始化
//!
//! 有界重试地建立唯一一个仓库会话。尝试计数是循环内的局部变量，
//! 每次调用 `acquire_session` 都从 1 开始。

use crate::clients::{RepositorySession, SessionFactory, SessionParameters};
use crate::config::ConnectionConfig;
use crate::error::{RepositoryError, SessionBootstrapError};
use crate::orchestrator::retry::RetryPolicy;
use std::time::Duration;
use tracing::{error, info, warn};

/// 会话初始化器
pub struct SessionBootstrapper<'a, F: SessionFactory> {
    factory: &'a F,
    policy: RetryPolicy,
    handshake_timeout: Duration,
}

impl<'a, F: SessionFactory> SessionBootstrapper<'a, F> {
    pub fn new(factory: &'a F, policy: RetryPolicy, handshake_timeout: Duration) -> Self {
        Self {
            factory,
            policy,
            handshake_timeout,
        }
    }

    /// 建立仓库会话
    ///
    /// 每次失败（网络、认证、协议）都算一次尝试；达到上限后返回
    /// `SessionBootstrapError`，调用方必须直接结束进程。
    pub async fn acquire_session(
        &self,
        config: &ConnectionConfig,
    ) -> Result<RepositorySession, SessionBootstrapError> {
        let mut attempt: u32 = 1;

        loop {
            info!(
                "🔌 正在连接内容仓库 (尝试 {}/{}): {}",
                attempt, self.policy.max_attempts, config.url
            );

            let handshake = self.handshake(config);
            let result = match tokio::time::timeout(self.handshake_timeout, handshake).await {
                Ok(result) => result,
                Err(_) => Err(RepositoryError::Timeout {
                    operation: "session handshake",
                    after: self.handshake_timeout,
                }),
            };

            match result {
                Ok(session) => {
                    info!(
                        "✓ 仓库会话已建立: {} ({})",
                        session.repository_id(),
                        session.repository_name()
                    );
                    return Ok(session);
                }
                Err(e) => {
                    error!("[SessionBootstrapFailure] 连接内容仓库失败: {}", e);

                    if !self.policy.should_retry(attempt) {
                        error!(
                            "[SessionBootstrapFailure] 内容仓库连接失败，已尝试 {} 次，放弃",
                            attempt
                        );
                        return Err(SessionBootstrapError {
                            attempts: attempt,
                            last: e,
                        });
                    }

                    let delay = self.policy.delay_for(attempt);
                    warn!("将在 {:?} 后重新连接内容仓库", delay);
                    self.policy.backoff(attempt).await;
                    attempt += 1;
                }
            }
        }
    }

    /// 一次完整握手：列出仓库 → 取第一个 → 建立会话
    async fn handshake(
        &self,
        config: &ConnectionConfig,
    ) -> Result<RepositorySession, RepositoryError> {
        let mut params = SessionParameters::new();
        params.set_basic_authentication(&config.username, &config.password);
        params.set_browser_binding_url(&config.url);

        let repositories = self.factory.get_repositories(&params).await?;
        let repository = repositories
            .first()
            .ok_or_else(|| RepositoryError::NoRepository {
                url: config.url.clone(),
            })?;
        params.set_repository_id(repository.repository_id.clone());

        self.factory.create_session(&params).await
    }
}
