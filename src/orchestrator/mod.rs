//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `lifecycle` - 进程生命周期控制器
//! - 加载配置、初始化仓库会话、调用一次查询周期
//! - 持有唯一的关闭信号
//!
//! ### `session_bootstrapper` - 仓库会话初始化
//! - 有界重试，耗尽后不进入查询
//!
//! ### `query_orchestrator` - 文档查询编排器
//! - 按失败类别决定重试、关闭或停止
//!
//! ### `retry` - 重试策略
//!
//! ## 层次关系
//!
//! ```text
//! lifecycle (App)
//!     ↓                    ↓
//! session_bootstrapper   query_orchestrator
//!     ↓                    ↓
//! clients::cmis_client   services::ocr_service
//!                          ↓
//!                        clients (cmis / ocr / solr proxy)
//! ```

pub mod lifecycle;
pub mod query_orchestrator;
pub mod retry;
pub mod session_bootstrapper;

// 重新导出主要类型
pub use lifecycle::{App, RunOutcome};
pub use query_orchestrator::{CycleOutcome, QueryOrchestrator};
pub use retry::RetryPolicy;
pub use session_bootstrapper::SessionBootstrapper;
