//! # OCR Processor
//!
//! 定期从内容仓库（CMIS）查询最近修改的文档，做 OCR 后推送给搜索索引代理。
//!
//! ## 架构设计
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 进程级稀缺资源
//! - `ShutdownSignal` - 唯一的关闭标志，只能写入一次
//!
//! ### ② 客户端层（Clients）
//! - `CmisSessionFactory` / `RepositorySession` - 内容仓库会话、查询、下载
//! - `OcrClient` - OCR 引擎
//! - `SolrProxyClient` - 搜索索引代理
//!
//! ### ③ 业务能力层（Services）
//! - `OcrPipeline` - 查询 → 下载 → OCR → 索引，只暴露 `process_recent`
//!
//! ### ④ 编排层（Orchestration）
//! - `App` - 生命周期控制器
//! - `SessionBootstrapper` - 有界重试的会话初始化
//! - `QueryOrchestrator` - 按失败类别决定重试 / 关闭 / 停止
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppResult, QueryError, RepositoryError, SessionBootstrapError};
pub use infrastructure::ShutdownSignal;
pub use orchestrator::{App, CycleOutcome, QueryOrchestrator, RetryPolicy, RunOutcome};
pub use services::{DocumentProcessor, OcrPipeline};
