//! songfetch - 多源音频获取
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误分类、工作目录、结果分类器、回退编排器
//! - **observability**: 日志初始化
//! - **providers**: 曲库适配器（开放曲库 / 版权曲库 / 开放搜索兜底）

pub mod config;
pub mod core;
pub mod observability;
pub mod providers;

pub use crate::core::{
    create_orchestrator, DeliveredTrack, FailureReason, FallbackOrchestrator, FinalOutcome,
    OrchestratorBuilder,
};
