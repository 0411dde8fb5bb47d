//! 回退编排器：主控状态机
//!
//! Attempting(i) → Delivering | Aborted。进入 Attempting(i) 时打开工作目录、在超时内调用第 i 个曲库、
//! 交给分类器得到信号：Deliver 移交目录所有权并结束；TryNext 释放目录并进入下一个曲库，
//! 已是最后一个时按该结果的错误大类终止（Empty 即 NotFound）；
//! Abort 释放目录并以给定原因结束。每个曲库每个查询最多调用一次，曲库之间严格串行。

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;
use tracing::Instrument;

use crate::core::scope::WorkingScope;
use crate::core::{
    DeliveredTrack, FailureReason, FinalOutcome, OrchestrationSignal, OutcomeClassifier,
    ProviderErrorKind, ProviderResult, Query, SetupError,
};
use crate::providers::{ProviderAdapter, ProviderId};

/// 状态机状态（Idle 即构造后、尚未进入 Attempting(0) 之前）
#[derive(Debug)]
enum RunState {
    Attempting(usize),
    Delivering(DeliveredTrack),
    Aborted(FailureReason),
}

/// 回退编排器：不持有可变状态，可被多个查询并发共享（Arc）
pub struct FallbackOrchestrator {
    providers: Vec<Arc<dyn ProviderAdapter>>,
    work_root: PathBuf,
    attempt_timeout: Duration,
}

impl FallbackOrchestrator {
    /// 按 ProviderId 固定顺序排列；同一曲库只保留第一个
    pub fn new(
        mut providers: Vec<Arc<dyn ProviderAdapter>>,
        work_root: PathBuf,
        attempt_timeout: Duration,
    ) -> Result<Self, SetupError> {
        providers.sort_by_key(|p| p.id());
        providers.dedup_by_key(|p| p.id());
        if providers.is_empty() {
            return Err(SetupError::NoProviders);
        }
        Ok(Self {
            providers,
            work_root,
            attempt_timeout,
        })
    }

    pub fn provider_ids(&self) -> Vec<ProviderId> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    pub fn work_root(&self) -> &Path {
        &self.work_root
    }

    /// 唯一入口：一个查询文本 → 一个最终结果
    pub async fn handle_query(&self, text: &str) -> FinalOutcome {
        let query = match Query::new(text) {
            Ok(q) => q,
            Err(reason) => {
                tracing::info!("empty query rejected");
                return FinalOutcome::Failed(reason);
            }
        };
        let run_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("query", run_id = %run_id, query = %query);
        self.run(&query).instrument(span).await
    }

    async fn run(&self, query: &Query) -> FinalOutcome {
        let started = Instant::now();
        let mut state = RunState::Attempting(0);
        let outcome = loop {
            state = match state {
                RunState::Attempting(i) => self.attempt(i, query).await,
                RunState::Delivering(track) => break FinalOutcome::Delivered(track),
                RunState::Aborted(reason) => break FinalOutcome::from_reason(reason),
            };
        };
        tracing::info!(
            outcome = outcome.label(),
            reason = outcome.failure().map(|r| r.code()).unwrap_or(""),
            duration_ms = started.elapsed().as_millis() as u64,
            "query finished"
        );
        outcome
    }

    /// 一次曲库尝试：打开目录 → 调用 → 分类 → 决定下一个状态；返回前目录必然已释放或已移交
    async fn attempt(&self, index: usize, query: &Query) -> RunState {
        let provider = &self.providers[index];
        let id = provider.id();

        let scope = match WorkingScope::open(&self.work_root, id.as_str()) {
            Ok(scope) => scope,
            Err(e) => {
                // 工作目录建不起来只影响这个曲库，不升级为用户可见的失败
                tracing::warn!(provider = %id, error = %e, "skipping provider");
                return self.next_or_not_found(index);
            }
        };

        let started = Instant::now();
        let result = match timeout(self.attempt_timeout, provider.fetch(query, scope.path())).await {
            Ok(result) => result,
            Err(_) => ProviderResult::error(
                ProviderErrorKind::Timeout,
                format!("{} timed out after {}s", id, self.attempt_timeout.as_secs()),
            ),
        };
        let signal = OutcomeClassifier::classify(id, &result);
        audit(index, id, &result, &signal, started.elapsed());

        match signal {
            OrchestrationSignal::Deliver(path) => {
                let mime_hint = match &result {
                    ProviderResult::Success { mime_hint, .. } => mime_hint.clone(),
                    _ => String::new(),
                };
                match deliver(id, path, mime_hint, scope).await {
                    Ok(track) => RunState::Delivering(track),
                    Err(reason) => RunState::Aborted(reason),
                }
            }
            OrchestrationSignal::TryNext => {
                scope.release();
                if index + 1 < self.providers.len() {
                    RunState::Attempting(index + 1)
                } else {
                    // 链路到头：末位曲库的失败原因直接交给用户
                    let reason = result
                        .error_class()
                        .map_or(FailureReason::NotFound, FailureReason::from);
                    RunState::Aborted(reason)
                }
            }
            OrchestrationSignal::Abort(reason) => {
                scope.release();
                RunState::Aborted(reason)
            }
        }
    }

    fn next_or_not_found(&self, index: usize) -> RunState {
        if index + 1 < self.providers.len() {
            RunState::Attempting(index + 1)
        } else {
            RunState::Aborted(FailureReason::NotFound)
        }
    }
}

/// 打开待交付文件并移交目录；此处的 IO 失败会变成用户可见的 IoFailure
async fn deliver(
    id: ProviderId,
    path: PathBuf,
    mime_hint: String,
    scope: WorkingScope,
) -> Result<DeliveredTrack, FailureReason> {
    if !path.starts_with(scope.path()) {
        tracing::warn!(provider = %id, path = %path.display(), "delivered file outside working scope");
        scope.release();
        return Err(FailureReason::IoFailure);
    }
    let opened = match tokio::fs::File::open(&path).await {
        Ok(file) => file.metadata().await.map(|m| (file, m.len())),
        Err(e) => Err(e),
    };
    match opened {
        Ok((file, size)) if size > 0 => Ok(DeliveredTrack::new(
            id,
            path,
            mime_hint,
            size,
            file,
            scope.transfer_ownership(),
        )),
        Ok(_) => {
            tracing::warn!(provider = %id, path = %path.display(), "delivered file is empty");
            scope.release();
            Err(FailureReason::IoFailure)
        }
        Err(e) => {
            tracing::warn!(provider = %id, path = %path.display(), error = %e, "failed to open delivered file");
            scope.release();
            Err(FailureReason::IoFailure)
        }
    }
}

/// 每次尝试输出一条结构化审计日志（JSON）
fn audit(
    index: usize,
    id: ProviderId,
    result: &ProviderResult,
    signal: &OrchestrationSignal,
    elapsed: Duration,
) {
    let (error_kind, error_message) = match result {
        ProviderResult::Error(e) => (Some(e.kind.as_str()), Some(e.message.as_str())),
        _ => (None, None),
    };
    let audit = serde_json::json!({
        "event": "provider_attempt",
        "attempt": index,
        "provider": id.as_str(),
        "outcome": result.label(),
        "error_kind": error_kind,
        "signal": signal.label(),
        "duration_ms": elapsed.as_millis() as u64,
    });
    tracing::info!(audit = %audit.to_string(), "provider");
    if let Some(message) = error_message {
        tracing::debug!(provider = %id, error = %message, "provider error detail");
    }
}
