//! 固定响应的曲库（用于测试，无需网络）
//!
//! 每次 fetch 把自己的 ProviderId 记入共享调用日志，便于断言调用顺序与次数。

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::core::{ProviderErrorKind, ProviderResult, Query};
use crate::providers::{ProviderAdapter, ProviderId};

/// 共享调用日志
pub type CallLog = Arc<Mutex<Vec<ProviderId>>>;

#[derive(Debug, Clone)]
pub enum StubResponse {
    /// 在工作目录写入 file_name 后返回 Success
    Success { file_name: String, bytes: Vec<u8> },
    Empty,
    Error(ProviderErrorKind, String),
    /// 先写一个残缺文件再报错（用于验证失败时目录也会清理）
    PartialThenError(ProviderErrorKind),
    /// 卡住指定时长后返回 Empty（用于超时）
    Hang(Duration),
}

impl StubResponse {
    pub fn success(file_name: &str) -> Self {
        Self::Success {
            file_name: file_name.to_string(),
            bytes: b"ID3\x04stub-audio".to_vec(),
        }
    }

    pub fn error(kind: ProviderErrorKind) -> Self {
        Self::Error(kind, format!("stub {}", kind.as_str()))
    }
}

#[derive(Debug)]
pub struct StubProvider {
    id: ProviderId,
    response: StubResponse,
    calls: CallLog,
}

impl StubProvider {
    pub fn new(id: ProviderId, response: StubResponse, calls: CallLog) -> Self {
        Self { id, response, calls }
    }

    fn record(&self) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(self.id);
        }
    }
}

#[async_trait]
impl ProviderAdapter for StubProvider {
    fn id(&self) -> ProviderId {
        self.id
    }

    async fn fetch(&self, _query: &Query, scope_dir: &Path) -> ProviderResult {
        self.record();
        match &self.response {
            StubResponse::Success { file_name, bytes } => {
                let path = scope_dir.join(file_name);
                if let Err(e) = tokio::fs::write(&path, bytes).await {
                    return ProviderResult::error(ProviderErrorKind::Io, e.to_string());
                }
                ProviderResult::from_written_file(path, "audio/mpeg").await
            }
            StubResponse::Empty => ProviderResult::Empty,
            StubResponse::Error(kind, message) => ProviderResult::error(*kind, message.clone()),
            StubResponse::PartialThenError(kind) => {
                if let Err(e) = tokio::fs::write(scope_dir.join("partial.part"), b"half").await {
                    return ProviderResult::error(ProviderErrorKind::Io, e.to_string());
                }
                ProviderResult::error(*kind, "stub failed mid-transfer")
            }
            StubResponse::Hang(duration) => {
                tokio::time::sleep(*duration).await;
                ProviderResult::Empty
            }
        }
    }
}
