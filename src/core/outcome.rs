//! 单次尝试的结果、编排信号与最终结果
//!
//! ProviderResult 由适配器产出后立即交给分类器；FinalOutcome 每个查询只产出一个，
//! Delivered 时文件与其所在目录的所有权一并交给调用方，调用方读完后必须 cleanup。

use std::path::{Path, PathBuf};

use crate::core::scope::OwnedScope;
use crate::core::{ErrorClass, FailureReason, ProviderError, ProviderErrorKind};
use crate::providers::ProviderId;

/// 适配器的原始结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderResult {
    Success { file_path: PathBuf, mime_hint: String },
    Empty,
    Error(ProviderError),
}

impl ProviderResult {
    /// 构造 Success 前检查文件存在且非空，否则降级为错误
    pub async fn from_written_file(file_path: PathBuf, mime_hint: impl Into<String>) -> Self {
        match tokio::fs::metadata(&file_path).await {
            Ok(meta) if meta.is_file() && meta.len() > 0 => Self::Success {
                file_path,
                mime_hint: mime_hint.into(),
            },
            Ok(_) => Self::error(
                ProviderErrorKind::Io,
                format!("{} is empty or not a file", file_path.display()),
            ),
            Err(e) => Self::error(
                ProviderErrorKind::Io,
                format!("{}: {}", file_path.display(), e),
            ),
        }
    }

    pub fn error(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self::Error(ProviderError::new(kind, message))
    }

    /// 非成功结果的错误大类；Empty 归为 NoMatch
    pub fn error_class(&self) -> Option<ErrorClass> {
        match self {
            Self::Success { .. } => None,
            Self::Empty => Some(ErrorClass::NoMatch),
            Self::Error(e) => Some(e.kind.class()),
        }
    }

    /// 审计日志用的简短标签
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::Empty => "empty",
            Self::Error(e) if e.kind == ProviderErrorKind::Timeout => "timeout",
            Self::Error(_) => "error",
        }
    }
}

impl From<ProviderError> for ProviderResult {
    fn from(err: ProviderError) -> Self {
        Self::Error(err)
    }
}

/// 分类器给编排器的信号
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestrationSignal {
    Deliver(PathBuf),
    TryNext,
    Abort(FailureReason),
}

impl OrchestrationSignal {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Deliver(_) => "deliver",
            Self::TryNext => "try_next",
            Self::Abort(_) => "abort",
        }
    }
}

/// 已交付的音频：打开的文件句柄 + 所在工作目录的所有权
#[derive(Debug)]
pub struct DeliveredTrack {
    provider: ProviderId,
    file_path: PathBuf,
    mime_hint: String,
    size: u64,
    file: tokio::fs::File,
    scope: OwnedScope,
}

impl DeliveredTrack {
    pub(crate) fn new(
        provider: ProviderId,
        file_path: PathBuf,
        mime_hint: String,
        size: u64,
        file: tokio::fs::File,
        scope: OwnedScope,
    ) -> Self {
        Self {
            provider,
            file_path,
            mime_hint,
            size,
            file,
            scope,
        }
    }

    pub fn provider(&self) -> ProviderId {
        self.provider
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn mime_hint(&self) -> &str {
        &self.mime_hint
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_path.file_name().and_then(|n| n.to_str())
    }

    /// 可读的文件句柄
    pub fn file(&mut self) -> &mut tokio::fs::File {
        &mut self.file
    }

    /// 调用方读完/发送完后调用：关闭句柄并删除工作目录
    pub fn cleanup(self) {
        let Self { file, scope, .. } = self;
        drop(file);
        scope.cleanup();
    }
}

/// 一个查询的唯一最终结果
#[derive(Debug)]
pub enum FinalOutcome {
    Delivered(DeliveredTrack),
    NotFound,
    Failed(FailureReason),
}

impl FinalOutcome {
    pub fn from_reason(reason: FailureReason) -> Self {
        match reason {
            FailureReason::NotFound => Self::NotFound,
            other => Self::Failed(other),
        }
    }

    /// 失败原因；NotFound 也视为一种失败原因
    pub fn failure(&self) -> Option<FailureReason> {
        match self {
            Self::Delivered(_) => None,
            Self::NotFound => Some(FailureReason::NotFound),
            Self::Failed(reason) => Some(*reason),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Delivered(_) => "delivered",
            Self::NotFound => "not_found",
            Self::Failed(_) => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_success_requires_non_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.mp3");

        let missing = ProviderResult::from_written_file(path.clone(), "audio/mpeg").await;
        assert!(matches!(missing, ProviderResult::Error(ref e) if e.kind == ProviderErrorKind::Io));

        tokio::fs::write(&path, b"").await.unwrap();
        let empty = ProviderResult::from_written_file(path.clone(), "audio/mpeg").await;
        assert!(matches!(empty, ProviderResult::Error(_)));

        tokio::fs::write(&path, b"ID3").await.unwrap();
        let ok = ProviderResult::from_written_file(path.clone(), "audio/mpeg").await;
        assert_eq!(
            ok,
            ProviderResult::Success {
                file_path: path,
                mime_hint: "audio/mpeg".to_string()
            }
        );
    }

    #[test]
    fn test_final_outcome_failure() {
        assert_eq!(
            FinalOutcome::from_reason(FailureReason::NotFound).failure(),
            Some(FailureReason::NotFound)
        );
        assert!(matches!(
            FinalOutcome::from_reason(FailureReason::Timeout),
            FinalOutcome::Failed(FailureReason::Timeout)
        ));
    }

    #[test]
    fn test_error_class() {
        assert_eq!(ProviderResult::Empty.error_class(), Some(ErrorClass::NoMatch));
        assert_eq!(
            ProviderResult::error(ProviderErrorKind::NotEncoded, "x").error_class(),
            Some(ErrorClass::LicenseOrRegionGap)
        );
        let ok = ProviderResult::Success {
            file_path: PathBuf::from("/tmp/a.mp3"),
            mime_hint: "audio/mpeg".to_string(),
        };
        assert_eq!(ok.error_class(), None);
    }

    #[test]
    fn test_result_labels() {
        assert_eq!(ProviderResult::Empty.label(), "empty");
        assert_eq!(
            ProviderResult::error(ProviderErrorKind::Timeout, "slow").label(),
            "timeout"
        );
        assert_eq!(
            ProviderResult::error(ProviderErrorKind::WrongLicense, "x").label(),
            "error"
        );
    }
}
