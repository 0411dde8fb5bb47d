//! 结果分类器：把各曲库的结果翻译为统一的编排信号
//!
//! 回退策略集中在这里：开放曲库与版权曲库的失败都只意味着「换下一个」；
//! 末位的开放搜索失败即整条链路终止。纯函数，不做 IO。

use crate::core::{ErrorClass, FailureReason, OrchestrationSignal, ProviderResult};
use crate::providers::ProviderId;

#[derive(Debug, Default, Clone, Copy)]
pub struct OutcomeClassifier;

impl OutcomeClassifier {
    pub fn classify(provider: ProviderId, result: &ProviderResult) -> OrchestrationSignal {
        match result {
            ProviderResult::Success { file_path, .. } => {
                OrchestrationSignal::Deliver(file_path.clone())
            }
            ProviderResult::Empty => match provider {
                ProviderId::PrimaryCatalog | ProviderId::LicensedCatalog => {
                    OrchestrationSignal::TryNext
                }
                ProviderId::OpenSearchFallback => {
                    OrchestrationSignal::Abort(FailureReason::from(ErrorClass::NoMatch))
                }
            },
            ProviderResult::Error(err) => match provider {
                // 版权类错误与内部错误都回退到下一个曲库
                ProviderId::PrimaryCatalog | ProviderId::LicensedCatalog => {
                    OrchestrationSignal::TryNext
                }
                ProviderId::OpenSearchFallback => {
                    OrchestrationSignal::Abort(FailureReason::from(err.kind.class()))
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::core::ProviderErrorKind;

    fn err(kind: ProviderErrorKind, msg: &str) -> ProviderResult {
        ProviderResult::error(kind, msg)
    }

    fn success() -> ProviderResult {
        ProviderResult::Success {
            file_path: PathBuf::from("/tmp/x.mp3"),
            mime_hint: "audio/mpeg".to_string(),
        }
    }

    #[test]
    fn test_success_always_delivers() {
        for provider in ProviderId::ALL {
            assert_eq!(
                OutcomeClassifier::classify(provider, &success()),
                OrchestrationSignal::Deliver(PathBuf::from("/tmp/x.mp3"))
            );
        }
    }

    #[test]
    fn test_empty() {
        assert_eq!(
            OutcomeClassifier::classify(ProviderId::PrimaryCatalog, &ProviderResult::Empty),
            OrchestrationSignal::TryNext
        );
        assert_eq!(
            OutcomeClassifier::classify(ProviderId::LicensedCatalog, &ProviderResult::Empty),
            OrchestrationSignal::TryNext
        );
        assert_eq!(
            OutcomeClassifier::classify(ProviderId::OpenSearchFallback, &ProviderResult::Empty),
            OrchestrationSignal::Abort(FailureReason::NotFound)
        );
    }

    #[test]
    fn test_licensing_kinds_never_abort() {
        let kinds = [
            ProviderErrorKind::WrongLicense,
            ProviderErrorKind::WrongGeolocation,
            ProviderErrorKind::NotAvailable,
            ProviderErrorKind::WrongBitrate,
            ProviderErrorKind::NotEncoded,
        ];
        let messages = ["", "fatal", "abort now", "Track token has no sufficient rights"];
        for kind in kinds {
            for msg in messages {
                assert_eq!(
                    OutcomeClassifier::classify(ProviderId::LicensedCatalog, &err(kind, msg)),
                    OrchestrationSignal::TryNext,
                    "{:?} / {}",
                    kind,
                    msg
                );
            }
        }
    }

    #[test]
    fn test_other_errors_fall_through_before_last() {
        for kind in [
            ProviderErrorKind::Transport,
            ProviderErrorKind::Timeout,
            ProviderErrorKind::Malformed,
            ProviderErrorKind::NoDownloadUrl,
        ] {
            assert_eq!(
                OutcomeClassifier::classify(ProviderId::PrimaryCatalog, &err(kind, "x")),
                OrchestrationSignal::TryNext
            );
            assert_eq!(
                OutcomeClassifier::classify(ProviderId::LicensedCatalog, &err(kind, "x")),
                OrchestrationSignal::TryNext
            );
        }
    }

    #[test]
    fn test_open_search_errors_abort_with_reason() {
        let cases = [
            (ProviderErrorKind::Timeout, FailureReason::Timeout),
            (ProviderErrorKind::ExtractionFailed, FailureReason::ExtractionFailed),
            (ProviderErrorKind::ToolingUnavailable, FailureReason::ToolingUnavailable),
            (ProviderErrorKind::Transport, FailureReason::TransportFailure),
            (ProviderErrorKind::Io, FailureReason::IoFailure),
        ];
        for (kind, reason) in cases {
            assert_eq!(
                OutcomeClassifier::classify(ProviderId::OpenSearchFallback, &err(kind, "x")),
                OrchestrationSignal::Abort(reason)
            );
        }
    }
}
