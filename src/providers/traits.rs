//! 曲库适配器抽象
//!
//! 所有曲库（开放曲库 / 版权曲库 / 开放搜索）实现 ProviderAdapter：在给定工作目录内完成
//! 搜索 → 解析可下载资源 → 拉取字节，并返回结构化的 ProviderResult。

use std::fmt;
use std::path::Path;

use async_trait::async_trait;

use crate::core::{ProviderResult, Query};

/// 曲库标识；顺序即回退顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProviderId {
    PrimaryCatalog,
    LicensedCatalog,
    OpenSearchFallback,
}

impl ProviderId {
    pub const ALL: [ProviderId; 3] = [
        ProviderId::PrimaryCatalog,
        ProviderId::LicensedCatalog,
        ProviderId::OpenSearchFallback,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PrimaryCatalog => "primary",
            Self::LicensedCatalog => "licensed",
            Self::OpenSearchFallback => "open-search",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 曲库适配器 trait
///
/// 实现方只能把文件写进 `scope_dir`，并通过 ProviderResult::Success 返回写出的确切路径；
/// 错误一律以 ProviderResult::Error 返回，不向外抛出。
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn id(&self) -> ProviderId;

    async fn fetch(&self, query: &Query, scope_dir: &Path) -> ProviderResult;
}
