//! 曲库层：适配器抽象与三个实现（开放曲库 / 版权曲库 / 开放搜索）+ 测试用 Stub

pub mod download;
pub mod licensed;
pub mod open_search;
pub mod primary;
pub mod stub;
pub mod traits;

pub use licensed::LicensedCatalog;
pub use open_search::{check_tooling, OpenSearchFallback};
pub use primary::PrimaryCatalog;
pub use stub::{CallLog, StubProvider, StubResponse};
pub use traits::{ProviderAdapter, ProviderId};
