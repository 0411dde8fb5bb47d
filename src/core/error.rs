//! 错误分类与用户可见的失败原因
//!
//! 各曲库的原始错误先翻译为 ProviderErrorKind，再归入 ErrorClass；
//! 只有整条链路用尽或末位适配器的终止错误才会变成 FailureReason 交给上层。

use thiserror::Error;

/// 错误大类（与曲库无关的统一分类）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// 曲库没有匹配结果
    NoMatch,
    /// 有匹配但拿不到可下载的音频
    AssetUnresolvable,
    /// 版权 / 地区 / 编码限制
    LicenseOrRegionGap,
    Timeout,
    /// 网络或 API 层错误
    TransportFailure,
    /// 外部提取/转码工具缺失
    ToolingUnavailable,
    /// 外部工具运行了但没有产出可用文件
    ExtractionFailed,
    /// 本地文件系统错误
    IoFailure,
    /// 返回数据格式异常、未知错误码等
    Internal,
}

/// 适配器上报的具体错误种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorKind {
    NoDownloadUrl,
    WrongLicense,
    WrongGeolocation,
    NotAvailable,
    WrongBitrate,
    NotEncoded,
    Timeout,
    Transport,
    Malformed,
    ToolingUnavailable,
    ExtractionFailed,
    Io,
}

impl ProviderErrorKind {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::NoDownloadUrl => ErrorClass::AssetUnresolvable,
            Self::WrongLicense
            | Self::WrongGeolocation
            | Self::NotAvailable
            | Self::WrongBitrate
            | Self::NotEncoded => ErrorClass::LicenseOrRegionGap,
            Self::Timeout => ErrorClass::Timeout,
            Self::Transport => ErrorClass::TransportFailure,
            Self::Malformed => ErrorClass::Internal,
            Self::ToolingUnavailable => ErrorClass::ToolingUnavailable,
            Self::ExtractionFailed => ErrorClass::ExtractionFailed,
            Self::Io => ErrorClass::IoFailure,
        }
    }

    /// 版权曲库特有的五种限制（只说明「这个曲库」给不了，与查询本身无关）
    pub fn is_licensing_gap(&self) -> bool {
        self.class() == ErrorClass::LicenseOrRegionGap
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoDownloadUrl => "no_download_url",
            Self::WrongLicense => "wrong_license",
            Self::WrongGeolocation => "wrong_geolocation",
            Self::NotAvailable => "not_available",
            Self::WrongBitrate => "wrong_bitrate",
            Self::NotEncoded => "not_encoded",
            Self::Timeout => "timeout",
            Self::Transport => "transport",
            Self::Malformed => "malformed",
            Self::ToolingUnavailable => "tooling_unavailable",
            Self::ExtractionFailed => "extraction_failed",
            Self::Io => "io",
        }
    }
}

/// 适配器错误：种类 + 原始信息（原始信息只用于日志，不参与决策）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}: {message}", .kind.as_str())]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// reqwest 错误：超时单独归类，其余视为传输失败
    pub fn from_http(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::new(ProviderErrorKind::Timeout, err.to_string())
        } else if err.is_decode() {
            Self::new(ProviderErrorKind::Malformed, err.to_string())
        } else {
            Self::new(ProviderErrorKind::Transport, err.to_string())
        }
    }

    pub fn from_io(err: &std::io::Error) -> Self {
        Self::new(ProviderErrorKind::Io, err.to_string())
    }
}

/// 终止失败原因；Display 即面向用户的提示语，每种原因互不相同且保持稳定
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureReason {
    #[error("Please send me a song name to search.")]
    EmptyQuery,

    #[error("Sorry, I couldn't find that song. Please try another one.")]
    NotFound,

    #[error("Sorry, I found the song but no source offers a downloadable version.")]
    AssetUnresolvable,

    #[error("Sorry, that song isn't available in this region or quality right now.")]
    LicenseOrRegionGap,

    #[error("Sorry, the music service took too long to respond. Please try again later.")]
    Timeout,

    #[error("Sorry, I'm having trouble connecting to the music service. Please try again later.")]
    TransportFailure,

    #[error("Sorry, the audio extraction tool is not installed on this server.")]
    ToolingUnavailable,

    #[error("Sorry, I couldn't extract audio for that song.")]
    ExtractionFailed,

    #[error("Sorry, I couldn't download the song.")]
    IoFailure,

    #[error("Sorry, the music service returned something I couldn't understand.")]
    Internal,
}

impl FailureReason {
    /// 稳定的机器可读代码（供上层做统计或本地化）
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyQuery => "empty_query",
            Self::NotFound => "not_found",
            Self::AssetUnresolvable => "asset_unresolvable",
            Self::LicenseOrRegionGap => "license_or_region_gap",
            Self::Timeout => "timeout",
            Self::TransportFailure => "transport_failure",
            Self::ToolingUnavailable => "tooling_unavailable",
            Self::ExtractionFailed => "extraction_failed",
            Self::IoFailure => "io_failure",
            Self::Internal => "internal",
        }
    }

    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

impl From<ErrorClass> for FailureReason {
    fn from(class: ErrorClass) -> Self {
        match class {
            ErrorClass::NoMatch => Self::NotFound,
            ErrorClass::AssetUnresolvable => Self::AssetUnresolvable,
            ErrorClass::LicenseOrRegionGap => Self::LicenseOrRegionGap,
            ErrorClass::Timeout => Self::Timeout,
            ErrorClass::TransportFailure => Self::TransportFailure,
            ErrorClass::ToolingUnavailable => Self::ToolingUnavailable,
            ErrorClass::ExtractionFailed => Self::ExtractionFailed,
            ErrorClass::IoFailure => Self::IoFailure,
            ErrorClass::Internal => Self::Internal,
        }
    }
}

/// 工作目录创建失败（文件系统不可写等）
#[derive(Error, Debug)]
pub enum ScopeError {
    #[error("Failed to create working scope under {root}: {source}")]
    IoFailure {
        root: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 启动期错误：配置错误、外部工具缺失等，应在进程启动时失败而不是每个查询失败
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Required tool not found on PATH: {0}")]
    ToolingUnavailable(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("No providers enabled")]
    NoProviders,
}
