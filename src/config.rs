//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `SONGFETCH__*` 覆盖（双下划线表示嵌套，如 `SONGFETCH__TIMEOUTS__SEARCH_SECS=5`）。
//! 进程启动时构造一次，之后只读，显式传给编排器。

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub timeouts: TimeoutsSection,
    #[serde(default)]
    pub providers: ProvidersSection,
}

/// [app] 段：应用名、工作目录根
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppSection {
    pub name: Option<String>,
    /// 每次尝试的临时目录建在此处，未设置时用系统临时目录
    pub work_root: Option<PathBuf>,
}

impl AppSection {
    pub fn work_root(&self) -> PathBuf {
        self.work_root.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// 曲库请求的 User-Agent：`<name>/<版本>`
    pub fn user_agent(&self) -> String {
        let name = self
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or("songfetch");
        format!("{}/{}", name, env!("CARGO_PKG_VERSION"))
    }
}

/// [timeouts] 段（秒）
#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutsSection {
    /// 元数据搜索
    #[serde(default = "default_search_secs")]
    pub search_secs: u64,
    /// 音频传输
    #[serde(default = "default_download_secs")]
    pub download_secs: u64,
    /// 单次适配器调用的总上限
    #[serde(default = "default_attempt_secs")]
    pub attempt_secs: u64,
    /// 外部提取/转码工具
    #[serde(default = "default_extract_secs")]
    pub extract_secs: u64,
}

fn default_search_secs() -> u64 {
    20
}

fn default_download_secs() -> u64 {
    60
}

fn default_attempt_secs() -> u64 {
    180
}

fn default_extract_secs() -> u64 {
    150
}

impl Default for TimeoutsSection {
    fn default() -> Self {
        Self {
            search_secs: default_search_secs(),
            download_secs: default_download_secs(),
            attempt_secs: default_attempt_secs(),
            extract_secs: default_extract_secs(),
        }
    }
}

impl TimeoutsSection {
    pub fn search(&self) -> Duration {
        Duration::from_secs(self.search_secs)
    }

    pub fn download(&self) -> Duration {
        Duration::from_secs(self.download_secs)
    }

    pub fn attempt(&self) -> Duration {
        Duration::from_secs(self.attempt_secs)
    }

    pub fn extract(&self) -> Duration {
        Duration::from_secs(self.extract_secs)
    }
}

/// [providers] 段：三个曲库各自一节
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProvidersSection {
    #[serde(default)]
    pub primary: PrimarySection,
    #[serde(default)]
    pub licensed: LicensedSection,
    #[serde(default)]
    pub open_search: OpenSearchSection,
}

/// [providers.primary] 段：开放曲库
#[derive(Debug, Clone, Deserialize)]
pub struct PrimarySection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_catalog_api")]
    pub api_base: String,
}

impl Default for PrimarySection {
    fn default() -> Self {
        Self {
            enabled: true,
            api_base: default_catalog_api(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_catalog_api() -> String {
    "https://api.deezer.com".to_string()
}

/// 版权曲库的音频格式（由高到低：flac > mp3_320 > mp3_128）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum TrackFormat {
    #[serde(rename = "mp3_128")]
    Mp3_128,
    #[serde(rename = "mp3_320")]
    Mp3_320,
    #[serde(rename = "flac")]
    Flac,
}

impl TrackFormat {
    /// 媒体接口里的格式名
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Mp3_128 => "MP3_128",
            Self::Mp3_320 => "MP3_320",
            Self::Flac => "FLAC",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Flac => "flac",
            Self::Mp3_128 | Self::Mp3_320 => "mp3",
        }
    }

    /// 自身及更低的格式，按从高到低排列
    pub fn with_lower(&self) -> &'static [TrackFormat] {
        match self {
            Self::Flac => &[Self::Flac, Self::Mp3_320, Self::Mp3_128],
            Self::Mp3_320 => &[Self::Mp3_320, Self::Mp3_128],
            Self::Mp3_128 => &[Self::Mp3_128],
        }
    }
}

/// [providers.licensed] 段：版权曲库
#[derive(Debug, Clone, Deserialize)]
pub struct LicensedSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_catalog_api")]
    pub api_base: String,
    #[serde(default = "default_media_url")]
    pub media_url: String,
    /// 授权凭据；未配置时该曲库每次都以 WrongLicense 回退
    pub license_token: Option<String>,
    #[serde(default = "default_format")]
    pub format: TrackFormat,
    /// 首选格式未编码时是否降级
    #[serde(default = "default_true")]
    pub fallback_format: bool,
}

fn default_media_url() -> String {
    "https://media.deezer.com/v1/get_url".to_string()
}

fn default_format() -> TrackFormat {
    TrackFormat::Mp3_320
}

impl Default for LicensedSection {
    fn default() -> Self {
        Self {
            enabled: true,
            api_base: default_catalog_api(),
            media_url: default_media_url(),
            license_token: None,
            format: default_format(),
            fallback_format: true,
        }
    }
}

/// [providers.open_search] 段：外部提取工具与转码参数
#[derive(Debug, Clone, Deserialize)]
pub struct OpenSearchSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_extractor")]
    pub extractor: String,
    #[serde(default = "default_converter")]
    pub converter: String,
    #[serde(default = "default_audio_format")]
    pub audio_format: String,
    #[serde(default = "default_target_bitrate")]
    pub target_bitrate_kbps: u32,
}

fn default_extractor() -> String {
    "yt-dlp".to_string()
}

fn default_converter() -> String {
    "ffmpeg".to_string()
}

fn default_audio_format() -> String {
    "mp3".to_string()
}

fn default_target_bitrate() -> u32 {
    192
}

impl Default for OpenSearchSection {
    fn default() -> Self {
        Self {
            enabled: true,
            extractor: default_extractor(),
            converter: default_converter(),
            audio_format: default_audio_format(),
            target_bitrate_kbps: default_target_bitrate(),
        }
    }
}

/// 加载配置：默认文件 → 指定文件 → 环境变量，最后做一次校验
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml，找到则作为第一源
/// 2. 指定的 config_path 必须存在（写错路径应在启动时报错，而不是静默用默认值）
/// 3. 叠加环境变量，例如：
///    - `SONGFETCH__PROVIDERS__LICENSED__LICENSE_TOKEN=...`
///    - `SONGFETCH__PROVIDERS__OPEN_SEARCH__ENABLED=false`
///    - `SONGFETCH__TIMEOUTS__ATTEMPT_SECS=90`
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    if let Some(default) = ["config/default.toml", "../config/default.toml"]
        .into_iter()
        .map(Path::new)
        .find(|p| p.exists())
    {
        builder = builder.add_source(config::File::from(default).required(false));
    }

    if let Some(path) = config_path {
        builder = builder.add_source(config::File::from(path).required(true));
    }

    builder = builder.add_source(
        config::Environment::with_prefix("SONGFETCH")
            .separator("__")
            .try_parsing(true),
    );

    let cfg: AppConfig = builder.build()?.try_deserialize()?;
    cfg.validate()?;
    Ok(cfg)
}

impl AppConfig {
    /// 超时为 0 会让每次尝试立刻超时；开启的 HTTP 曲库必须有 api_base
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        let t = &self.timeouts;
        for (key, secs) in [
            ("timeouts.search_secs", t.search_secs),
            ("timeouts.download_secs", t.download_secs),
            ("timeouts.attempt_secs", t.attempt_secs),
            ("timeouts.extract_secs", t.extract_secs),
        ] {
            if secs == 0 {
                return Err(config::ConfigError::Message(format!("{} must be > 0", key)));
            }
        }
        let p = &self.providers;
        if p.primary.enabled && p.primary.api_base.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "providers.primary.api_base is empty".to_string(),
            ));
        }
        if p.licensed.enabled && p.licensed.api_base.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "providers.licensed.api_base is empty".to_string(),
            ));
        }
        if p.open_search.enabled && p.open_search.target_bitrate_kbps == 0 {
            return Err(config::ConfigError::Message(
                "providers.open_search.target_bitrate_kbps must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
