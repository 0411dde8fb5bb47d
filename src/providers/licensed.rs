//! 版权曲库：每首曲目都要经过授权/音质校验才能拿到下载地址
//!
//! 流程：搜索取第一条 → 按配置格式选定可用编码 → 向媒体接口申请下载描述 → 流式写入工作目录。
//! 版权、地区、码率、编码类的失败都精确区分为 WrongLicense / WrongGeolocation / NotAvailable /
//! WrongBitrate / NotEncoded，由分类器决定回退。

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::config::{LicensedSection, TimeoutsSection, TrackFormat};
use crate::core::{ProviderError, ProviderErrorKind, ProviderResult, Query};
use crate::providers::download::{mime_for_extension, stream_to_file};
use crate::providers::{ProviderAdapter, ProviderId};

/// 媒体接口的错误码
const ERR_LICENSE_RIGHTS: i64 = 2001;
const ERR_TRACK_RIGHTS: i64 = 2002;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<LicensedTrack>,
}

#[derive(Debug, Clone, Deserialize)]
struct LicensedTrack {
    id: u64,
    #[serde(default)]
    title: String,
    #[serde(default = "default_readable")]
    readable: bool,
    #[serde(default)]
    track_token: Option<String>,
    #[serde(default)]
    filesize_mp3_128: u64,
    #[serde(default)]
    filesize_mp3_320: u64,
    #[serde(default)]
    filesize_flac: u64,
}

fn default_readable() -> bool {
    true
}

impl LicensedTrack {
    fn filesize(&self, format: TrackFormat) -> u64 {
        match format {
            TrackFormat::Mp3_128 => self.filesize_mp3_128,
            TrackFormat::Mp3_320 => self.filesize_mp3_320,
            TrackFormat::Flac => self.filesize_flac,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MediaResponse {
    #[serde(default)]
    data: Vec<MediaEntry>,
}

#[derive(Debug, Deserialize)]
struct MediaEntry {
    #[serde(default)]
    media: Vec<MediaItem>,
    #[serde(default)]
    errors: Vec<MediaError>,
}

#[derive(Debug, Deserialize)]
struct MediaItem {
    #[serde(default)]
    sources: Vec<MediaSource>,
}

#[derive(Debug, Deserialize)]
struct MediaSource {
    url: String,
}

#[derive(Debug, Deserialize)]
struct MediaError {
    code: i64,
    #[serde(default)]
    message: String,
}

/// 按首选格式与是否允许降级，选出曲目实际可下载的格式
fn select_format(
    track: &LicensedTrack,
    preferred: TrackFormat,
    allow_fallback: bool,
) -> Result<TrackFormat, ProviderError> {
    let encoded_any = [TrackFormat::Flac, TrackFormat::Mp3_320, TrackFormat::Mp3_128]
        .iter()
        .any(|f| track.filesize(*f) > 0);
    if !encoded_any {
        return Err(ProviderError::new(
            ProviderErrorKind::NotEncoded,
            format!("track {} has no encoded formats", track.id),
        ));
    }
    let candidates: &[TrackFormat] = if allow_fallback {
        preferred.with_lower()
    } else {
        std::slice::from_ref(&preferred)
    };
    candidates
        .iter()
        .copied()
        .find(|f| track.filesize(*f) > 0)
        .ok_or_else(|| {
            ProviderError::new(
                ProviderErrorKind::WrongBitrate,
                format!("track {} not encoded as {}", track.id, preferred.wire_name()),
            )
        })
}

/// 媒体接口的错误码翻译
fn media_error_kind(code: i64) -> ProviderErrorKind {
    match code {
        ERR_LICENSE_RIGHTS => ProviderErrorKind::WrongLicense,
        ERR_TRACK_RIGHTS => ProviderErrorKind::WrongGeolocation,
        _ => ProviderErrorKind::Malformed,
    }
}

pub struct LicensedCatalog {
    client: Client,
    api_base: String,
    media_url: String,
    license_token: Option<String>,
    format: TrackFormat,
    fallback_format: bool,
    search_timeout: Duration,
    download_timeout: Duration,
}

impl LicensedCatalog {
    pub fn new(client: Client, section: &LicensedSection, timeouts: &TimeoutsSection) -> Self {
        Self {
            client,
            api_base: section.api_base.trim_end_matches('/').to_string(),
            media_url: section.media_url.clone(),
            license_token: section
                .license_token
                .clone()
                .filter(|t| !t.trim().is_empty()),
            format: section.format,
            fallback_format: section.fallback_format,
            search_timeout: timeouts.search(),
            download_timeout: timeouts.download(),
        }
    }

    async fn search(&self, query: &Query) -> Result<Option<LicensedTrack>, ProviderError> {
        let resp = self
            .client
            .get(format!("{}/search", self.api_base))
            .query(&[("q", query.as_str())])
            .timeout(self.search_timeout)
            .send()
            .await
            .map_err(|e| ProviderError::from_http(&e))?;
        if !resp.status().is_success() {
            return Err(ProviderError::new(
                ProviderErrorKind::Transport,
                format!("search HTTP {}", resp.status()),
            ));
        }
        let body: SearchResponse = resp.json().await.map_err(|e| ProviderError::from_http(&e))?;
        Ok(body.data.into_iter().next())
    }

    /// 申请下载描述，返回音频地址
    async fn resolve_url(
        &self,
        license_token: &str,
        track_token: &str,
        format: TrackFormat,
    ) -> Result<String, ProviderError> {
        let payload = serde_json::json!({
            "license_token": license_token,
            "media": [{
                "type": "FULL",
                "formats": [{"cipher": "NONE", "format": format.wire_name()}]
            }],
            "track_tokens": [track_token],
        });
        let resp = self
            .client
            .post(&self.media_url)
            .json(&payload)
            .timeout(self.search_timeout)
            .send()
            .await
            .map_err(|e| ProviderError::from_http(&e))?;
        if !resp.status().is_success() {
            return Err(ProviderError::new(
                ProviderErrorKind::Transport,
                format!("media HTTP {}", resp.status()),
            ));
        }
        let body: MediaResponse = resp.json().await.map_err(|e| ProviderError::from_http(&e))?;
        let entry = body.data.into_iter().next().ok_or_else(|| {
            ProviderError::new(ProviderErrorKind::Malformed, "media response has no entries")
        })?;

        if let Some(err) = entry.errors.first() {
            return Err(ProviderError::new(
                media_error_kind(err.code),
                format!("media error {}: {}", err.code, err.message),
            ));
        }

        entry
            .media
            .into_iter()
            .flat_map(|m| m.sources)
            .map(|s| s.url)
            .find(|u| !u.trim().is_empty())
            .ok_or_else(|| {
                ProviderError::new(ProviderErrorKind::NotAvailable, "no media sources returned")
            })
    }

    async fn fetch_inner(&self, query: &Query, scope_dir: &Path) -> Result<ProviderResult, ProviderError> {
        let Some(track) = self.search(query).await? else {
            return Ok(ProviderResult::Empty);
        };
        tracing::info!(id = track.id, title = %track.title, "licensed catalog match");

        let track_token = match track.track_token.as_deref() {
            Some(t) if track.readable && !t.is_empty() => t,
            _ => {
                return Err(ProviderError::new(
                    ProviderErrorKind::NotAvailable,
                    format!("track {} is not readable", track.id),
                ))
            }
        };
        let license_token = self.license_token.as_deref().ok_or_else(|| {
            ProviderError::new(ProviderErrorKind::WrongLicense, "no license token configured")
        })?;

        let format = select_format(&track, self.format, self.fallback_format)?;
        if format != self.format {
            tracing::info!(
                id = track.id,
                preferred = self.format.wire_name(),
                actual = format.wire_name(),
                "licensed catalog format downgraded"
            );
        }

        let url = self.resolve_url(license_token, track_token, format).await?;
        let dest = scope_dir.join(format!("{}.{}", track.id, format.extension()));
        stream_to_file(&self.client, &url, &dest, self.download_timeout).await?;
        Ok(ProviderResult::from_written_file(dest, mime_for_extension(format.extension())).await)
    }
}

#[async_trait]
impl ProviderAdapter for LicensedCatalog {
    fn id(&self) -> ProviderId {
        ProviderId::LicensedCatalog
    }

    async fn fetch(&self, query: &Query, scope_dir: &Path) -> ProviderResult {
        self.fetch_inner(query, scope_dir)
            .await
            .unwrap_or_else(ProviderResult::from)
    }
}
