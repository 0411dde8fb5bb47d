//! 开放曲库：公开搜索接口，无需鉴权
//!
//! 取第一条匹配，直接使用其自带的 preview 音频地址（不走任何授权接口），流式写入工作目录。

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::config::{PrimarySection, TimeoutsSection};
use crate::core::{ProviderError, ProviderErrorKind, ProviderResult, Query};
use crate::providers::download::{mime_for_extension, stream_to_file};
use crate::providers::{ProviderAdapter, ProviderId};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<CatalogTrack>,
}

#[derive(Debug, Deserialize)]
struct CatalogTrack {
    id: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    preview: Option<String>,
    #[serde(default)]
    artist: Option<CatalogArtist>,
}

#[derive(Debug, Deserialize)]
struct CatalogArtist {
    #[serde(default)]
    name: String,
}

pub struct PrimaryCatalog {
    client: Client,
    api_base: String,
    search_timeout: Duration,
    download_timeout: Duration,
}

impl PrimaryCatalog {
    pub fn new(client: Client, section: &PrimarySection, timeouts: &TimeoutsSection) -> Self {
        Self {
            client,
            api_base: section.api_base.trim_end_matches('/').to_string(),
            search_timeout: timeouts.search(),
            download_timeout: timeouts.download(),
        }
    }

    async fn search(&self, query: &Query) -> Result<Option<CatalogTrack>, ProviderError> {
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

    async fn fetch_inner(&self, query: &Query, scope_dir: &Path) -> Result<ProviderResult, ProviderError> {
        let Some(track) = self.search(query).await? else {
            return Ok(ProviderResult::Empty);
        };
        let artist = track.artist.as_ref().map(|a| a.name.as_str()).unwrap_or("");
        tracing::info!(id = track.id, title = %track.title, artist = %artist, "primary catalog match");

        let url = match track.preview.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => url.to_string(),
            _ => {
                return Err(ProviderError::new(
                    ProviderErrorKind::NoDownloadUrl,
                    format!("track {} has no audio asset", track.id),
                ))
            }
        };

        let dest = scope_dir.join(format!("{}.mp3", track.id));
        stream_to_file(&self.client, &url, &dest, self.download_timeout).await?;
        Ok(ProviderResult::from_written_file(dest, mime_for_extension("mp3")).await)
    }
}

#[async_trait]
impl ProviderAdapter for PrimaryCatalog {
    fn id(&self) -> ProviderId {
        ProviderId::PrimaryCatalog
    }

    async fn fetch(&self, query: &Query, scope_dir: &Path) -> ProviderResult {
        self.fetch_inner(query, scope_dir)
            .await
            .unwrap_or_else(ProviderResult::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn catalog(server: &MockServer) -> PrimaryCatalog {
        let section = PrimarySection {
            enabled: true,
            api_base: server.uri(),
        };
        PrimaryCatalog::new(Client::new(), &section, &TimeoutsSection::default())
    }

    #[tokio::test]
    async fn test_first_match_preview_is_downloaded() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "data": [
                {"id": 1, "title": "Imagine", "preview": format!("{}/preview/1.mp3", server.uri()), "artist": {"name": "John Lennon"}},
                {"id": 2, "title": "Imagine (Live)", "preview": format!("{}/preview/2.mp3", server.uri())}
            ]
        });
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "Imagine"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/preview/1.mp3"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3-audio".to_vec()))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let query = Query::new("Imagine").unwrap();
        let result = catalog(&server).fetch(&query, dir.path()).await;
        match result {
            ProviderResult::Success { file_path, mime_hint } => {
                assert_eq!(file_path, dir.path().join("1.mp3"));
                assert_eq!(mime_hint, "audio/mpeg");
                assert_eq!(std::fs::read(&file_path).unwrap(), b"ID3-audio");
            }
            other => panic!("Expected Success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_no_matches_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": []})))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let query = Query::new("zzzz").unwrap();
        assert_eq!(catalog(&server).fetch(&query, dir.path()).await, ProviderResult::Empty);
    }

    #[tokio::test]
    async fn test_match_without_preview() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"data": [{"id": 9, "title": "Silent", "preview": ""}]}),
            ))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let query = Query::new("Silent").unwrap();
        match catalog(&server).fetch(&query, dir.path()).await {
            ProviderResult::Error(e) => assert_eq!(e.kind, ProviderErrorKind::NoDownloadUrl),
            other => panic!("Expected NoDownloadUrl, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_server_error_is_transport() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let query = Query::new("Imagine").unwrap();
        match catalog(&server).fetch(&query, dir.path()).await {
            ProviderResult::Error(e) => assert_eq!(e.kind, ProviderErrorKind::Transport),
            other => panic!("Expected Transport, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not valid json"))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let query = Query::new("Imagine").unwrap();
        match catalog(&server).fetch(&query, dir.path()).await {
            ProviderResult::Error(e) => assert_eq!(e.kind, ProviderErrorKind::Malformed),
            other => panic!("Expected Malformed, got {:?}", other),
        }
    }
}
