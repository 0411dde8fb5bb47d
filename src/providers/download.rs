//! 流式下载：把远端音频按块写入工作目录内的指定文件

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;

use crate::core::{ProviderError, ProviderErrorKind};

/// 下载 url 到 dest，返回写入字节数；整个传输受 timeout 约束
pub async fn stream_to_file(
    client: &Client,
    url: &str,
    dest: &Path,
    timeout: Duration,
) -> Result<u64, ProviderError> {
    let resp = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| ProviderError::from_http(&e))?;
    if !resp.status().is_success() {
        return Err(ProviderError::new(
            ProviderErrorKind::Transport,
            format!("HTTP {} downloading {}", resp.status(), url),
        ));
    }

    let mut file = tokio::fs::File::create(dest)
        .await
        .map_err(|e| ProviderError::from_io(&e))?;
    let mut stream = resp.bytes_stream();
    let mut written: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| ProviderError::from_http(&e))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| ProviderError::from_io(&e))?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(|e| ProviderError::from_io(&e))?;

    tracing::debug!(url = %url, bytes = written, "download finished");
    Ok(written)
}

/// 按扩展名推断 MIME
pub fn mime_for_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "mp3" => "audio/mpeg",
        "flac" => "audio/flac",
        "m4a" | "aac" => "audio/mp4",
        "ogg" | "opus" => "audio/ogg",
        "wav" => "audio/wav",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_stream_to_file_writes_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/audio.mp3"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 4096]))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("out.mp3");
        let n = stream_to_file(
            &Client::new(),
            &format!("{}/audio.mp3", server.uri()),
            &dest,
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert_eq!(n, 4096);
        assert_eq!(std::fs::metadata(&dest).unwrap().len(), 4096);
    }

    #[tokio::test]
    async fn test_stream_to_file_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let err = stream_to_file(
            &Client::new(),
            &format!("{}/missing.mp3", server.uri()),
            &dir.path().join("out.mp3"),
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::Transport);
    }

    #[tokio::test]
    async fn test_stream_to_file_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(vec![1u8; 16])
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let err = stream_to_file(
            &Client::new(),
            &format!("{}/slow.mp3", server.uri()),
            &dir.path().join("out.mp3"),
            Duration::from_millis(50),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::Timeout);
    }

    #[test]
    fn test_mime_for_extension() {
        assert_eq!(mime_for_extension("MP3"), "audio/mpeg");
        assert_eq!(mime_for_extension("flac"), "audio/flac");
        assert_eq!(mime_for_extension("xyz"), "application/octet-stream");
    }
}
