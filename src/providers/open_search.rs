//! 开放搜索兜底：调用外部提取工具搜索视频/音频平台，取排名第一的结果，
//! 提取最佳音轨并按固定码率转码为统一格式。
//!
//! 覆盖面最广但延迟最高，且依赖外部二进制，所以排在最后。工具是否存在在启动时检查（check_tooling），
//! 而不是每个查询再发现。输出路径由工具通过 `--print after_move:filepath` 明确打印，不扫描目录。

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::{OpenSearchSection, TimeoutsSection};
use crate::core::{ProviderErrorKind, ProviderResult, Query, SetupError};
use crate::providers::download::mime_for_extension;
use crate::providers::{ProviderAdapter, ProviderId};

/// stderr 摘要最多保留的字符数
const STDERR_PREVIEW_CHARS: usize = 400;

/// 启动时检查提取工具与转码工具都在 PATH 上（或为可执行的绝对路径）
pub fn check_tooling(section: &OpenSearchSection) -> Result<(PathBuf, PathBuf), SetupError> {
    let resolve = |name: &str| {
        which::which(name).map_err(|_| SetupError::ToolingUnavailable(name.to_string()))
    };
    let extractor = resolve(&section.extractor)?;
    let converter = resolve(&section.converter)?;
    tracing::debug!(extractor = %extractor.display(), converter = %converter.display(), "open search tooling found");
    Ok((extractor, converter))
}

pub struct OpenSearchFallback {
    extractor: PathBuf,
    converter: PathBuf,
    audio_format: String,
    target_bitrate_kbps: u32,
    timeout: Duration,
}

impl OpenSearchFallback {
    /// 先通过 check_tooling 解析工具路径
    pub fn new(
        section: &OpenSearchSection,
        timeouts: &TimeoutsSection,
        extractor: PathBuf,
        converter: PathBuf,
    ) -> Self {
        Self {
            extractor,
            converter,
            audio_format: section.audio_format.clone(),
            target_bitrate_kbps: section.target_bitrate_kbps,
            timeout: timeouts.extract(),
        }
    }

    fn build_args(&self, query: &Query, scope_dir: &Path) -> Vec<String> {
        let template = scope_dir.join("%(id)s.%(ext)s");
        vec![
            format!("ytsearch1:{}", query.as_str()),
            "-x".to_string(),
            "--audio-format".to_string(),
            self.audio_format.clone(),
            "--audio-quality".to_string(),
            format!("{}K", self.target_bitrate_kbps),
            "--no-playlist".to_string(),
            "--no-progress".to_string(),
            "--ffmpeg-location".to_string(),
            self.converter.display().to_string(),
            "-o".to_string(),
            template.display().to_string(),
            "--print".to_string(),
            "after_move:filepath".to_string(),
        ]
    }

    async fn run(&self, query: &Query, scope_dir: &Path) -> ProviderResult {
        let args = self.build_args(query, scope_dir);
        tracing::info!(extractor = %self.extractor.display(), query = %query, "open search extract");

        let mut cmd = Command::new(&self.extractor);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Err(_) => {
                return ProviderResult::error(
                    ProviderErrorKind::Timeout,
                    format!("extractor timed out after {}s", self.timeout.as_secs()),
                )
            }
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return ProviderResult::error(
                    ProviderErrorKind::ToolingUnavailable,
                    format!("{}: {}", self.extractor.display(), e),
                )
            }
            Ok(Err(e)) => {
                return ProviderResult::error(ProviderErrorKind::Io, format!("spawn extractor: {e}"))
            }
            Ok(Ok(output)) => output,
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return ProviderResult::error(
                ProviderErrorKind::ExtractionFailed,
                format!("Exit {:?}: {}", output.status.code(), stderr_preview(&stderr)),
            );
        }

        match printed_path(&stdout) {
            None => ProviderResult::Empty,
            Some(path) => {
                let mime = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(mime_for_extension)
                    .unwrap_or("application/octet-stream");
                if !path.starts_with(scope_dir) {
                    return ProviderResult::error(
                        ProviderErrorKind::ExtractionFailed,
                        format!("extractor wrote outside scope: {}", path.display()),
                    );
                }
                ProviderResult::from_written_file(path, mime).await
            }
        }
    }
}

/// 工具打印的最后一个非空行即输出文件路径
fn printed_path(stdout: &str) -> Option<PathBuf> {
    stdout
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(PathBuf::from)
}

fn stderr_preview(stderr: &str) -> String {
    let s = stderr.trim();
    if s.chars().count() > STDERR_PREVIEW_CHARS {
        format!("{}...", s.chars().take(STDERR_PREVIEW_CHARS).collect::<String>())
    } else {
        s.to_string()
    }
}

#[async_trait]
impl ProviderAdapter for OpenSearchFallback {
    fn id(&self) -> ProviderId {
        ProviderId::OpenSearchFallback
    }

    async fn fetch(&self, query: &Query, scope_dir: &Path) -> ProviderResult {
        self.run(query, scope_dir).await
    }
}
