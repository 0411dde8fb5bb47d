//! songfetch 命令行入口
//!
//! 初始化日志、加载配置并构建编排器（外部工具缺失会在这里直接失败），
//! 对命令行给出的查询执行一次 handle_query；交付成功时把文件复制到当前目录，随后 cleanup。

use anyhow::Context;
use songfetch::{create_orchestrator, observability, FinalOutcome};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let query = std::env::args().skip(1).collect::<Vec<_>>().join(" ");

    let orchestrator = create_orchestrator(None).context("Failed to set up providers")?;

    match orchestrator.handle_query(&query).await {
        FinalOutcome::Delivered(mut track) => {
            let name = track
                .file_name()
                .map(str::to_string)
                .unwrap_or_else(|| "track.mp3".to_string());
            let dest = std::env::current_dir()?.join(&name);
            let copied = async {
                let mut out = tokio::fs::File::create(&dest).await?;
                let n = tokio::io::copy(track.file(), &mut out).await?;
                Ok::<u64, std::io::Error>(n)
            }
            .await;
            let provider = track.provider();
            // 无论复制成功与否都要清理
            track.cleanup();
            let bytes = copied.with_context(|| format!("Failed to write {}", dest.display()))?;
            println!("{} ({} bytes, via {})", dest.display(), bytes, provider);
        }
        other => {
            if let Some(reason) = other.failure() {
                eprintln!("{}", reason.user_message());
            }
            std::process::exit(1);
        }
    }

    Ok(())
}
