//! 工作目录：每次曲库尝试独占一个临时目录
//!
//! open 在 work_root 下创建带曲库前缀的目录；release 尽力递归删除（失败只记日志）；
//! transfer_ownership 把目录连同待交付文件一起移交给调用方，由 DeliveredTrack::cleanup 负责删除。

use std::path::Path;

use tempfile::TempDir;

use crate::core::ScopeError;

#[derive(Debug)]
pub struct WorkingScope {
    dir: TempDir,
}

impl WorkingScope {
    /// 在 root 下创建 `<prefix>-XXXXXX` 目录；root 不存在时先创建
    pub fn open(root: &Path, prefix: &str) -> Result<Self, ScopeError> {
        let io_err = |source| ScopeError::IoFailure {
            root: root.to_path_buf(),
            source,
        };
        std::fs::create_dir_all(root).map_err(io_err)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("{prefix}-"))
            .tempdir_in(root)
            .map_err(io_err)?;
        tracing::debug!(path = %dir.path().display(), "working scope opened");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// 尽力删除；删除失败不影响本次尝试的结果
    pub fn release(self) {
        let path = self.dir.path().to_path_buf();
        release_dir(self.dir, &path);
    }

    /// 移交所有权：目录不再随本次尝试结束而删除，改由调用方持有
    pub fn transfer_ownership(self) -> OwnedScope {
        OwnedScope { dir: Some(self.dir) }
    }
}

/// 已移交的工作目录；cleanup 或 Drop 时删除
#[derive(Debug)]
pub struct OwnedScope {
    dir: Option<TempDir>,
}

impl OwnedScope {
    pub fn cleanup(mut self) {
        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_path_buf();
            release_dir(dir, &path);
        }
    }
}

impl Drop for OwnedScope {
    fn drop(&mut self) {
        // 调用方忘记 cleanup 时兜底删除
        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_path_buf();
            tracing::debug!(path = %path.display(), "delivered scope dropped without cleanup");
            release_dir(dir, &path);
        }
    }
}

fn release_dir(dir: TempDir, path: &Path) {
    match dir.close() {
        Ok(()) => tracing::debug!(path = %path.display(), "working scope released"),
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to remove working scope"),
    }
}
