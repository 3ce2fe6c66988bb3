//! Filesystem media: asset resolution under a media root, and the originals archive.

use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use super::fs_json::temp_path_for;
use crate::domain::{AssetRef, QueueError};
use crate::ports::{AssetResolver, ImageArchive, ResolvedAsset};

/// Resolves references relative to `media_root`; public URLs hang off `base_url`.
///
/// Absolute references are taken as-is; their URL is derived only when they
/// live under `media_root`, otherwise a `file://` URL is returned.
#[derive(Debug, Clone)]
pub struct FsAssetResolver {
    media_root: PathBuf,
    base_url: String,
}

impl FsAssetResolver {
    pub fn new(media_root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            media_root: media_root.into(),
            base_url: base_url.into(),
        }
    }

    fn url_for(&self, path: &Path) -> String {
        match path.strip_prefix(&self.media_root) {
            Ok(relative) => {
                let relative = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                format!("{}/{}", self.base_url.trim_end_matches('/'), relative)
            }
            Err(_) => format!("file://{}", path.display()),
        }
    }
}

#[async_trait]
impl AssetResolver for FsAssetResolver {
    async fn resolve(&self, asset: &AssetRef) -> Result<Option<ResolvedAsset>, QueueError> {
        if asset.as_str().trim().is_empty() {
            return Ok(None);
        }
        let raw = Path::new(asset.as_str());
        let path = if raw.is_absolute() {
            raw.to_path_buf()
        } else {
            self.media_root.join(raw)
        };
        match fs::try_exists(&path).await {
            Ok(true) => {}
            Ok(false) => return Ok(None),
            Err(e) => return Err(QueueError::storage(&path, e)),
        }
        let url = self.url_for(&path);
        Ok(Some(ResolvedAsset { path, url }))
    }
}

/// Copies source photos into `dir`; an existing backup is never replaced.
#[derive(Debug, Clone)]
pub struct FsImageArchive {
    dir: PathBuf,
}

impl FsImageArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl ImageArchive for FsImageArchive {
    async fn preserve(&self, source: &Path, name: &str) -> Result<PathBuf, QueueError> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| QueueError::storage(&self.dir, e))?;
        let dest = self.dir.join(name);
        match fs::try_exists(&dest).await {
            Ok(true) => {
                debug!(dest = %dest.display(), "backup already present");
                return Ok(dest);
            }
            Ok(false) => {}
            Err(e) => return Err(QueueError::storage(&dest, e)),
        }

        // 一時ファイルにコピーしてから hard_link で公開（途中で落ちても欠けたバックアップを残さない）
        let tmp = temp_path_for(&dest);
        if let Err(e) = fs::copy(source, &tmp).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(QueueError::storage(source, e));
        }
        let linked = fs::hard_link(&tmp, &dest).await;
        if let Err(e) = fs::remove_file(&tmp).await {
            debug!(path = %tmp.display(), error = %e, "failed to remove temp file");
        }
        match linked {
            Ok(()) => Ok(dest),
            // 並行して別のバックアップが先に公開された
            Err(e) if e.kind() == IoErrorKind::AlreadyExists => Ok(dest),
            Err(e) => Err(QueueError::storage(&dest, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_relative_refs_with_url() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("2024/01")).unwrap();
        std::fs::write(tmp.path().join("2024/01/tyre.jpg"), b"jpg").unwrap();
        let resolver = FsAssetResolver::new(tmp.path(), "https://shop.example/uploads/");

        let asset = resolver
            .resolve(&AssetRef::new("2024/01/tyre.jpg"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(asset.path, tmp.path().join("2024/01/tyre.jpg"));
        assert_eq!(asset.url, "https://shop.example/uploads/2024/01/tyre.jpg");
        assert_eq!(asset.file_name(), Some("tyre.jpg"));
        assert_eq!(asset.extension(), Some("jpg"));
    }

    #[tokio::test]
    async fn missing_asset_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let resolver = FsAssetResolver::new(tmp.path(), "/uploads");
        assert!(resolver.resolve(&AssetRef::new("nope.png")).await.unwrap().is_none());
        assert!(resolver.resolve(&AssetRef::new("")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn archive_copies_once() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("photo.jpg");
        std::fs::write(&source, b"v1").unwrap();
        let archive = FsImageArchive::new(tmp.path().join("originals"));

        let dest = archive.preserve(&source, "t1.jpg").await.unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"v1");

        // 元画像が差し替えられてもバックアップは変わらない
        std::fs::write(&source, b"v2").unwrap();
        let again = archive.preserve(&source, "t1.jpg").await.unwrap();
        assert_eq!(again, dest);
        assert_eq!(std::fs::read(&dest).unwrap(), b"v1");
    }

    #[tokio::test]
    async fn archive_reports_missing_source() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = FsImageArchive::new(tmp.path().join("originals"));
        let err = archive
            .preserve(&tmp.path().join("gone.jpg"), "t1.jpg")
            .await
            .unwrap_err();
        assert!(matches!(err, QueueError::Storage { .. }));

        // 失敗しても宛先も一時ファイルも残らない
        let leftovers: Vec<_> = std::fs::read_dir(tmp.path().join("originals"))
            .unwrap()
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn archive_reports_unreadable_destination() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("photo.jpg");
        std::fs::write(&source, b"v1").unwrap();
        let dir = tmp.path().join("originals");
        std::fs::create_dir_all(&dir).unwrap();
        // a regular file where a directory is expected: the existence check itself fails
        std::fs::write(dir.join("t1.jpg"), b"old").unwrap();
        let archive = FsImageArchive::new(&dir);

        let dest = dir.join("t1.jpg").join("inner.jpg");
        let err = archive
            .preserve(&source, "t1.jpg/inner.jpg")
            .await
            .unwrap_err();
        assert!(matches!(err, QueueError::Storage { path, .. } if path == dest));
        assert_eq!(std::fs::read(dir.join("t1.jpg")).unwrap(), b"old");
    }
}
