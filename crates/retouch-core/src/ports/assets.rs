//! AssetResolver port - メディア参照をパスと公開 URL に解決

use std::path::PathBuf;

use async_trait::async_trait;

use crate::domain::{AssetRef, QueueError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAsset {
    pub path: PathBuf,
    pub url: String,
}

impl ResolvedAsset {
    /// Last path component, used for the `templates/` and `logos/` entries.
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|name| name.to_str())
    }

    pub fn extension(&self) -> Option<&str> {
        self.path.extension().and_then(|ext| ext.to_str())
    }
}

#[async_trait]
pub trait AssetResolver: Send + Sync {
    /// `Ok(None)` when the reference does not point at an existing asset.
    async fn resolve(&self, asset: &AssetRef) -> Result<Option<ResolvedAsset>, QueueError>;
}
