//! Render hosting.
//!
//! A STAC catalog only serves imagery; the presentation renders produced by
//! an analysis need somewhere to live. [`RenderHost`] is that somewhere.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;
use verdant_colormap::RgbaImage;
use verdant_core::{RenderHandle, RenderRequest};

use crate::error::{CloudError, Result};

/// Stores a render and returns a handle a client can resolve.
#[async_trait]
pub trait RenderHost: Send + Sync {
    async fn host(&self, request: &RenderRequest) -> Result<RenderHandle>;
}

/// Writes renders as PAM files into a local directory.
///
/// Handles are `file://` URLs. The file name is `{prefix}{slug}.pam`, so two
/// runs sharing a directory need distinct prefixes.
#[derive(Debug, Clone)]
pub struct DirectoryHost {
    dir: PathBuf,
    prefix: String,
}

impl DirectoryHost {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            prefix: String::new(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, request: &RenderRequest) -> PathBuf {
        self.dir
            .join(format!("{}{}.pam", self.prefix, request.kind.slug()))
    }
}

#[async_trait]
impl RenderHost for DirectoryHost {
    async fn host(&self, request: &RenderRequest) -> Result<RenderHandle> {
        let expected = request.width * request.height * 4;
        if request.rgba.len() != expected {
            return Err(CloudError::Render(format!(
                "{} render has {} bytes, expected {}",
                request.kind.slug(),
                request.rgba.len(),
                expected
            )));
        }

        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(request);
        let image = RgbaImage::from_raw(request.width, request.height, request.rgba.clone());
        tokio::fs::write(&path, image.to_pam()).await?;
        debug!(path = %path.display(), "render written");

        let absolute = match tokio::fs::canonicalize(&path).await {
            Ok(p) => p,
            Err(_) => path,
        };
        Ok(RenderHandle(format!("file://{}", absolute.display())))
    }
}
