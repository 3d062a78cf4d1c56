use super::Stager;
use crate::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Stager for archives that already live on the local filesystem
pub struct LocalStager {
    path: PathBuf,
    display: String,
}

impl LocalStager {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let display = path.display().to_string();
        Self { path, display }
    }
}

#[async_trait]
impl Stager for LocalStager {
    async fn stage(&self, _work_dir: &Path) -> Result<PathBuf> {
        // A missing file is not an error here: it mounts as an empty archive
        debug!(path = %self.display, "using local archive in place");
        Ok(self.path.clone())
    }

    fn source(&self) -> &str {
        &self.display
    }
}
