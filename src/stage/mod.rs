mod http;
mod local;

pub use http::HttpStager;
pub use local::LocalStager;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::Result;

/// Trait for making an archive available as a local file before mounting
#[async_trait]
pub trait Stager: Send + Sync {
    /// Stage the archive, using `work_dir` for any copy that has to be made,
    /// and return the local path to mount
    async fn stage(&self, work_dir: &Path) -> Result<PathBuf>;

    /// Human-readable origin of the archive
    fn source(&self) -> &str;
}

/// Pick a stager for `location`: http(s) URLs are downloaded, anything else
/// is a local path.
pub fn for_location(location: &str) -> Result<Box<dyn Stager>> {
    if location.starts_with("http://") || location.starts_with("https://") {
        Ok(Box::new(HttpStager::new(location.to_string())?))
    } else {
        Ok(Box::new(LocalStager::new(location)))
    }
}
