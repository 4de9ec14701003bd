use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("model file not found: {0}")]
    NotFound(PathBuf),
    #[error("model {name} not found in {searched}")]
    NotCached { name: String, searched: PathBuf },
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// Resolve a model file, checking an explicit path before the cache directory.
///
/// Resolution order:
/// 1. Explicit path (from configuration); must exist if given
/// 2. User cache directory (platform-specific)
pub fn resolve(name: &str, explicit: Option<&Path>) -> Result<PathBuf, ModelResolveError> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return Err(ModelResolveError::NotFound(path.to_path_buf()));
    }
    resolve_in(name, &model_cache_dir()?)
}

fn resolve_in(name: &str, dir: &Path) -> Result<PathBuf, ModelResolveError> {
    let cached_path = dir.join(name);
    if cached_path.is_file() {
        Ok(cached_path)
    } else {
        Err(ModelResolveError::NotCached {
            name: name.to_string(),
            searched: dir.to_path_buf(),
        })
    }
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/FaceMood/models/`
/// - Linux: `$XDG_CACHE_HOME/FaceMood/models/` or `~/.cache/FaceMood/models/`
/// - Windows: `%LOCALAPPDATA%/FaceMood/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    {
        dirs::data_dir()
            .map(|d| d.join("FaceMood").join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
    #[cfg(not(target_os = "macos"))]
    {
        dirs::cache_dir()
            .map(|d| d.join("FaceMood").join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
}
