#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

pub(crate) const DEFAULT_STORE_DIRNAME: &str = ".motions";

/// `--storage-dir` wins over `MOTION_STORAGE_DIR`; otherwise `.motions` under `cwd`.
pub(crate) fn resolve_storage_dir(
    flag: Option<PathBuf>,
    env: Option<String>,
    cwd: &Path,
) -> PathBuf {
    flag.or_else(|| env.map(PathBuf::from))
        .unwrap_or_else(|| cwd.join(DEFAULT_STORE_DIRNAME))
}

pub(crate) fn resolve_config_path(flag: Option<PathBuf>, env: Option<String>) -> Option<PathBuf> {
    flag.or_else(|| env.map(PathBuf::from))
}
