use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use control_logging::{control_debug, control_info};
use tempfile::NamedTempFile;

use crate::filename::local_file_name;
use crate::{Backend, BackendError, FailureKind};

/// Fetches `file_name` from the backend and stores it under `dir`.
pub async fn download_artifact(
    backend: &dyn Backend,
    dir: &Path,
    file_name: &str,
) -> Result<PathBuf, BackendError> {
    let bytes = backend.download(file_name).await?;
    let dir = dir.to_path_buf();
    let remote = file_name.to_string();
    let byte_len = bytes.len();

    let path = tokio::task::spawn_blocking(move || save_artifact(&dir, &remote, &bytes))
        .await
        .map_err(|err| BackendError::new(FailureKind::Write, err.to_string()))??;

    control_info!("Saved {} ({} bytes) to {}", file_name, byte_len, path.display());
    Ok(path)
}

/// Writes an artifact under its local name, replacing an earlier copy in one rename.
///
/// The directory is created on demand. A failed write leaves no partial file behind.
pub fn save_artifact(dir: &Path, remote_name: &str, bytes: &[u8]) -> Result<PathBuf, BackendError> {
    if dir.exists() && !dir.is_dir() {
        return Err(write_error(dir, "not a directory"));
    }
    fs::create_dir_all(dir).map_err(|err| write_error(dir, err))?;

    let target = dir.join(local_file_name(remote_name));
    let mut staged = NamedTempFile::new_in(dir).map_err(|err| write_error(dir, err))?;
    staged
        .write_all(bytes)
        .and_then(|()| staged.as_file_mut().sync_all())
        .map_err(|err| write_error(&target, err))?;

    if target.is_file() {
        control_debug!("Replacing earlier download {}", target.display());
    }
    staged
        .persist(&target)
        .map_err(|err| write_error(&target, err.error))?;
    Ok(target)
}

fn write_error(path: &Path, err: impl std::fmt::Display) -> BackendError {
    BackendError::new(FailureKind::Write, format!("{}: {err}", path.display()))
}
