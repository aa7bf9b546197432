use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{error, trace};

/// Write `data` to `path` as pretty JSON.
///
/// The bytes go to a sibling `.tmp` file first, which is renamed over `path` once fully
/// written, so a failed run never leaves a half-written report behind.
pub async fn write_json<T: serde::Serialize>(path: &Path, data: &T) -> crate::error::Result<()> {
    let bytes = serde_json::to_vec_pretty(data)?;

    // ensure the directory exists
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        trace!("checking directory path: {dir:?}");
        tokio::fs::create_dir_all(dir).await?;
    }

    let tmp = tmp_path(path);
    trace!("writing {} bytes to {tmp:?}", bytes.len());
    let result = async {
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&bytes).await?;
        file.write_all(b"\n").await?;
        file.sync_all().await?;
        tokio::fs::rename(&tmp, path).await
    }
    .await;

    if let Err(err) = result {
        error!("failed to write {path:?}, error({err})");
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(err.into());
    }

    Ok(())
}

/// Reads a `.json` file from `path`.
pub async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> crate::error::Result<T> {
    trace!("reading file path: {path:?}");
    let file = tokio::fs::read(path).await?;
    trace!("file read; deserializing bytes ...");
    let data: T = serde_json::from_slice(&file)?;
    Ok(data)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
