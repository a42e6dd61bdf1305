use crate::models::AppData;
use crate::store::StoreError;
use std::path::Path;
use tokio::fs;
use tracing::error;

pub async fn load_data(path: &Path) -> AppData {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(data) => data,
            Err(err) => {
                error!(path = %path.display(), "failed to parse records file: {err}");
                AppData::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => AppData::default(),
        Err(err) => {
            error!(path = %path.display(), "failed to read records file: {err}");
            AppData::default()
        }
    }
}

pub async fn persist_data(path: &Path, data: &AppData) -> Result<(), StoreError> {
    let payload =
        serde_json::to_vec_pretty(data).map_err(|err| StoreError::Encode(err.to_string()))?;
    fs::write(path, payload)
        .await
        .map_err(|err| StoreError::Write(err.to_string()))?;
    Ok(())
}
