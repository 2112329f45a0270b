use std::path::{Component, Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use uuid::Uuid;

/// Extension given to every stored photo.
pub const IMAGE_EXTENSION: &str = "jpg";

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("payload is not valid base64")]
    InvalidEncoding,
    #[error("file not found")]
    NotFound,
    #[error("file name does not resolve inside the storage directory")]
    InvalidName,
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Flat on-disk store for complaint photos.
///
/// Each photo lives at `{dir}/{uuid}.jpg`. Names are generated here and
/// never taken from clients, so concurrent writes cannot collide.
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    pub async fn new(dir: PathBuf) -> anyhow::Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Image storage directory: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Decode a base64 photo and write it under a fresh name.
    /// Nothing touches the disk unless decoding succeeds.
    pub async fn store(&self, payload: &str) -> Result<String, BlobError> {
        let bytes = decode_image(payload)?;

        fs::create_dir_all(&self.dir).await?;

        let name = format!("{}.{}", Uuid::new_v4().simple(), IMAGE_EXTENSION);
        let path = self.dir.join(&name);

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;

        let written: std::io::Result<()> = async {
            file.write_all(&bytes).await?;
            file.flush().await
        }
        .await;

        if let Err(e) = written {
            // Drop the partial file so no record can ever point at it
            if let Err(cleanup) = fs::remove_file(&path).await {
                warn!("Failed to remove partial image {}: {}", name, cleanup);
            }
            return Err(e.into());
        }

        info!("Stored image {} ({} bytes)", name, bytes.len());
        Ok(name)
    }

    pub async fn retrieve(&self, name: &str) -> Result<Vec<u8>, BlobError> {
        let path = self.resolve(name)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(BlobError::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a stored photo. Already-absent files are not an error.
    pub async fn remove(&self, name: &str) -> Result<(), BlobError> {
        let path = self.resolve(name)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!("Deleted image {}", name);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Image {} already gone", name);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Map a client-supplied name to a path strictly inside the storage dir.
    fn resolve(&self, name: &str) -> Result<PathBuf, BlobError> {
        if !is_safe_name(name) {
            return Err(BlobError::InvalidName);
        }
        Ok(self.dir.join(name))
    }
}

fn is_safe_name(name: &str) -> bool {
    if name.is_empty() || name.len() > 255 || name.starts_with('.') {
        return false;
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return false;
    }

    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Strict standard-alphabet base64, optionally wrapped in a
/// `data:<mime>;base64,` prefix as browsers produce.
pub fn decode_image(payload: &str) -> Result<Vec<u8>, BlobError> {
    let payload = payload.trim();
    let encoded = match payload.strip_prefix("data:") {
        Some(rest) => {
            rest.split_once(";base64,")
                .ok_or(BlobError::InvalidEncoding)?
                .1
        }
        None => payload,
    };

    let bytes = B64.decode(encoded).map_err(|_| BlobError::InvalidEncoding)?;
    if bytes.is_empty() {
        return Err(BlobError::InvalidEncoding);
    }
    Ok(bytes)
}

/// `Content-Type` to serve a stored file with, by extension.
pub fn content_type_for(name: &str) -> &'static str {
    match Path::new(name).extension().and_then(|e| e.to_str()) {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}
