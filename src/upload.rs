//! Photo upload storage module
//!
//! Persists uploaded photo bytes under generated filenames and serves
//! them back. Filenames are a millisecond timestamp plus a random
//! suffix plus the original extension, so collisions cannot occur under
//! normal operation. The directory is append-only; stored bytes are
//! never parsed or validated.

use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

/// Public URL prefix under which stored photos are served.
pub const PUBLIC_PREFIX: &str = "/photos";

pub struct PhotoStore {
    dir: PathBuf,
}

impl PhotoStore {
    /// Open the uploads directory, creating it if missing.
    pub fn open(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        if !dir.exists() {
            println!(
                "Uploads directory not found. Creating directory: {}",
                dir.display()
            );
            std::fs::create_dir_all(&dir)?;
        }
        Ok(Self { dir })
    }

    /// Store `data` under a generated filename and return that filename.
    ///
    /// The original filename contributes only its extension.
    pub async fn save(&self, original_name: &str, data: &[u8]) -> std::io::Result<String> {
        let extension = Path::new(original_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default();

        let filename = format!(
            "{}-{}{}",
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple(),
            extension
        );

        fs::write(self.dir.join(&filename), data).await?;
        Ok(filename)
    }

    /// Read a stored photo back for serving. Returns `None` for missing
    /// files and for any path that would escape the uploads directory.
    pub async fn load(&self, filename: &str) -> Option<Vec<u8>> {
        let clean = filename.trim_start_matches('/').replace("..", "");
        let path = self.dir.join(&clean);

        let dir_canonical = self.dir.canonicalize().ok()?;
        let path_canonical = path.canonicalize().ok()?;
        if !path_canonical.starts_with(&dir_canonical) {
            return None;
        }

        fs::read(&path_canonical).await.ok()
    }
}

/// Public path an item stores in its `photoUrl` field.
pub fn public_path(filename: &str) -> String {
    format!("{PUBLIC_PREFIX}/{filename}")
}
