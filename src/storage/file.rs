use super::checkpoint::{CheckpointKey, Cursor};
use super::traits::{OffsetStore, OffsetStoreError};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Stores each cursor in its own file under a root directory.
///
/// Files live directly under the root, named by the escaped key: `svc/web/abc` is stored in
/// `<root>/svc%2Fweb%2Fabc`. Writes go through a temp file in the same directory followed by a
/// rename, which gives readers either the old or the new value and never a torn one.
#[derive(Debug, Clone)]
pub struct FileOffsetStore {
    root: PathBuf,
}

impl FileOffsetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The file holding `key`. The whole key becomes a single escaped file name, so keys that
    /// are prefixes of one another (`ns/web`, `ns/web/1`) never collide on disk.
    fn path_for(&self, key: &CheckpointKey) -> Result<PathBuf, OffsetStoreError> {
        if key.as_str().is_empty() {
            return Err(OffsetStoreError::InvalidKey {
                key: String::new(),
                reason: "empty key".to_string(),
            });
        }
        Ok(self.root.join(file_name_for(key.as_str())))
    }
}

/// Longest escaped name kept readable; longer keys are stored under their SHA-256.
const MAX_READABLE_NAME: usize = 200;

/// Escape every byte outside `[A-Za-z0-9_-]` as `%XX`.
///
/// `.` is escaped too, which keeps `.`/`..` and the `.cwtail-*.tmp` files out of the key space.
fn file_name_for(key: &str) -> String {
    let mut name = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            name.push(byte as char);
        } else {
            name.push_str(&format!("%{:02X}", byte));
        }
    }

    if name.len() > MAX_READABLE_NAME {
        format!("sha256-{}", hex::encode(Sha256::digest(key.as_bytes())))
    } else {
        name
    }
}

#[async_trait]
impl OffsetStore for FileOffsetStore {
    fn backend(&self) -> &'static str {
        "file"
    }

    async fn load_stored(&self, key: &CheckpointKey) -> Result<Option<Cursor>, OffsetStoreError> {
        let path = self.path_for(key)?;
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Cursor::decode(&contents)
            .map(Some)
            .map_err(|e| OffsetStoreError::Corrupt {
                key: key.to_string(),
                value: e.value,
            })
    }

    async fn save(&self, key: &CheckpointKey, cursor: Cursor) -> Result<(), OffsetStoreError> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.root).await?;

        let tmp_path = self.root.join(format!(".cwtail-{}.tmp", Uuid::new_v4()));
        let write_result = async {
            let mut file = tokio::fs::File::create(&tmp_path).await?;
            file.write_all(cursor.encode().as_bytes()).await?;
            file.sync_all().await?;
            tokio::fs::rename(&tmp_path, &path).await
        }
        .await;

        if let Err(e) = write_result {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }

        tracing::trace!(key = %key, cursor = %cursor, path = %path.display(), "Cursor written");
        Ok(())
    }
}
