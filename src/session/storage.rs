use std::{
    future::Future,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::{bail, Result};
use fs4::{lock_contended_error, tokio::AsyncFileExt};
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncWriteExt},
};
use tracing::{debug, info, warn};

use super::Document;

/// Interface for abstracting where documents are persisted. Persistence is best effort: a
/// document that can't be read back starts from zero instead of failing the session.
pub trait DocumentStorage {
    /// Loads the named document. Missing or unreadable documents come back empty.
    fn load(&self, name: &str) -> impl Future<Output = Result<Document>>;

    fn save(&self, document: &Document) -> impl Future<Output = Result<()>>;

    /// Held for as long as the document is owned, released on drop.
    type Claim;

    /// Takes ownership of the named document so no other process changes it behind the owner's
    /// back. Fails right away when someone else already owns it.
    fn claim(&self, name: &str) -> impl Future<Output = Result<Self::Claim>>;
}

/// Exclusive lock on the `.lock` file next to a document. Dropping it closes the file, which
/// releases the lock.
#[derive(Debug)]
pub struct DocumentClaim {
    _file: File,
}

/// Stores every document as a json file named after it.
pub struct DocumentStorageImpl {
    documents_dir: PathBuf,
}

impl DocumentStorageImpl {
    pub fn new(documents_dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&documents_dir)?;

        Ok(Self { documents_dir })
    }

    pub fn document_path(&self, name: &str) -> PathBuf {
        self.documents_dir.join(document_file_name(name))
    }

    fn claim_path(&self, name: &str) -> PathBuf {
        self.documents_dir
            .join(format!("{}.lock", document_file_name(name)))
    }

    async fn read_locked(path: &Path) -> std::result::Result<String, std::io::Error> {
        let mut file = File::open(path).await?;
        file.lock_shared()?;
        let mut content = String::new();
        let result = file.read_to_string(&mut content).await;
        file.unlock_async().await?;
        result.map(|_| content)
    }
}

impl DocumentStorage for DocumentStorageImpl {
    async fn load(&self, name: &str) -> Result<Document> {
        let path = self.document_path(name);
        debug!("Loading {path:?}");

        let content = match Self::read_locked(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Document::new(name)),
            Err(e) => Err(e)?,
        };

        match serde_json::from_str::<Document>(&content) {
            Ok(mut document) => {
                document.name = name.to_string();
                Ok(document)
            }
            Err(e) => {
                // Might happen if the process was killed in the middle of a save
                warn!("Document {path:?} is corrupted, starting from zero: {e}");
                Ok(Document::new(name))
            }
        }
    }

    async fn save(&self, document: &Document) -> Result<()> {
        let path = self.document_path(&document.name);
        let content = serde_json::to_vec_pretty(document)?;

        let mut file = File::options()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .await?;

        // Truncate only after the lock is held, so readers never see a half cleared file
        file.lock_exclusive()?;
        let result = async {
            file.set_len(0).await?;
            file.write_all(&content).await?;
            file.flush().await
        }
        .await;
        file.unlock_async().await?;
        result?;

        debug!("Saved {path:?}");
        Ok(())
    }

    type Claim = DocumentClaim;

    async fn claim(&self, name: &str) -> Result<DocumentClaim> {
        let path = self.claim_path(name);
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .await?;

        // Separate file from the document itself, so the owner can still lock the document for
        // its own saves
        match file.try_lock_exclusive() {
            Ok(()) => {
                info!("Claimed {name}");
                Ok(DocumentClaim { _file: file })
            }
            Err(e) if e.raw_os_error() == lock_contended_error().raw_os_error() => {
                bail!(
                    "{name} is being tracked right now. Stop tracking first, or send PRINT, COPY or RESET to the running tracker"
                )
            }
            Err(e) => Err(e)?,
        }
    }
}

/// Keeps names usable as file names on every platform.
fn document_file_name(name: &str) -> String {
    let name = name
        .chars()
        .map(|v| {
            if v.is_alphanumeric() || matches!(v, '-' | '_' | '.' | ' ') {
                v
            } else {
                '_'
            }
        })
        .collect::<String>();
    let name = name.trim();
    if name.is_empty() || name.chars().all(|v| v == '.') {
        "untitled.json".to_string()
    } else {
        format!("{name}.json")
    }
}
