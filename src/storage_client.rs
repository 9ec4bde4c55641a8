use crate::config::StorageConfig;
use anyhow::{Context, Result};
#[cfg(feature = "mock")]
use mockall::automock;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    io::{BufReader, ErrorKind},
    path::{Path, PathBuf},
};
use thiserror::Error;
use trait_variant::make;

/// Why the key-value store failed to initialize.
#[derive(Debug, Error)]
pub enum StorageInitError {
    #[error("no free pages left in the backing store")]
    NoFreePages,
    #[error("backing store was written by an incompatible layout version")]
    VersionMismatch,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StorageInitError {
    /// True for conditions an erase-and-retry is expected to clear.
    pub fn erase_recovers(&self) -> bool {
        matches!(
            self,
            StorageInitError::NoFreePages | StorageInitError::VersionMismatch
        )
    }
}

/// Persistent key-value store backing any state that survives reboots.
///
/// `init` must run before any other collaborator; reinitialization after
/// an erase is a second `init` call.
#[make(Send)]
#[cfg_attr(feature = "mock", automock)]
pub trait StorageClient {
    async fn init(&self) -> Result<(), StorageInitError>;
    async fn erase(&self) -> Result<()>;
}

const STORE_FILE_NAME: &str = "kvstore.json";
const STORE_LAYOUT_VERSION: u32 = 1;

/// On-disk layout of the store file.
#[derive(Debug, Deserialize, Serialize)]
struct StoreFile {
    layout_version: u32,
    entries: BTreeMap<String, String>,
}

impl StoreFile {
    fn empty() -> Self {
        Self {
            layout_version: STORE_LAYOUT_VERSION,
            entries: BTreeMap::new(),
        }
    }
}

/// JSON-file key-value store.
///
/// Stands in for a flash-backed store: a bounded file whose init
/// distinguishes erase-recoverable conditions (capacity exhausted,
/// incompatible layout version) from plain corruption.
#[derive(Clone, Debug)]
pub struct FsKvStore {
    path: PathBuf,
    capacity_bytes: u64,
}

impl FsKvStore {
    pub fn new(settings: &StorageConfig) -> Self {
        Self {
            path: settings.data_dir.join(STORE_FILE_NAME),
            capacity_bytes: settings.capacity_bytes,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_fresh(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("failed to create store directory")?;
        }

        let file = fs::File::create(&self.path).context("failed to create store file")?;
        serde_json::to_writer_pretty(file, &StoreFile::empty())
            .context("failed to write store file")?;

        Ok(())
    }
}

impl StorageClient for FsKvStore {
    async fn init(&self) -> Result<(), StorageInitError> {
        let metadata = match fs::metadata(&self.path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return self.write_fresh().map_err(StorageInitError::Other);
            }
            Err(e) => {
                return Err(StorageInitError::Other(
                    anyhow::Error::new(e).context("failed to stat store file"),
                ));
            }
        };

        if metadata.len() > self.capacity_bytes {
            return Err(StorageInitError::NoFreePages);
        }

        let file = fs::File::open(&self.path)
            .context("failed to open store file")
            .map_err(StorageInitError::Other)?;

        let store: StoreFile = serde_json::from_reader(BufReader::new(file))
            .context("failed to parse store file")
            .map_err(StorageInitError::Other)?;

        if store.layout_version != STORE_LAYOUT_VERSION {
            return Err(StorageInitError::VersionMismatch);
        }

        Ok(())
    }

    async fn erase(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(anyhow::Error::new(e).context("failed to erase store file")),
        }
    }
}
