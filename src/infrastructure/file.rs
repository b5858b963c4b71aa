use crate::domain::flow::FlowType;
use crate::domain::pending::PendingRequest;
use crate::domain::ports::PendingRequestStore;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tracing::warn;

/// Name of the lock file guarding the slots of one installation directory.
const LOCK_FILE: &str = ".payresume.lock";

/// A durable store keeping one JSON file per flow type in an installation directory.
///
/// Files are named after [`FlowType::storage_key`]. Writes land in a temporary file in the
/// same directory and are renamed over the slot, so a reader sees either the old record or the
/// new one.
///
/// Every operation holds an exclusive lock on `.payresume.lock` in the directory, so `take` and
/// `discard` stay atomic across processes and across independently opened handles. Clones of a
/// handle additionally queue on an in-process mutex, and the file system work runs on the
/// blocking pool.
#[derive(Clone)]
pub struct FilePendingStore {
    slots: Slots,
    lock: Arc<Mutex<()>>,
}

impl FilePendingStore {
    /// Opens the store, creating `dir` if needed.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            slots: Slots { dir },
            lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.slots.dir
    }

    /// Runs `op` on the blocking pool while holding both the in-process and the directory lock.
    async fn locked<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Slots) -> Result<T> + Send + 'static,
    {
        let _guard = self.lock.lock().await;
        let slots = self.slots.clone();
        tokio::task::spawn_blocking(move || {
            let _lock = slots.lock_exclusive()?;
            op(&slots)
        })
        .await
        .map_err(|e| PaymentError::InternalError(Box::new(e)))?
    }
}

/// Holds the directory lock until dropped.
struct DirLock(File);

impl Drop for DirLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.0);
    }
}

/// Synchronous slot access. Callers hold the directory lock.
#[derive(Clone)]
struct Slots {
    dir: PathBuf,
}

impl Slots {
    fn lock_exclusive(&self) -> Result<DirLock> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(self.dir.join(LOCK_FILE))?;
        file.lock_exclusive()?;
        Ok(DirLock(file))
    }

    fn slot(&self, flow_type: FlowType) -> PathBuf {
        self.dir.join(format!("{}.json", flow_type.storage_key()))
    }

    /// Reads a slot. A record that cannot be decoded is deleted before the error is returned.
    fn read(&self, flow_type: FlowType) -> Result<Option<PendingRequest>> {
        let path = self.slot(flow_type);
        let record = match fs::read_to_string(&path) {
            Ok(record) => record,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match PendingRequest::from_record(flow_type, &record) {
            Ok(request) => Ok(Some(request)),
            Err(err) => {
                warn!(flow = %flow_type, path = %path.display(), "removing corrupt pending record");
                self.remove(flow_type)?;
                Err(err)
            }
        }
    }

    fn write(&self, request: &PendingRequest) -> Result<()> {
        let record = request.to_record()?;
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(record.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.slot(request.flow_type))
            .map_err(|e| PaymentError::IoError(e.error))?;
        Ok(())
    }

    fn remove(&self, flow_type: FlowType) -> Result<()> {
        match fs::remove_file(self.slot(flow_type)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl PendingRequestStore for FilePendingStore {
    async fn put(&self, request: PendingRequest) -> Result<()> {
        self.locked(move |slots| slots.write(&request)).await
    }

    async fn get(&self, flow_type: FlowType) -> Result<Option<PendingRequest>> {
        self.locked(move |slots| slots.read(flow_type)).await
    }

    async fn clear(&self, flow_type: FlowType) -> Result<()> {
        self.locked(move |slots| slots.remove(flow_type)).await
    }

    async fn take(&self, flow_type: FlowType) -> Result<Option<PendingRequest>> {
        self.locked(move |slots| {
            let request = slots.read(flow_type)?;
            if request.is_some() {
                slots.remove(flow_type)?;
            }
            Ok(request)
        })
        .await
    }

    async fn discard(&self, request: &PendingRequest) -> Result<bool> {
        let request = request.clone();
        self.locked(move |slots| match slots.read(request.flow_type) {
            Ok(Some(stored)) if stored == request => {
                slots.remove(request.flow_type)?;
                Ok(true)
            }
            Ok(_) => Ok(false),
            // the unreadable record was already removed by `read`
            Err(PaymentError::CorruptRecord { .. }) => Ok(false),
            Err(err) => Err(err),
        })
        .await
    }
}
