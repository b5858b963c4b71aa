use crate::domain::flow::FlowType;
use crate::domain::pending::PendingRequest;
use crate::domain::ports::PendingRequestStore;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

/// Column Family holding one record per flow type.
pub const CF_PENDING: &str = "pending_requests";

/// A persistent pending request store implementation using RocksDB.
///
/// Records are kept in the `pending_requests` column family under
/// [`FlowType::storage_key`], with the serialized [`PendingRequest`] as value.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`). The read-modify-write
/// operations `take` and `discard` are serialized by a mutex shared between clones.
#[derive(Clone)]
pub struct RocksDBPendingStore {
    db: Arc<DB>,
    lock: Arc<Mutex<()>>,
}

impl RocksDBPendingStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the `pending_requests` column family exists.
    ///
    /// # Arguments
    ///
    /// * `path` - The filesystem path where the database will be stored.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_pending = ColumnFamilyDescriptor::new(CF_PENDING, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf_pending])?;

        Ok(Self {
            db: Arc::new(db),
            lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self) -> Result<&rocksdb::ColumnFamily> {
        self.db.cf_handle(CF_PENDING).ok_or_else(|| {
            PaymentError::InternalError(Box::new(std::io::Error::other(
                "Pending requests column family not found",
            )))
        })
    }

    fn read(&self, flow_type: FlowType) -> Result<Option<PendingRequest>> {
        let cf = self.cf()?;
        let key = flow_type.storage_key();
        let Some(bytes) = self.db.get_cf(cf, key.as_bytes())? else {
            return Ok(None);
        };

        let decoded = String::from_utf8(bytes)
            .map_err(|e| PaymentError::CorruptRecord {
                flow: flow_type,
                reason: e.to_string(),
            })
            .and_then(|record| PendingRequest::from_record(flow_type, &record));
        match decoded {
            Ok(request) => Ok(Some(request)),
            Err(err) => {
                warn!(flow = %flow_type, "removing corrupt pending record");
                self.db.delete_cf(cf, key.as_bytes())?;
                Err(err)
            }
        }
    }

    fn remove(&self, flow_type: FlowType) -> Result<()> {
        let cf = self.cf()?;
        self.db.delete_cf(cf, flow_type.storage_key().as_bytes())?;
        Ok(())
    }
}

#[async_trait]
impl PendingRequestStore for RocksDBPendingStore {
    async fn put(&self, request: PendingRequest) -> Result<()> {
        let _guard = self.lock.lock().await;
        let cf = self.cf()?;
        let record = request.to_record()?;
        self.db
            .put_cf(cf, request.flow_type.storage_key().as_bytes(), record.as_bytes())?;
        Ok(())
    }

    async fn get(&self, flow_type: FlowType) -> Result<Option<PendingRequest>> {
        let _guard = self.lock.lock().await;
        self.read(flow_type)
    }

    async fn clear(&self, flow_type: FlowType) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.remove(flow_type)
    }

    async fn take(&self, flow_type: FlowType) -> Result<Option<PendingRequest>> {
        let _guard = self.lock.lock().await;
        let request = self.read(flow_type)?;
        if request.is_some() {
            self.remove(flow_type)?;
        }
        Ok(request)
    }

    async fn discard(&self, request: &PendingRequest) -> Result<bool> {
        let _guard = self.lock.lock().await;
        match self.read(request.flow_type) {
            Ok(Some(stored)) if &stored == request => {
                self.remove(request.flow_type)?;
                Ok(true)
            }
            Ok(_) | Err(PaymentError::CorruptRecord { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }
}
