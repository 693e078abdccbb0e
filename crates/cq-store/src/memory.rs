use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{SecondsFormat, Utc};

use crate::error::{StoreError, StoreResult};
use crate::traits::{validate_bucket, validate_key, BucketAdmin, BucketInfo, ObjectStore};

/// A stored object together with the content type it was written with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredBlob {
    pub data: Bytes,
    pub content_type: String,
}

#[derive(Default)]
struct Bucket {
    created: String,
    objects: BTreeMap<String, StoredBlob>,
}

/// Fault injection knobs for exercising error paths.
#[derive(Clone, Copy, Default)]
struct Faults {
    offline: bool,
    deny: bool,
    latency: Duration,
}

/// In-memory, map-based object store.
///
/// Intended for tests and embedding. Buckets must be created before objects
/// can be written to them, mirroring the remote service. Reads of a missing
/// bucket return `None`, as a remote 404 would.
pub struct InMemoryObjectStore {
    buckets: RwLock<BTreeMap<String, Bucket>>,
    faults: RwLock<Faults>,
    puts: AtomicU64,
}

impl InMemoryObjectStore {
    /// Create a new store with no buckets.
    pub fn new() -> Self {
        Self {
            buckets: RwLock::new(BTreeMap::new()),
            faults: RwLock::new(Faults::default()),
            puts: AtomicU64::new(0),
        }
    }

    /// Create a store with one empty bucket.
    pub fn with_bucket(bucket: &str) -> Self {
        let store = Self::new();
        store.insert_bucket(bucket);
        store
    }

    /// Create a bucket if it does not exist yet.
    pub fn insert_bucket(&self, bucket: &str) {
        if let Ok(mut buckets) = self.buckets.write() {
            buckets.entry(bucket.to_string()).or_insert_with(|| Bucket {
                created: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
                objects: BTreeMap::new(),
            });
        }
    }

    /// Make every subsequent call fail with [`StoreError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.update_faults(|f| f.offline = offline);
    }

    /// Make every subsequent call fail with [`StoreError::PermissionDenied`].
    pub fn set_access_denied(&self, deny: bool) {
        self.update_faults(|f| f.deny = deny);
    }

    /// Delay every subsequent call by `latency` before it touches the data.
    pub fn set_latency(&self, latency: Duration) {
        self.update_faults(|f| f.latency = latency);
    }

    /// Number of successful `put` calls so far.
    pub fn put_count(&self) -> u64 {
        self.puts.load(Ordering::SeqCst)
    }

    /// Read an object with its content type, bypassing fault injection.
    pub fn blob(&self, bucket: &str, key: &str) -> Option<StoredBlob> {
        let buckets = self.buckets.read().ok()?;
        buckets.get(bucket)?.objects.get(key).cloned()
    }

    /// Number of objects across all buckets.
    pub fn len(&self) -> usize {
        self.buckets
            .read()
            .map(|b| b.values().map(|bucket| bucket.objects.len()).sum())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn update_faults(&self, apply: impl FnOnce(&mut Faults)) {
        if let Ok(mut faults) = self.faults.write() {
            apply(&mut faults);
        }
    }

    /// Apply injected latency and failures. Must run before any lock is taken
    /// so no guard is held across the await.
    async fn gate(&self, op: &str) -> StoreResult<()> {
        let faults = *self.faults.read().map_err(poisoned)?;
        if !faults.latency.is_zero() {
            tokio::time::sleep(faults.latency).await;
        }
        if faults.offline {
            return Err(StoreError::Unavailable(format!("{op}: store is offline")));
        }
        if faults.deny {
            return Err(StoreError::PermissionDenied(format!("{op}: access denied")));
        }
        Ok(())
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("lock poisoned".into())
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get(&self, bucket: &str, key: &str) -> StoreResult<Option<Bytes>> {
        self.gate("get").await?;
        validate_key(key)?;
        let buckets = self.buckets.read().map_err(poisoned)?;
        Ok(buckets
            .get(bucket)
            .and_then(|b| b.objects.get(key))
            .map(|blob| blob.data.clone()))
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> StoreResult<()> {
        self.gate("put").await?;
        validate_key(key)?;
        let mut buckets = self.buckets.write().map_err(poisoned)?;
        let target = buckets
            .get_mut(bucket)
            .ok_or_else(|| StoreError::BucketNotFound(bucket.to_string()))?;
        target.objects.insert(
            key.to_string(),
            StoredBlob {
                data,
                content_type: content_type.to_string(),
            },
        );
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn list(&self, bucket: &str, prefix: &str) -> StoreResult<Vec<String>> {
        self.gate("list").await?;
        let buckets = self.buckets.read().map_err(poisoned)?;
        let target = buckets
            .get(bucket)
            .ok_or_else(|| StoreError::BucketNotFound(bucket.to_string()))?;
        Ok(target
            .objects
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }
}

#[async_trait]
impl BucketAdmin for InMemoryObjectStore {
    async fn bucket_info(&self, bucket: &str) -> StoreResult<Option<BucketInfo>> {
        self.gate("bucket_info").await?;
        let buckets = self.buckets.read().map_err(poisoned)?;
        Ok(buckets.get(bucket).map(|b| BucketInfo {
            name: bucket.to_string(),
            created: Some(b.created.clone()),
        }))
    }

    async fn list_buckets(&self) -> StoreResult<Vec<String>> {
        self.gate("list_buckets").await?;
        let buckets = self.buckets.read().map_err(poisoned)?;
        Ok(buckets.keys().cloned().collect())
    }

    async fn create_bucket(&self, bucket: &str) -> StoreResult<BucketInfo> {
        self.gate("create_bucket").await?;
        validate_bucket(bucket)?;
        self.insert_bucket(bucket);
        let buckets = self.buckets.read().map_err(poisoned)?;
        let created = buckets.get(bucket).map(|b| b.created.clone());
        Ok(BucketInfo {
            name: bucket.to_string(),
            created,
        })
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryObjectStore")
            .field("object_count", &self.len())
            .field("put_count", &self.put_count())
            .finish()
    }
}
