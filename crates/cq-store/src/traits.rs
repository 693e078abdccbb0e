use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Content type used for every JSON document CineQuiz writes.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Bucket/key object store.
///
/// All implementations must satisfy these invariants:
/// - `put` replaces the whole object atomically; a cancelled or failed `put`
///   leaves the previous object (or its absence) observable.
/// - `get` of a missing object returns `Ok(None)`, not an error.
/// - No retries happen inside the store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Read an object. Returns `Ok(None)` if it does not exist.
    async fn get(&self, bucket: &str, key: &str) -> StoreResult<Option<Bytes>>;

    /// Create or replace an object.
    async fn put(&self, bucket: &str, key: &str, data: Bytes, content_type: &str)
        -> StoreResult<()>;

    /// List keys in `bucket` starting with `prefix`, sorted.
    async fn list(&self, bucket: &str, prefix: &str) -> StoreResult<Vec<String>>;

    /// Check whether an object exists.
    ///
    /// The default implementation lists by prefix, which only needs list
    /// permission on the bucket.
    async fn exists(&self, bucket: &str, key: &str) -> StoreResult<bool> {
        Ok(self.list(bucket, key).await?.iter().any(|k| k == key))
    }
}

/// Metadata about a bucket.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketInfo {
    pub name: String,
    /// Creation time as reported by the backend, if it reports one.
    pub created: Option<String>,
}

/// Bucket-level administration, used by the diagnostics routines.
#[async_trait]
pub trait BucketAdmin: Send + Sync {
    /// Look up a bucket. Returns `Ok(None)` if it does not exist.
    async fn bucket_info(&self, bucket: &str) -> StoreResult<Option<BucketInfo>>;

    /// Names of all buckets visible to the current credentials.
    async fn list_buckets(&self) -> StoreResult<Vec<String>>;

    /// Create a bucket.
    async fn create_bucket(&self, bucket: &str) -> StoreResult<BucketInfo>;
}

/// Reject keys that cannot map onto a relative object path.
pub fn validate_key(key: &str) -> StoreResult<()> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.chars().any(char::is_control)
        || key.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..");
    if bad {
        Err(StoreError::InvalidKey(key.to_string()))
    } else {
        Ok(())
    }
}

/// Reject bucket names that cannot map onto a single directory.
pub(crate) fn validate_bucket(bucket: &str) -> StoreResult<()> {
    if bucket.is_empty() || bucket.contains(['/', '\\']) || bucket == "." || bucket == ".." {
        Err(StoreError::BucketNotFound(bucket.to_string()))
    } else {
        Ok(())
    }
}
