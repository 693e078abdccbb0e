//! Bucket diagnostics: check that the configured bucket is reachable and
//! optionally create it.

use std::fmt;

use tracing::{info, warn};

use crate::error::{StoreError, StoreResult};
use crate::traits::{BucketAdmin, BucketInfo};

/// Outcome of [`verify_bucket`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BucketStatus {
    /// The bucket exists.
    Found { info: BucketInfo },
    /// The bucket does not exist; these are the buckets that do.
    Missing { available: Vec<String> },
    /// The credentials can see no buckets at all.
    NoBuckets,
    /// The credentials were rejected.
    PermissionDenied,
    /// The backend could not be reached.
    Unreachable { reason: String },
}

impl BucketStatus {
    pub fn is_found(&self) -> bool {
        matches!(self, BucketStatus::Found { .. })
    }
}

impl fmt::Display for BucketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BucketStatus::Found { info } => match &info.created {
                Some(created) => write!(f, "bucket {} found (created {created})", info.name),
                None => write!(f, "bucket {} found", info.name),
            },
            BucketStatus::Missing { available } if available.is_empty() => {
                f.write_str("bucket not found")
            }
            BucketStatus::Missing { available } => {
                write!(f, "bucket not found; available: {}", available.join(", "))
            }
            BucketStatus::NoBuckets => f.write_str("no buckets found in project"),
            BucketStatus::PermissionDenied => f.write_str("permission denied"),
            BucketStatus::Unreachable { reason } => write!(f, "storage unreachable: {reason}"),
        }
    }
}

/// Report whether `bucket` exists. When it does not, list what does exist so
/// an operator can spot a misconfigured name.
pub async fn verify_bucket(admin: &dyn BucketAdmin, bucket: &str) -> BucketStatus {
    let lookup = match admin.bucket_info(bucket).await {
        Ok(Some(info)) => {
            info!(bucket, created = ?info.created, "bucket found");
            return BucketStatus::Found { info };
        }
        Ok(None) => None,
        Err(e) => {
            warn!(bucket, error = %e, "bucket lookup failed");
            Some(e)
        }
    };

    match admin.list_buckets().await {
        Ok(available) if available.is_empty() => BucketStatus::NoBuckets,
        Ok(available) => {
            warn!(bucket, ?available, "bucket missing");
            BucketStatus::Missing { available }
        }
        Err(list_err) => match lookup {
            Some(StoreError::PermissionDenied(_)) => BucketStatus::PermissionDenied,
            None | Some(StoreError::BucketNotFound(_)) => BucketStatus::Missing {
                available: Vec::new(),
            },
            Some(e) => {
                warn!(error = %list_err, "bucket listing failed");
                BucketStatus::Unreachable {
                    reason: e.to_string(),
                }
            }
        },
    }
}

/// Make sure `bucket` exists, creating it if necessary.
///
/// Returns `Ok(true)` if the bucket exists afterwards and `Ok(false)` if it
/// could not be created or the credentials may not inspect it. Other lookup
/// failures are returned as errors.
pub async fn ensure_bucket(admin: &dyn BucketAdmin, bucket: &str) -> StoreResult<bool> {
    match admin.bucket_info(bucket).await {
        Ok(Some(_)) => Ok(true),
        Ok(None) => match admin.create_bucket(bucket).await {
            Ok(info) => {
                info!(bucket = %info.name, "bucket created");
                Ok(true)
            }
            Err(e) => {
                warn!(bucket, error = %e, "bucket creation failed");
                Ok(false)
            }
        },
        Err(StoreError::PermissionDenied(reason)) => {
            warn!(bucket, %reason, "not allowed to inspect bucket");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryObjectStore;

    #[tokio::test]
    async fn found() {
        let store = InMemoryObjectStore::with_bucket("cinequiz");
        let status = verify_bucket(&store, "cinequiz").await;
        assert!(status.is_found());
        assert!(status.to_string().starts_with("bucket cinequiz found"));
    }

    #[tokio::test]
    async fn missing_lists_alternatives() {
        let store = InMemoryObjectStore::with_bucket("cinequizroyale-bucket-1");
        store.insert_bucket("cinequizroyale-1");
        let status = verify_bucket(&store, "cinequizroyale-bucket-2").await;
        assert_eq!(
            status,
            BucketStatus::Missing {
                available: vec!["cinequizroyale-1".into(), "cinequizroyale-bucket-1".into()]
            }
        );
    }

    #[tokio::test]
    async fn no_buckets() {
        let store = InMemoryObjectStore::new();
        assert_eq!(verify_bucket(&store, "cinequiz").await, BucketStatus::NoBuckets);
    }

    #[tokio::test]
    async fn denied_and_offline() {
        let store = InMemoryObjectStore::with_bucket("cinequiz");
        store.set_access_denied(true);
        assert_eq!(
            verify_bucket(&store, "cinequiz").await,
            BucketStatus::PermissionDenied
        );

        store.set_access_denied(false);
        store.set_offline(true);
        assert!(matches!(
            verify_bucket(&store, "cinequiz").await,
            BucketStatus::Unreachable { .. }
        ));
    }

    #[tokio::test]
    async fn ensure_creates_once() {
        let store = InMemoryObjectStore::new();
        assert!(ensure_bucket(&store, "cinequiz").await.unwrap());
        assert!(ensure_bucket(&store, "cinequiz").await.unwrap());
        assert_eq!(store.list_buckets().await.unwrap(), vec!["cinequiz"]);
    }

    #[tokio::test]
    async fn ensure_reports_denied_and_propagates_outage() {
        let store = InMemoryObjectStore::new();
        store.set_access_denied(true);
        assert!(!ensure_bucket(&store, "cinequiz").await.unwrap());

        store.set_access_denied(false);
        store.set_offline(true);
        assert!(matches!(
            ensure_bucket(&store, "cinequiz").await,
            Err(StoreError::Unavailable(_))
        ));
    }
}
