use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{StoreError, StoreResult};
use crate::traits::{validate_bucket, validate_key, BucketAdmin, BucketInfo, ObjectStore};

/// Prefix of in-flight temp files; they are never listed as objects.
const TEMP_PREFIX: &str = ".cq-tmp";

/// Filesystem-backed object store.
///
/// Layout: `root/<bucket>/<key>`, where `/` in the key becomes a directory
/// separator. Each `put` writes a temp file in the destination directory,
/// syncs it, and renames it over the target, so readers only ever see a
/// complete object.
#[derive(Clone, Debug)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bucket_dir(&self, bucket: &str) -> StoreResult<PathBuf> {
        validate_bucket(bucket)?;
        Ok(self.root.join(bucket))
    }

    fn object_path(&self, bucket: &str, key: &str) -> StoreResult<PathBuf> {
        validate_key(key)?;
        let mut path = self.bucket_dir(bucket)?;
        path.extend(key.split('/'));
        Ok(path)
    }

    async fn blocking<T, F>(&self, op: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce() -> StoreResult<T> + Send + 'static,
    {
        tokio::task::spawn_blocking(op)
            .await
            .map_err(|e| StoreError::Unavailable(format!("blocking task failed: {e}")))?
    }
}

fn read_object(path: &Path) -> StoreResult<Option<Bytes>> {
    match fs::read(path) {
        Ok(data) => Ok(Some(Bytes::from(data))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn write_object(bucket_dir: &Path, path: &Path, data: &[u8]) -> StoreResult<()> {
    if !bucket_dir.is_dir() {
        return Err(StoreError::BucketNotFound(
            bucket_dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        ));
    }
    let parent = path
        .parent()
        .ok_or_else(|| StoreError::InvalidKey(path.display().to_string()))?;
    fs::create_dir_all(parent)?;

    let mut tmp = tempfile::Builder::new().prefix(TEMP_PREFIX).tempfile_in(parent)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}

fn list_objects(bucket_dir: &Path, bucket: &str, prefix: &str) -> StoreResult<Vec<String>> {
    if !bucket_dir.is_dir() {
        return Err(StoreError::BucketNotFound(bucket.to_string()));
    }
    let mut keys = Vec::new();
    for entry in WalkDir::new(bucket_dir).min_depth(1) {
        let entry = entry.map_err(|e| StoreError::Io(io::Error::other(e.to_string())))?;
        if !entry.file_type().is_file() || entry.file_name().to_string_lossy().starts_with(TEMP_PREFIX)
        {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(bucket_dir) else {
            continue;
        };
        let key = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if key.starts_with(prefix) {
            keys.push(key);
        }
    }
    keys.sort();
    Ok(keys)
}

fn bucket_created(dir: &Path) -> Option<String> {
    let meta = fs::metadata(dir).ok()?;
    let time = meta.created().or_else(|_| meta.modified()).ok()?;
    Some(DateTime::<Utc>::from(time).to_rfc3339_opts(SecondsFormat::Secs, true))
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn get(&self, bucket: &str, key: &str) -> StoreResult<Option<Bytes>> {
        let path = self.object_path(bucket, key)?;
        self.blocking(move || read_object(&path)).await
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        _content_type: &str,
    ) -> StoreResult<()> {
        let bucket_dir = self.bucket_dir(bucket)?;
        let path = self.object_path(bucket, key)?;
        debug!(bucket, key, bytes = data.len(), "writing object");
        self.blocking(move || write_object(&bucket_dir, &path, &data))
            .await
    }

    async fn list(&self, bucket: &str, prefix: &str) -> StoreResult<Vec<String>> {
        let bucket_dir = self.bucket_dir(bucket)?;
        let (bucket, prefix) = (bucket.to_string(), prefix.to_string());
        self.blocking(move || list_objects(&bucket_dir, &bucket, &prefix))
            .await
    }
}

#[async_trait]
impl BucketAdmin for FsObjectStore {
    async fn bucket_info(&self, bucket: &str) -> StoreResult<Option<BucketInfo>> {
        let dir = self.bucket_dir(bucket)?;
        if !dir.is_dir() {
            return Ok(None);
        }
        Ok(Some(BucketInfo {
            name: bucket.to_string(),
            created: bucket_created(&dir),
        }))
    }

    async fn list_buckets(&self) -> StoreResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn create_bucket(&self, bucket: &str) -> StoreResult<BucketInfo> {
        let dir = self.bucket_dir(bucket)?;
        fs::create_dir_all(&dir)?;
        Ok(BucketInfo {
            name: bucket.to_string(),
            created: bucket_created(&dir),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::JSON_CONTENT_TYPE;

    fn temp_store() -> (tempfile::TempDir, FsObjectStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn put_then_get_nested_key() {
        let (_dir, store) = temp_store();
        store.create_bucket("cinequiz").await.unwrap();
        store
            .put("cinequiz", "users/42.json", Bytes::from_static(b"{\"points\":1}"), JSON_CONTENT_TYPE)
            .await
            .unwrap();
        let data = store.get("cinequiz", "users/42.json").await.unwrap().unwrap();
        assert_eq!(&data[..], b"{\"points\":1}");
        assert!(store.root().join("cinequiz/users/42.json").is_file());
    }

    #[tokio::test]
    async fn missing_object_is_none() {
        let (_dir, store) = temp_store();
        store.create_bucket("cinequiz").await.unwrap();
        assert!(store.get("cinequiz", "users/none.json").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_requires_bucket() {
        let (_dir, store) = temp_store();
        let err = store
            .put("ghost", "k.json", Bytes::from_static(b"{}"), JSON_CONTENT_TYPE)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::BucketNotFound(b) if b == "ghost"));
    }

    #[tokio::test]
    async fn overwrite_leaves_no_temp_files() {
        let (_dir, store) = temp_store();
        store.create_bucket("b").await.unwrap();
        for body in [&b"first version"[..], &b"v2"[..]] {
            store
                .put("b", "doc.json", Bytes::copy_from_slice(body), JSON_CONTENT_TYPE)
                .await
                .unwrap();
        }
        assert_eq!(&store.get("b", "doc.json").await.unwrap().unwrap()[..], b"v2");
        let entries: Vec<_> = fs::read_dir(store.root().join("b"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(entries, vec!["doc.json"]);
    }

    #[tokio::test]
    async fn list_walks_subdirectories() {
        let (_dir, store) = temp_store();
        store.create_bucket("b").await.unwrap();
        for key in ["users/a.json", "users/b.json", "cinemas/locations.json"] {
            store
                .put("b", key, Bytes::from_static(b"{}"), JSON_CONTENT_TYPE)
                .await
                .unwrap();
        }
        assert_eq!(
            store.list("b", "users/").await.unwrap(),
            vec!["users/a.json", "users/b.json"]
        );
        assert!(store.exists("b", "cinemas/locations.json").await.unwrap());
    }

    #[tokio::test]
    async fn rejects_escaping_keys() {
        let (_dir, store) = temp_store();
        store.create_bucket("b").await.unwrap();
        let err = store.get("b", "../outside").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey(_)));
    }

    #[tokio::test]
    async fn bucket_admin() {
        let (_dir, store) = temp_store();
        assert!(store.bucket_info("x").await.unwrap().is_none());
        store.create_bucket("x").await.unwrap();
        store.create_bucket("a").await.unwrap();
        let info = store.bucket_info("x").await.unwrap().unwrap();
        assert_eq!(info.name, "x");
        assert_eq!(store.list_buckets().await.unwrap(), vec!["a", "x"]);
    }
}
