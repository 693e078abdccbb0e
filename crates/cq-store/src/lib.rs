//! Bucket/key object storage for CineQuiz.
//!
//! Every durable piece of CineQuiz data (user documents, the question pool,
//! the cinema catalog) is a JSON object addressed by `(bucket, key)`. This
//! crate defines that contract and the backends that implement it.
//!
//! # Storage Backends
//!
//! All backends implement [`ObjectStore`] and [`BucketAdmin`]:
//!
//! - [`InMemoryObjectStore`] -- `HashMap`-based store for tests and embedding,
//!   with fault injection (offline, access denied, latency)
//! - [`FsObjectStore`] -- one file per object under `root/<bucket>/<key>`
//! - [`GcsObjectStore`] -- Google Cloud Storage JSON API over HTTPS
//!
//! # Design Rules
//!
//! 1. `put` replaces the whole object atomically: readers see the old bytes or
//!    the new bytes, never a prefix.
//! 2. There are no server-side transactions. Last write wins.
//! 3. The store never interprets object contents.
//! 4. The store never retries. Retry policy belongs to the caller.

pub mod diagnostics;
pub mod error;
pub mod fs;
pub mod gcs;
pub mod memory;
pub mod traits;

pub use diagnostics::{ensure_bucket, verify_bucket, BucketStatus};
pub use error::{StoreError, StoreResult};
pub use fs::FsObjectStore;
pub use gcs::{EnvToken, GcsConfig, GcsObjectStore, StaticToken, TokenProvider};
pub use memory::InMemoryObjectStore;
pub use traits::{validate_key, BucketAdmin, BucketInfo, ObjectStore, JSON_CONTENT_TYPE};
