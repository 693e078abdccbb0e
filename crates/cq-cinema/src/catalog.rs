use bytes::Bytes;
use cq_store::{ObjectStore, JSON_CONTENT_TYPE};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cinema::Cinema;
use crate::error::{CinemaError, CinemaResult};

/// Object key of the cinema catalog.
pub const CINEMAS_KEY: &str = "cinemas/locations.json";

const MADRID_CINEMAS: &str = include_str!("../data/madrid_cinemas.json");

/// Where the cinemas of a [`CinemaCatalog`] came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CatalogSource {
    /// Read from the store.
    Remote,
    /// The store had no catalog; the built-in list was uploaded and returned.
    Initialized,
    /// The store could not provide a usable catalog.
    Fallback,
}

#[derive(Clone, Debug)]
pub struct CinemaCatalog {
    cinemas: Vec<Cinema>,
    source: CatalogSource,
}

impl CinemaCatalog {
    /// Read the catalog, seeding the store with the built-in list if the
    /// object is missing. Any other failure yields the built-in list.
    pub async fn fetch(store: &dyn ObjectStore, bucket: &str) -> Self {
        let remote = Self::fetch_remote(store, bucket).await;
        Self::resolve(store, bucket, remote).await
    }

    /// Read and parse the stored catalog. `Ok(None)` means no object.
    pub async fn fetch_remote(
        store: &dyn ObjectStore,
        bucket: &str,
    ) -> CinemaResult<Option<Vec<Cinema>>> {
        match store.get(bucket, CINEMAS_KEY).await? {
            Some(bytes) => parse_cinemas(&bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Turn the outcome of [`fetch_remote`](Self::fetch_remote) into a
    /// catalog, initialising the store when it had no catalog.
    pub async fn resolve(
        store: &dyn ObjectStore,
        bucket: &str,
        remote: CinemaResult<Option<Vec<Cinema>>>,
    ) -> Self {
        match remote {
            Ok(Some(cinemas)) if !cinemas.is_empty() => {
                debug!(bucket, count = cinemas.len(), "loaded cinema catalog");
                Self {
                    cinemas,
                    source: CatalogSource::Remote,
                }
            }
            Ok(Some(_)) => {
                warn!(bucket, "cinema catalog is empty, using built-in list");
                Self::fallback()
            }
            Ok(None) => {
                let cinemas = fallback_cinemas();
                match upload_cinemas(store, bucket, &cinemas).await {
                    Ok(()) => Self {
                        cinemas,
                        source: CatalogSource::Initialized,
                    },
                    Err(e) => {
                        warn!(bucket, error = %e, "could not initialise cinema catalog");
                        Self::fallback()
                    }
                }
            }
            Err(e) => {
                warn!(bucket, error = %e, "cinema catalog unavailable, using built-in list");
                Self::fallback()
            }
        }
    }

    pub fn fallback() -> Self {
        Self {
            cinemas: fallback_cinemas(),
            source: CatalogSource::Fallback,
        }
    }

    pub fn cinemas(&self) -> &[Cinema] {
        &self.cinemas
    }

    pub fn into_cinemas(self) -> Vec<Cinema> {
        self.cinemas
    }

    pub fn source(&self) -> CatalogSource {
        self.source
    }

    pub fn get(&self, name: &str) -> Option<&Cinema> {
        self.cinemas.iter().find(|c| c.name == name)
    }
}

/// Parse a stored catalog. Entries without a name or with unusable
/// coordinates are skipped.
pub fn parse_cinemas(bytes: &[u8]) -> CinemaResult<Vec<Cinema>> {
    let records: Vec<Value> =
        serde_json::from_slice(bytes).map_err(|e| CinemaError::Malformed(e.to_string()))?;
    let mut cinemas = Vec::with_capacity(records.len());
    for (index, record) in records.into_iter().enumerate() {
        match serde_json::from_value::<Cinema>(record) {
            Ok(cinema) if !cinema.name.trim().is_empty() && cinema.position().is_some() => {
                cinemas.push(cinema)
            }
            Ok(cinema) => warn!(index, name = %cinema.name, "skipping cinema without a valid position"),
            Err(e) => warn!(index, error = %e, "skipping invalid cinema record"),
        }
    }
    Ok(cinemas)
}

/// Upload `cinemas` as the catalog, pretty-printed.
pub async fn upload_cinemas(
    store: &dyn ObjectStore,
    bucket: &str,
    cinemas: &[Cinema],
) -> CinemaResult<()> {
    let body =
        serde_json::to_vec_pretty(cinemas).map_err(|e| CinemaError::Malformed(e.to_string()))?;
    store
        .put(bucket, CINEMAS_KEY, Bytes::from(body), JSON_CONTENT_TYPE)
        .await?;
    info!(bucket, count = cinemas.len(), "uploaded cinema catalog");
    Ok(())
}

/// Built-in list of Madrid-area cinemas.
pub fn fallback_cinemas() -> Vec<Cinema> {
    // The embedded file is checked by the tests below.
    parse_cinemas(MADRID_CINEMAS.as_bytes()).unwrap_or_default()
}
