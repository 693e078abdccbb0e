//! Cinema catalog for CineQuiz.
//!
//! The catalog is one JSON array at `cinemas/locations.json`. This crate
//! reads it (seeding it with a built-in Madrid list when it is missing),
//! imports plain-text listings, and ranks cinemas by distance from the user.

pub mod catalog;
pub mod cinema;
pub mod error;
pub mod listing;
pub mod nearest;

pub use catalog::{
    fallback_cinemas, parse_cinemas, upload_cinemas, CatalogSource, CinemaCatalog, CINEMAS_KEY,
};
pub use cinema::Cinema;
pub use error::{CinemaError, CinemaResult};
pub use listing::parse_listing;
pub use nearest::{nearest, nearest_cinemas, Located, Nearby};
