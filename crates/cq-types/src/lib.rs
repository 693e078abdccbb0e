//! Foundation types for CineQuiz.
//!
//! This crate provides the identity and document types shared by every other
//! CineQuiz crate. Nothing here performs I/O.
//!
//! # Key Types
//!
//! - [`UserId`]: stable identity key handed out by the sign-in provider
//! - [`UserProfile`]: profile fields captured at sign-in
//! - [`UserState`]: the per-user JSON document (points + redemption log)
//! - [`RedemptionRecord`]: one immutable entry in the redemption log
//! - [`PrizeCatalogEntry`]: a prize that can be bought with points
//! - [`GeoPoint`]: a WGS84 coordinate with great-circle distance

pub mod error;
pub mod geo;
pub mod identity;
pub mod prize;
pub mod user;

pub use error::TypeError;
pub use geo::GeoPoint;
pub use identity::{UserId, UserProfile};
pub use prize::PrizeCatalogEntry;
pub use user::{RedemptionRecord, UserState};
