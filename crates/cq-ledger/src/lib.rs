//! User state ledger for CineQuiz.
//!
//! The ledger owns every change to a user's points balance and redemption
//! log. State lives in one JSON document per user (`users/{id}.json`) in an
//! [`ObjectStore`](cq_store::ObjectStore); each operation is one read
//! followed by at most one whole-document write.
//!
//! This crate provides:
//! - [`Ledger`] with `load` / `credit` / `debit` / `redeem` / `sign_in`
//! - [`UserLocks`] for per-user serialization inside one process
//! - [`PrizeCatalog`], the static list of redeemable prizes
//! - [`fetch_friends`], the friends leaderboard
//! - [`Clock`] so timestamps can be pinned in tests

pub mod catalog;
pub mod clock;
pub mod error;
pub mod friends;
pub mod ledger;
pub mod locks;

pub use catalog::PrizeCatalog;
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{LedgerError, LedgerResult};
pub use friends::{fetch_friends, parse_friends, Friend, FRIENDS_KEY};
pub use ledger::{Concurrency, Ledger, LedgerConfig};
pub use locks::{UserGuard, UserLocks};
