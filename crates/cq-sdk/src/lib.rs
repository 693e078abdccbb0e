//! High-level SDK for CineQuiz.
//!
//! Wires the ledger, the question pool and the cinema catalog to one
//! configured object store. This is the entry point for the CLI and for
//! any front end embedding CineQuiz.

pub mod config;
pub mod error;
pub mod facade;

pub use config::{AppConfig, BackendConfig, LedgerSection, QuizConfig, RetryConfig, StorageConfig};
pub use error::{SdkError, SdkResult};
pub use facade::{BucketReport, CineQuiz};

// Re-export key types
pub use cq_cinema::{CatalogSource, Cinema, CinemaCatalog, Nearby};
pub use cq_ledger::{Concurrency, Friend, LedgerError, PrizeCatalog};
pub use cq_quiz::{Question, QuestionSource, QuizSession};
pub use cq_store::BucketStatus;
pub use cq_types::{GeoPoint, PrizeCatalogEntry, RedemptionRecord, UserId, UserProfile, UserState};
