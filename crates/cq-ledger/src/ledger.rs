use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use cq_store::{ObjectStore, StoreResult, JSON_CONTENT_TYPE};
use cq_types::{PrizeCatalogEntry, RedemptionRecord, UserId, UserProfile, UserState};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::catalog::PrizeCatalog;
use crate::clock::{Clock, SystemClock};
use crate::error::{LedgerError, LedgerResult};
use crate::locks::{UserGuard, UserLocks};

/// How ledger operations for the same user are ordered inside one process.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Concurrency {
    /// Operations for one user wait for each other.
    #[default]
    PerUser,
    /// No coordination. Two overlapping mutations for the same user can both
    /// read the old document, and the later write silently drops the earlier
    /// change.
    Unserialized,
}

/// Ledger configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Bucket holding the `users/` documents.
    pub bucket: String,
    pub concurrency: Concurrency,
    /// Upper bound on every single store call.
    pub operation_timeout: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            bucket: "cinequiz".to_string(),
            concurrency: Concurrency::PerUser,
            operation_timeout: Duration::from_secs(10),
        }
    }
}

impl LedgerConfig {
    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    pub fn with_concurrency(mut self, concurrency: Concurrency) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }
}

/// What a fetch of a user document found.
enum Stored {
    Absent,
    Parsed(UserState),
    Malformed { key: String, reason: String },
}

/// Points and redemption ledger over per-user JSON documents.
///
/// Every mutation re-reads the stored document, applies the change in memory
/// and writes the whole document back once. Nothing is cached between calls.
pub struct Ledger {
    store: Arc<dyn ObjectStore>,
    config: LedgerConfig,
    locks: UserLocks,
    clock: Arc<dyn Clock>,
}

impl Ledger {
    pub fn new(store: Arc<dyn ObjectStore>, config: LedgerConfig) -> Self {
        Self {
            store,
            config,
            locks: UserLocks::new(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock used for `redeemedAt` and `lastLogin`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Current state of `user`.
    ///
    /// A missing document yields the default state. A document that does not
    /// parse is logged and also yields the default state; use a mutation to
    /// surface it as [`LedgerError::MalformedDocument`].
    pub async fn load(&self, user: &UserId) -> LedgerResult<UserState> {
        match self.fetch(user).await? {
            Stored::Absent => Ok(UserState::new(user.clone())),
            Stored::Parsed(state) => Ok(state),
            Stored::Malformed { key, reason } => {
                warn!(%key, %reason, "malformed user document, using defaults");
                Ok(UserState::new(user.clone()))
            }
        }
    }

    /// Add `amount` points.
    pub async fn credit(&self, user: &UserId, amount: u64) -> LedgerResult<UserState> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount("credit must be positive".into()));
        }
        let state = self
            .mutate(user, |state, _| Ok(state.credit(amount)?))
            .await?;
        info!(user = %user, amount, points = state.points(), "credited points");
        Ok(state)
    }

    /// Remove `amount` points. Nothing is written if the balance is too low.
    pub async fn debit(&self, user: &UserId, amount: u64) -> LedgerResult<UserState> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount("debit must be positive".into()));
        }
        let state = self
            .mutate(user, |state, _| Ok(state.debit(amount)?))
            .await?;
        info!(user = %user, amount, points = state.points(), "debited points");
        Ok(state)
    }

    /// Debit the prize cost and append a redemption record, in one write.
    pub async fn redeem(
        &self,
        user: &UserId,
        prize: &PrizeCatalogEntry,
    ) -> LedgerResult<UserState> {
        let state = self
            .mutate(user, |state, clock| {
                state.redeem(prize, clock.now())?;
                Ok(())
            })
            .await?;
        info!(
            user = %user,
            prize = %prize.id,
            cost = prize.points_required(),
            points = state.points(),
            "redeemed prize"
        );
        Ok(state)
    }

    /// Look up `prize_id` in `catalog` and redeem it.
    pub async fn redeem_by_id(
        &self,
        user: &UserId,
        catalog: &PrizeCatalog,
        prize_id: &str,
    ) -> LedgerResult<UserState> {
        let prize = catalog
            .get(prize_id)
            .ok_or_else(|| LedgerError::UnknownPrize(prize_id.to_string()))?;
        self.redeem(user, prize).await
    }

    /// Record a sign-in.
    ///
    /// The first sign-in creates the document with zero points. Later ones
    /// refresh the profile fields and `lastLogin` and keep the balance and
    /// redemption log.
    pub async fn sign_in(&self, profile: &UserProfile) -> LedgerResult<UserState> {
        let user = &profile.id;
        let _guard = self.serialize(user).await;
        let now = self.clock.now();
        let (mut state, first) = match self.fetch(user).await? {
            Stored::Absent => (UserState::new(user.clone()), true),
            Stored::Parsed(state) => (state, false),
            Stored::Malformed { key, reason } => {
                return Err(LedgerError::MalformedDocument { key, reason })
            }
        };
        state.apply_profile(profile, now);
        self.persist(&state).await?;
        info!(user = %user, first, points = state.points(), "user signed in");
        Ok(state)
    }

    /// Redemption log of `user`, oldest first.
    pub async fn history(&self, user: &UserId) -> LedgerResult<Vec<RedemptionRecord>> {
        Ok(self.load(user).await?.redemptions().to_vec())
    }

    /// Fetch, apply `change`, persist. `change` must leave the state untouched
    /// when it fails; nothing is written in that case.
    async fn mutate<F>(&self, user: &UserId, change: F) -> LedgerResult<UserState>
    where
        F: FnOnce(&mut UserState, &dyn Clock) -> LedgerResult<()>,
    {
        let _guard = self.serialize(user).await;
        let mut state = match self.fetch(user).await? {
            Stored::Absent => UserState::new(user.clone()),
            Stored::Parsed(state) => state,
            Stored::Malformed { key, reason } => {
                warn!(%key, %reason, "refusing to overwrite malformed user document");
                return Err(LedgerError::MalformedDocument { key, reason });
            }
        };
        change(&mut state, self.clock.as_ref())?;
        self.persist(&state).await?;
        Ok(state)
    }

    async fn serialize(&self, user: &UserId) -> Option<UserGuard<'_>> {
        match self.config.concurrency {
            Concurrency::PerUser => Some(self.locks.acquire(user).await),
            Concurrency::Unserialized => None,
        }
    }

    async fn fetch(&self, user: &UserId) -> LedgerResult<Stored> {
        let key = user.document_key();
        let Some(bytes) = self
            .bounded(self.store.get(&self.config.bucket, &key))
            .await?
        else {
            debug!(%key, "no user document");
            return Ok(Stored::Absent);
        };
        match UserState::from_json_slice(&bytes) {
            Ok(state) if state.user_id() == user => Ok(Stored::Parsed(state)),
            Ok(state) => Ok(Stored::Malformed {
                key,
                reason: format!("document belongs to {}", state.user_id()),
            }),
            Err(e) => Ok(Stored::Malformed {
                key,
                reason: e.to_string(),
            }),
        }
    }

    async fn persist(&self, state: &UserState) -> LedgerResult<()> {
        let key = state.user_id().document_key();
        let body = Bytes::from(state.to_json_bytes()?);
        self.bounded(
            self.store
                .put(&self.config.bucket, &key, body, JSON_CONTENT_TYPE),
        )
        .await
    }

    async fn bounded<T>(&self, call: impl Future<Output = StoreResult<T>>) -> LedgerResult<T> {
        let limit = self.config.operation_timeout;
        match tokio::time::timeout(limit, call).await {
            Ok(result) => result.map_err(|e| {
                warn!(error = %e, "store call failed");
                LedgerError::from(e)
            }),
            Err(_) => {
                warn!(?limit, "store call timed out");
                Err(LedgerError::StorageUnavailable(format!(
                    "no response within {limit:?}"
                )))
            }
        }
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("config", &self.config)
            .field("locks", &self.locks)
            .finish()
    }
}
