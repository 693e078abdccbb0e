use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use cq_cinema::{
    nearest, parse_listing, upload_cinemas, Cinema, CinemaCatalog, CinemaError, Nearby,
};
use cq_ledger::{fetch_friends, Clock, Friend, Ledger, LedgerConfig, LedgerError, PrizeCatalog};
use cq_quiz::{
    pick_random_questions, pick_random_questions_with, questions_exist, seed_questions,
    QuestionBank, QuizError, QuizSession,
};
use cq_store::{
    ensure_bucket, verify_bucket, BucketAdmin, BucketStatus, EnvToken, FsObjectStore, GcsConfig,
    GcsObjectStore, InMemoryObjectStore, ObjectStore, StoreError,
};
use cq_types::{GeoPoint, RedemptionRecord, UserId, UserProfile, UserState};
use rand::Rng;
use tracing::{info, warn};

use crate::config::{AppConfig, BackendConfig};
use crate::error::{SdkError, SdkResult};

/// Diagnostic result for one configured bucket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BucketReport {
    pub bucket: String,
    pub status: BucketStatus,
}

/// High-level CineQuiz API.
///
/// Holds one object store handle and hands it to every component; nothing
/// is process-global. Reads are retried with exponential backoff according
/// to [`RetryConfig`](crate::RetryConfig). Ledger mutations are attempted
/// exactly once and their outcome is returned to the caller.
pub struct CineQuiz {
    config: AppConfig,
    store: Arc<dyn ObjectStore>,
    admin: Option<Arc<dyn BucketAdmin>>,
    ledger: Ledger,
    prizes: PrizeCatalog,
}

impl CineQuiz {
    /// Build the configured backend and wire everything to it.
    pub fn from_config(config: AppConfig) -> SdkResult<Self> {
        config.validate()?;
        let storage = &config.storage;
        let (store, admin): (Arc<dyn ObjectStore>, Arc<dyn BucketAdmin>) = match &storage.backend {
            BackendConfig::Memory => {
                let store = InMemoryObjectStore::with_bucket(&storage.users_bucket);
                store.insert_bucket(&storage.content_bucket);
                split(Arc::new(store))
            }
            BackendConfig::Fs { root } => split(Arc::new(FsObjectStore::open(root)?)),
            BackendConfig::Gcs {
                base_url,
                project,
                token_env,
            } => {
                let mut gcs = GcsConfig::default()
                    .with_base_url(base_url.clone())
                    .with_timeout(storage.timeout());
                if let Some(project) = project {
                    gcs = gcs.with_project(project.clone());
                }
                split(Arc::new(GcsObjectStore::new(gcs, EnvToken::new(token_env.clone()))?))
            }
        };
        info!(backend = ?storage.backend, users = %storage.users_bucket, content = %storage.content_bucket, "storage configured");
        Ok(Self::assemble(config, store, Some(admin)))
    }

    /// Use an existing store that also supports bucket administration.
    pub fn with_store<S>(store: Arc<S>, config: AppConfig) -> Self
    where
        S: ObjectStore + BucketAdmin + 'static,
    {
        let (store, admin) = split(store);
        Self::assemble(config, store, Some(admin))
    }

    /// Use a plain object store; bucket diagnostics are unavailable.
    pub fn with_object_store(store: Arc<dyn ObjectStore>, config: AppConfig) -> Self {
        Self::assemble(config, store, None)
    }

    fn assemble(
        config: AppConfig,
        store: Arc<dyn ObjectStore>,
        admin: Option<Arc<dyn BucketAdmin>>,
    ) -> Self {
        let ledger_config = LedgerConfig::default()
            .with_bucket(config.storage.users_bucket.clone())
            .with_concurrency(config.ledger.concurrency)
            .with_operation_timeout(config.storage.timeout());
        Self {
            ledger: Ledger::new(store.clone(), ledger_config),
            prizes: PrizeCatalog::standard(),
            config,
            store,
            admin,
        }
    }

    /// Replace the clock used for ledger timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.ledger = self.ledger.with_clock(clock);
        self
    }

    /// Replace the prize catalog.
    pub fn with_prizes(mut self, prizes: PrizeCatalog) -> Self {
        self.prizes = prizes;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    // ---- Users ----

    /// Record a sign-in reported by the identity provider.
    pub async fn sign_in(&self, profile: &UserProfile) -> SdkResult<UserState> {
        Ok(self.ledger.sign_in(profile).await?)
    }

    /// Current balance and history of `user`.
    pub async fn profile(&self, user: &UserId) -> SdkResult<UserState> {
        let state = (|| async { self.ledger.load(user).await })
            .retry(self.backoff())
            .when(|e| matches!(e, LedgerError::StorageUnavailable(_)))
            .notify(|e, delay| warn!(user = %user, error = %e, ?delay, "retrying profile read"))
            .await?;
        Ok(state)
    }

    pub async fn history(&self, user: &UserId) -> SdkResult<Vec<RedemptionRecord>> {
        Ok(self.profile(user).await?.redemptions().to_vec())
    }

    /// The friends leaderboard without `user`, in stored order. Empty when
    /// the list cannot be read.
    pub async fn friends(&self, user: &UserId) -> Vec<Friend> {
        let bucket = self.content_bucket();
        let remote = (|| async {
            self.bounded(fetch_friends(self.store.as_ref(), bucket, user))
                .await
                .unwrap_or_else(|e| Err(LedgerError::from(e)))
        })
        .retry(self.backoff())
        .when(|e| matches!(e, LedgerError::StorageUnavailable(_)))
        .notify(|e, delay| warn!(error = %e, ?delay, "retrying friends list read"))
        .await;
        remote.unwrap_or_else(|e| {
            warn!(bucket, error = %e, "friends list unavailable");
            Vec::new()
        })
    }

    // ---- Quiz ----

    /// Fetch the question pool and pick this session's questions.
    pub async fn start_quiz(&self) -> QuizSession {
        let bank = self.question_bank().await;
        let questions =
            pick_random_questions(bank.questions(), self.config.quiz.questions_per_session);
        QuizSession::new(questions, self.config.quiz.points_per_correct)
    }

    pub async fn start_quiz_with<R: Rng + ?Sized>(&self, rng: &mut R) -> QuizSession {
        let bank = self.question_bank().await;
        let questions =
            pick_random_questions_with(rng, bank.questions(), self.config.quiz.questions_per_session);
        QuizSession::new(questions, self.config.quiz.points_per_correct)
    }

    /// The question pool, or the built-in set if the store cannot supply one.
    pub async fn question_bank(&self) -> QuestionBank {
        let bucket = self.content_bucket();
        let remote = (|| async {
            self.bounded(QuestionBank::fetch_remote(self.store.as_ref(), bucket))
                .await
                .unwrap_or_else(|e| Err(QuizError::Storage(e)))
        })
        .retry(self.backoff())
        .when(QuizError::is_transient)
        .notify(|e, delay| warn!(error = %e, ?delay, "retrying question pool read"))
        .await;
        QuestionBank::or_fallback(remote)
    }

    /// Credit the points earned in a completed session.
    ///
    /// A session pays out once: after a successful call it is marked settled
    /// and further calls fail with `InvalidOperation`. A failed credit leaves
    /// it unsettled so the caller can try again. A session with no correct
    /// answers leaves the document untouched.
    pub async fn finish_quiz(
        &self,
        user: &UserId,
        session: &mut QuizSession,
    ) -> SdkResult<UserState> {
        if !session.is_complete() {
            return Err(SdkError::InvalidOperation(
                "quiz has unanswered questions".into(),
            ));
        }
        if session.is_settled() {
            return Err(SdkError::InvalidOperation(
                "quiz points were already credited".into(),
            ));
        }
        let earned = session.points_earned();
        info!(user = %user, score = session.score(), earned, "quiz finished");
        let state = if earned == 0 {
            self.profile(user).await?
        } else {
            self.ledger.credit(user, earned).await?
        };
        session.mark_settled();
        Ok(state)
    }

    // ---- Prizes ----

    pub fn prizes(&self) -> &PrizeCatalog {
        &self.prizes
    }

    pub async fn redeem(&self, user: &UserId, prize_id: &str) -> SdkResult<UserState> {
        Ok(self.ledger.redeem_by_id(user, &self.prizes, prize_id).await?)
    }

    // ---- Cinemas ----

    /// The cinema catalog, initialising it in the store when missing.
    pub async fn cinemas(&self) -> CinemaCatalog {
        let bucket = self.content_bucket();
        let remote = (|| async {
            self.bounded(CinemaCatalog::fetch_remote(self.store.as_ref(), bucket))
                .await
                .unwrap_or_else(|e| Err(CinemaError::Storage(e)))
        })
        .retry(self.backoff())
        .when(CinemaError::is_transient)
        .notify(|e, delay| warn!(error = %e, ?delay, "retrying cinema catalog read"))
        .await;
        CinemaCatalog::resolve(self.store.as_ref(), bucket, remote).await
    }

    /// The `k` cinemas closest to `origin`, nearest first.
    pub async fn nearest_cinemas(&self, origin: GeoPoint, k: usize) -> Vec<Nearby<Cinema>> {
        let catalog = self.cinemas().await;
        nearest(origin, catalog.cinemas(), k)
            .into_iter()
            .map(|n| Nearby {
                item: n.item.clone(),
                distance_km: n.distance_km,
            })
            .collect()
    }

    // ---- Content and diagnostics ----

    /// Upload the sample questions. Unless `force` is set, an existing pool
    /// is left alone and `None` is returned.
    pub async fn seed_questions(&self, force: bool) -> SdkResult<Option<usize>> {
        let bucket = self.content_bucket();
        if !force && questions_exist(self.store.as_ref(), bucket).await? {
            info!(bucket, "question pool already present");
            return Ok(None);
        }
        Ok(Some(seed_questions(self.store.as_ref(), bucket).await?))
    }

    /// Replace the cinema catalog with the built-in list, or with the
    /// entries of a plain-text listing.
    pub async fn seed_cinemas(&self, listing: Option<&str>) -> SdkResult<usize> {
        let cinemas = match listing {
            Some(text) => parse_listing(text, &mut rand::thread_rng()),
            None => cq_cinema::fallback_cinemas(),
        };
        if cinemas.is_empty() {
            return Err(SdkError::InvalidOperation("listing contains no cinemas".into()));
        }
        upload_cinemas(self.store.as_ref(), self.content_bucket(), &cinemas).await?;
        Ok(cinemas.len())
    }

    /// Check every configured bucket.
    pub async fn verify_buckets(&self) -> SdkResult<Vec<BucketReport>> {
        let admin = self.admin()?;
        let mut reports = Vec::new();
        for bucket in self.buckets() {
            let status = verify_bucket(admin, bucket).await;
            reports.push(BucketReport {
                bucket: bucket.to_string(),
                status,
            });
        }
        Ok(reports)
    }

    /// Create any configured bucket that is missing. Returns each bucket
    /// with whether it exists afterwards.
    pub async fn ensure_buckets(&self) -> SdkResult<Vec<(String, bool)>> {
        let admin = self.admin()?;
        let mut results = Vec::new();
        for bucket in self.buckets() {
            results.push((bucket.to_string(), ensure_bucket(admin, bucket).await?));
        }
        Ok(results)
    }

    fn admin(&self) -> SdkResult<&dyn BucketAdmin> {
        self.admin
            .as_deref()
            .ok_or(SdkError::Unsupported("bucket administration"))
    }

    fn buckets(&self) -> Vec<&str> {
        let storage = &self.config.storage;
        let mut buckets = vec![storage.users_bucket.as_str()];
        if storage.content_bucket != storage.users_bucket {
            buckets.push(storage.content_bucket.as_str());
        }
        buckets
    }

    fn content_bucket(&self) -> &str {
        &self.config.storage.content_bucket
    }

    fn backoff(&self) -> ExponentialBuilder {
        let retry = &self.config.retry;
        ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(retry.min_delay_ms))
            .with_max_delay(Duration::from_millis(retry.max_delay_ms))
            .with_max_times(retry.max_attempts.saturating_sub(1))
            .with_jitter()
    }

    async fn bounded<T>(&self, call: impl Future<Output = T>) -> Result<T, StoreError> {
        let limit = self.config.storage.timeout();
        tokio::time::timeout(limit, call)
            .await
            .map_err(|_| StoreError::Timeout(limit))
    }
}

fn split<S>(store: Arc<S>) -> (Arc<dyn ObjectStore>, Arc<dyn BucketAdmin>)
where
    S: ObjectStore + BucketAdmin + 'static,
{
    let admin: Arc<dyn BucketAdmin> = store.clone();
    (store, admin)
}

impl std::fmt::Debug for CineQuiz {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CineQuiz")
            .field("config", &self.config)
            .field("ledger", &self.ledger)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use cq_cinema::CatalogSource;
    use cq_ledger::FixedClock;
    use cq_quiz::{QuestionSource, QUESTIONS_KEY};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::config::RetryConfig;

    fn fast_retry() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            min_delay_ms: 1,
            max_delay_ms: 5,
        }
    }

    fn setup() -> (Arc<InMemoryObjectStore>, CineQuiz) {
        let store = Arc::new(InMemoryObjectStore::with_bucket("cinequiz"));
        let config = AppConfig {
            retry: fast_retry(),
            ..AppConfig::default()
        };
        let clock = FixedClock(Utc.with_ymd_and_hms(2026, 3, 14, 18, 30, 0).unwrap());
        let app = CineQuiz::with_store(store.clone(), config).with_clock(Arc::new(clock));
        (store, app)
    }

    fn alice() -> UserProfile {
        UserProfile::new(UserId::new("alice").unwrap()).with_name("Alice")
    }

    #[tokio::test]
    async fn quiz_to_redemption() {
        let (_store, app) = setup();
        let user = alice().id;
        app.sign_in(&alice()).await.unwrap();
        app.seed_questions(false).await.unwrap();

        let mut quiz = app.start_quiz_with(&mut StdRng::seed_from_u64(3)).await;
        assert_eq!(quiz.questions().len(), 3);
        for i in 0..quiz.questions().len() {
            let correct = quiz.questions()[i].correct_answer_index;
            quiz.answer(i, correct).unwrap();
        }
        assert_eq!(app.finish_quiz(&user, &mut quiz).await.unwrap().points(), 300);

        app.ledger().credit(&user, 700).await.unwrap();
        let state = app.redeem(&user, "discount_50").await.unwrap();
        assert_eq!(state.points(), 0);
        assert_eq!(app.history(&user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn quiz_points_are_credited_once() {
        let (store, app) = setup();
        let user = alice().id;
        let mut quiz = app.start_quiz().await;
        for i in 0..quiz.questions().len() {
            let correct = quiz.questions()[i].correct_answer_index;
            quiz.answer(i, correct).unwrap();
        }
        assert_eq!(app.finish_quiz(&user, &mut quiz).await.unwrap().points(), 300);
        for _ in 0..2 {
            assert!(matches!(
                app.finish_quiz(&user, &mut quiz).await,
                Err(SdkError::InvalidOperation(_))
            ));
        }
        assert_eq!(app.profile(&user).await.unwrap().points(), 300);
        assert_eq!(store.put_count(), 1);
    }

    #[tokio::test]
    async fn failed_credit_can_be_retried() {
        let (store, app) = setup();
        let user = alice().id;
        let mut quiz = app.start_quiz().await;
        for i in 0..quiz.questions().len() {
            let correct = quiz.questions()[i].correct_answer_index;
            quiz.answer(i, correct).unwrap();
        }
        store.set_offline(true);
        assert!(app.finish_quiz(&user, &mut quiz).await.is_err());
        assert!(!quiz.is_settled());
        store.set_offline(false);
        assert_eq!(app.finish_quiz(&user, &mut quiz).await.unwrap().points(), 300);
        assert!(quiz.is_settled());
    }

    #[tokio::test]
    async fn friends_leaderboard() {
        let (store, app) = setup();
        assert!(app.friends(&alice().id).await.is_empty());

        store
            .put(
                "cinequiz",
                cq_ledger::FRIENDS_KEY,
                bytes::Bytes::from_static(
                    br#"[{"id":"alice","name":"Alice","points":10},{"id":"bob","name":"Bob","points":250}]"#,
                ),
                cq_store::JSON_CONTENT_TYPE,
            )
            .await
            .unwrap();
        let friends = app.friends(&alice().id).await;
        assert_eq!(friends.len(), 1);
        assert_eq!(friends[0].name, "Bob");
        assert_eq!(friends[0].points, 250);

        store.set_offline(true);
        assert!(app.friends(&alice().id).await.is_empty());
    }

    #[tokio::test]
    async fn unfinished_or_scoreless_quiz() {
        let (store, app) = setup();
        let user = alice().id;
        let mut quiz = app.start_quiz().await;
        assert!(matches!(
            app.finish_quiz(&user, &mut quiz).await,
            Err(SdkError::InvalidOperation(_))
        ));
        for i in 0..quiz.questions().len() {
            let wrong = (quiz.questions()[i].correct_answer_index + 1) % 4;
            quiz.answer(i, wrong).unwrap();
        }
        assert_eq!(app.finish_quiz(&user, &mut quiz).await.unwrap().points(), 0);
        assert_eq!(store.put_count(), 0);
    }

    #[tokio::test]
    async fn seeding_respects_existing_pool() {
        let (store, app) = setup();
        assert_eq!(app.seed_questions(false).await.unwrap(), Some(10));
        assert_eq!(app.seed_questions(false).await.unwrap(), None);
        assert_eq!(app.seed_questions(true).await.unwrap(), Some(10));
        assert!(store.blob("cinequiz", QUESTIONS_KEY).is_some());
        assert_eq!(app.question_bank().await.source(), QuestionSource::Remote);
    }

    #[tokio::test]
    async fn offline_reads_fall_back_and_profile_fails() {
        let (store, app) = setup();
        store.set_offline(true);
        assert_eq!(app.question_bank().await.source(), QuestionSource::Fallback);
        assert_eq!(app.cinemas().await.source(), CatalogSource::Fallback);
        assert!(matches!(
            app.profile(&alice().id).await,
            Err(SdkError::Ledger(LedgerError::StorageUnavailable(_)))
        ));
    }

    #[tokio::test]
    async fn nearest_cinemas_from_initialised_catalog() {
        let (store, app) = setup();
        let sol = GeoPoint::new(40.4168, -3.7038).unwrap();
        let nearby = app.nearest_cinemas(sol, 3).await;
        let names: Vec<&str> = nearby.iter().map(|n| n.item.name.as_str()).collect();
        assert_eq!(names, vec!["Cines Callao", "Cine Capitol", "Yelmo Cines Ideal"]);
        assert!(store.blob("cinequiz", cq_cinema::CINEMAS_KEY).is_some());
    }

    #[tokio::test]
    async fn listing_replaces_catalog() {
        let (_store, app) = setup();
        let count = app
            .seed_cinemas(Some("Cine Doré\nSanta Isabel 3\n\nSala Equis\nDuque de Alba 4"))
            .await
            .unwrap();
        assert_eq!(count, 2);
        let catalog = app.cinemas().await;
        assert_eq!(catalog.source(), CatalogSource::Remote);
        assert!(catalog.get("Sala Equis").is_some());
        assert!(matches!(
            app.seed_cinemas(Some("\n\n")).await,
            Err(SdkError::InvalidOperation(_))
        ));
    }

    #[tokio::test]
    async fn bucket_diagnostics() {
        let store = Arc::new(InMemoryObjectStore::new());
        let mut config = AppConfig::default();
        config.storage.content_bucket = "cinequiz-content".into();
        let app = CineQuiz::with_store(store, config);

        let reports = app.verify_buckets().await.unwrap();
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.status == BucketStatus::NoBuckets));

        let ensured = app.ensure_buckets().await.unwrap();
        assert_eq!(
            ensured,
            vec![
                ("cinequiz".to_string(), true),
                ("cinequiz-content".to_string(), true)
            ]
        );
        assert!(app
            .verify_buckets()
            .await
            .unwrap()
            .iter()
            .all(|r| r.status.is_found()));
    }

    #[tokio::test]
    async fn plain_store_has_no_diagnostics() {
        let store: Arc<dyn ObjectStore> = Arc::new(InMemoryObjectStore::with_bucket("cinequiz"));
        let app = CineQuiz::with_object_store(store, AppConfig::default());
        assert!(matches!(
            app.verify_buckets().await,
            Err(SdkError::Unsupported(_))
        ));
    }

    #[tokio::test]
    async fn from_config_fs_backend() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.storage.backend = BackendConfig::Fs {
            root: dir.path().to_path_buf(),
        };
        let app = CineQuiz::from_config(config).unwrap();
        assert_eq!(
            app.ensure_buckets().await.unwrap(),
            vec![("cinequiz".to_string(), true)]
        );
        let state = app.sign_in(&alice()).await.unwrap();
        assert_eq!(state.points(), 0);
        assert!(dir.path().join("cinequiz/users/alice.json").is_file());
    }
}
