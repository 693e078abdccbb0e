use bytes::Bytes;
use cq_store::{ObjectStore, JSON_CONTENT_TYPE};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{QuizError, QuizResult};
use crate::question::Question;

/// Object key of the question pool.
pub const QUESTIONS_KEY: &str = "questions/cinema_questions.json";

const SAMPLE_QUESTIONS: &str = include_str!("../data/sample_questions.json");

/// Where the questions of a [`QuestionBank`] came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuestionSource {
    Remote,
    Fallback,
}

/// The question pool for one quiz session.
#[derive(Clone, Debug)]
pub struct QuestionBank {
    questions: Vec<Question>,
    source: QuestionSource,
}

impl QuestionBank {
    /// Fetch the pool, falling back to the built-in questions when the
    /// object is absent, unreadable, malformed or holds no valid question.
    pub async fn fetch(store: &dyn ObjectStore, bucket: &str) -> Self {
        Self::or_fallback(Self::fetch_remote(store, bucket).await)
    }

    /// Use the outcome of [`fetch_remote`](Self::fetch_remote) if it holds
    /// questions, the built-in set otherwise.
    pub fn or_fallback(remote: QuizResult<Option<Self>>) -> Self {
        match remote {
            Ok(Some(bank)) => bank,
            Ok(None) => {
                warn!(key = QUESTIONS_KEY, "question pool missing, using fallback");
                Self::fallback()
            }
            Err(e) => {
                warn!(error = %e, "question pool unavailable, using fallback");
                Self::fallback()
            }
        }
    }

    /// Fetch the stored pool without falling back.
    ///
    /// Returns `Ok(None)` when there is nothing usable: no object, or an
    /// array without a single valid question.
    pub async fn fetch_remote(store: &dyn ObjectStore, bucket: &str) -> QuizResult<Option<Self>> {
        let Some(bytes) = store.get(bucket, QUESTIONS_KEY).await? else {
            return Ok(None);
        };
        let questions = parse_questions(&bytes)?;
        if questions.is_empty() {
            return Ok(None);
        }
        debug!(bucket, count = questions.len(), "loaded question pool");
        Ok(Some(Self {
            questions,
            source: QuestionSource::Remote,
        }))
    }

    pub fn fallback() -> Self {
        Self {
            questions: fallback_questions(),
            source: QuestionSource::Fallback,
        }
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn into_questions(self) -> Vec<Question> {
        self.questions
    }

    pub fn source(&self) -> QuestionSource {
        self.source
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// Parse a stored question array. Records that do not describe a valid
/// question are skipped with a warning; a body that is not a JSON array is
/// an error.
pub fn parse_questions(bytes: &[u8]) -> QuizResult<Vec<Question>> {
    let records: Vec<Value> =
        serde_json::from_slice(bytes).map_err(|e| QuizError::MalformedPool(e.to_string()))?;
    let mut questions = Vec::with_capacity(records.len());
    for (index, record) in records.into_iter().enumerate() {
        let parsed = serde_json::from_value::<Question>(record)
            .map_err(|e| e.to_string())
            .and_then(|q| q.validate().map(|()| q).map_err(|e| e.to_string()));
        match parsed {
            Ok(question) => questions.push(question),
            Err(reason) => warn!(index, %reason, "skipping invalid question"),
        }
    }
    Ok(questions)
}

/// The three questions used when the pool cannot be fetched.
pub fn fallback_questions() -> Vec<Question> {
    let mut questions = sample_questions();
    questions.truncate(3);
    questions
}

/// The ten questions uploaded by [`seed_questions`].
pub fn sample_questions() -> Vec<Question> {
    // The embedded file is checked by the tests below.
    parse_questions(SAMPLE_QUESTIONS.as_bytes()).unwrap_or_default()
}

/// Upload the sample questions as the pool. Returns the number uploaded.
pub async fn seed_questions(store: &dyn ObjectStore, bucket: &str) -> QuizResult<usize> {
    let questions = sample_questions();
    let body = serde_json::to_vec_pretty(&questions)
        .map_err(|e| QuizError::MalformedPool(e.to_string()))?;
    store
        .put(bucket, QUESTIONS_KEY, Bytes::from(body), JSON_CONTENT_TYPE)
        .await?;
    info!(bucket, count = questions.len(), "uploaded sample questions");
    Ok(questions.len())
}

/// Whether a question pool object exists in `bucket`.
pub async fn questions_exist(store: &dyn ObjectStore, bucket: &str) -> QuizResult<bool> {
    Ok(store.exists(bucket, QUESTIONS_KEY).await?)
}

#[cfg(test)]
mod tests {
    use cq_store::InMemoryObjectStore;

    use super::*;

    const BUCKET: &str = "cinequiz";

    async fn store_with(body: &'static str) -> InMemoryObjectStore {
        let store = InMemoryObjectStore::with_bucket(BUCKET);
        store
            .put(BUCKET, QUESTIONS_KEY, Bytes::from(body), JSON_CONTENT_TYPE)
            .await
            .unwrap();
        store
    }

    #[test]
    fn embedded_questions_are_valid() {
        assert_eq!(sample_questions().len(), 10);
        let fallback = fallback_questions();
        assert_eq!(fallback.len(), 3);
        assert_eq!(fallback[1].text, "Who directed the movie 'Inception'?");
    }

    #[tokio::test]
    async fn missing_pool_falls_back() {
        let store = InMemoryObjectStore::with_bucket(BUCKET);
        let bank = QuestionBank::fetch(&store, BUCKET).await;
        assert_eq!(bank.source(), QuestionSource::Fallback);
        assert_eq!(bank.len(), 3);
    }

    #[tokio::test]
    async fn offline_store_falls_back() {
        let store = InMemoryObjectStore::with_bucket(BUCKET);
        store.set_offline(true);
        let bank = QuestionBank::fetch(&store, BUCKET).await;
        assert_eq!(bank.source(), QuestionSource::Fallback);
        assert!(matches!(
            QuestionBank::fetch_remote(&store, BUCKET).await,
            Err(QuizError::Storage(_))
        ));
    }

    #[tokio::test]
    async fn malformed_pool_falls_back() {
        let store = store_with("{\"questions\": []}").await;
        assert_eq!(
            QuestionBank::fetch(&store, BUCKET).await.source(),
            QuestionSource::Fallback
        );
    }

    #[tokio::test]
    async fn invalid_records_are_skipped() {
        let store = store_with(
            r#"[
                {"text":"Q1","options":["a","b","c","d"],"correctAnswerIndex":3},
                {"text":"Q2","options":["a","b"],"correctAnswerIndex":0},
                {"text":"Q3","options":["a","b","c","d"],"correctAnswerIndex":7},
                {"nope":true}
            ]"#,
        )
        .await;
        let bank = QuestionBank::fetch(&store, BUCKET).await;
        assert_eq!(bank.source(), QuestionSource::Remote);
        assert_eq!(bank.len(), 1);
        assert_eq!(bank.questions()[0].text, "Q1");
    }

    #[tokio::test]
    async fn seed_then_fetch() {
        let store = InMemoryObjectStore::with_bucket(BUCKET);
        assert!(!questions_exist(&store, BUCKET).await.unwrap());
        assert_eq!(seed_questions(&store, BUCKET).await.unwrap(), 10);
        assert!(questions_exist(&store, BUCKET).await.unwrap());
        assert_eq!(
            store.blob(BUCKET, QUESTIONS_KEY).unwrap().content_type,
            JSON_CONTENT_TYPE
        );

        let bank = QuestionBank::fetch(&store, BUCKET).await;
        assert_eq!(bank.source(), QuestionSource::Remote);
        assert_eq!(bank.into_questions(), sample_questions());
    }
}
