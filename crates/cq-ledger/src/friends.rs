use cq_store::ObjectStore;
use cq_types::UserId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{LedgerError, LedgerResult};

/// Object key of the friends list.
pub const FRIENDS_KEY: &str = "friends/names.json";

/// One entry of the friends leaderboard.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Friend {
    pub id: UserId,
    pub name: String,
    pub points: u64,
}

/// Read the friends list, leaving out `exclude` (normally the signed-in
/// user). A missing object is an empty list.
pub async fn fetch_friends(
    store: &dyn ObjectStore,
    bucket: &str,
    exclude: &UserId,
) -> LedgerResult<Vec<Friend>> {
    let Some(bytes) = store.get(bucket, FRIENDS_KEY).await? else {
        debug!(bucket, "no friends list stored");
        return Ok(Vec::new());
    };
    let friends = parse_friends(&bytes, exclude)?;
    debug!(bucket, count = friends.len(), "loaded friends list");
    Ok(friends)
}

/// Parse a stored friends array in stored order. Records that are not a
/// valid friend are skipped with a warning; a body that is not a JSON array
/// is an error.
pub fn parse_friends(bytes: &[u8], exclude: &UserId) -> LedgerResult<Vec<Friend>> {
    let records: Vec<Value> =
        serde_json::from_slice(bytes).map_err(|e| LedgerError::MalformedDocument {
            key: FRIENDS_KEY.to_string(),
            reason: e.to_string(),
        })?;
    let mut friends = Vec::with_capacity(records.len());
    for (index, record) in records.into_iter().enumerate() {
        match serde_json::from_value::<Friend>(record) {
            Ok(friend) if &friend.id == exclude => {}
            Ok(friend) => friends.push(friend),
            Err(e) => warn!(index, error = %e, "skipping invalid friend record"),
        }
    }
    Ok(friends)
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use cq_store::{InMemoryObjectStore, JSON_CONTENT_TYPE};

    use super::*;

    const BUCKET: &str = "cinequiz";

    fn uid(s: &str) -> UserId {
        UserId::new(s).unwrap()
    }

    #[test]
    fn excludes_user_and_skips_bad_records() {
        let body = br#"[
            {"id":"1","name":"Alice","points":320},
            {"id":"me","name":"Me","points":999},
            {"id":"2","name":"Bob","points":-5},
            {"id":"3","points":180},
            {"id":"","name":"Nobody","points":1},
            {"id":"4","name":"Diana","points":400}
        ]"#;
        let friends = parse_friends(body, &uid("me")).unwrap();
        let names: Vec<&str> = friends.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Alice", "Diana"]);
        assert_eq!(friends[1].points, 400);
    }

    #[test]
    fn non_array_is_malformed() {
        assert!(matches!(
            parse_friends(b"{\"friends\":[]}", &uid("me")),
            Err(LedgerError::MalformedDocument { .. })
        ));
    }

    #[tokio::test]
    async fn missing_list_is_empty() {
        let store = InMemoryObjectStore::with_bucket(BUCKET);
        assert!(fetch_friends(&store, BUCKET, &uid("me")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stored_list_is_read() {
        let store = InMemoryObjectStore::with_bucket(BUCKET);
        store
            .put(
                BUCKET,
                FRIENDS_KEY,
                Bytes::from_static(br#"[{"id":"1","name":"Alice","points":320}]"#),
                JSON_CONTENT_TYPE,
            )
            .await
            .unwrap();
        let friends = fetch_friends(&store, BUCKET, &uid("me")).await.unwrap();
        assert_eq!(
            friends,
            vec![Friend {
                id: uid("1"),
                name: "Alice".into(),
                points: 320
            }]
        );

        store.set_offline(true);
        assert!(matches!(
            fetch_friends(&store, BUCKET, &uid("me")).await,
            Err(LedgerError::StorageUnavailable(_))
        ));
    }
}
