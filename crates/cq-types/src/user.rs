use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::TypeError;
use crate::identity::{UserId, UserProfile};
use crate::prize::PrizeCatalogEntry;

/// One entry in a user's redemption log.
///
/// Records are immutable once appended. The JSON field names match the
/// documents already stored by the mobile client (`id` is the prize id).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionRecord {
    #[serde(rename = "id")]
    pub prize_id: String,
    pub name: String,
    pub points_required: u64,
    pub redeemed_at: String,
}

impl RedemptionRecord {
    /// Build the record for redeeming `prize` at `at`.
    pub fn for_prize(prize: &PrizeCatalogEntry, at: DateTime<Utc>) -> Self {
        Self {
            prize_id: prize.id.clone(),
            name: prize.name.clone(),
            points_required: prize.points_required(),
            redeemed_at: at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// The per-user document stored at `users/{id}.json`.
///
/// `points` can only change through [`UserState::credit`] and
/// [`UserState::debit`], and `redemptions` only grows through
/// [`UserState::redeem`]. Top-level fields this type does not know about are
/// kept in `extra` so a read-modify-write cycle does not drop them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserState {
    id: UserId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub photo_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<String>,
    #[serde(default)]
    points: u64,
    #[serde(default)]
    redemptions: Vec<RedemptionRecord>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl UserState {
    /// A fresh state: zero points, no redemptions.
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            name: String::new(),
            email: String::new(),
            photo_url: String::new(),
            last_login: None,
            points: 0,
            redemptions: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.id
    }

    pub fn points(&self) -> u64 {
        self.points
    }

    /// Redemption log in chronological order.
    pub fn redemptions(&self) -> &[RedemptionRecord] {
        &self.redemptions
    }

    /// Unknown top-level fields carried over from the stored document.
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }

    /// Overwrite the profile fields and stamp `last_login`.
    pub fn apply_profile(&mut self, profile: &UserProfile, at: DateTime<Utc>) {
        self.name = profile.name.clone();
        self.email = profile.email.clone();
        self.photo_url = profile.photo_url.clone();
        self.last_login = Some(at.to_rfc3339_opts(SecondsFormat::Millis, true));
    }

    /// Add `amount` points.
    pub fn credit(&mut self, amount: u64) -> Result<(), TypeError> {
        if amount == 0 {
            return Err(TypeError::ZeroPoints);
        }
        self.points = self
            .points
            .checked_add(amount)
            .ok_or(TypeError::PointsOverflow)?;
        Ok(())
    }

    /// Remove `amount` points. The balance is left untouched on failure.
    pub fn debit(&mut self, amount: u64) -> Result<(), TypeError> {
        if amount == 0 {
            return Err(TypeError::ZeroPoints);
        }
        if self.points < amount {
            return Err(TypeError::InsufficientPoints {
                required: amount,
                available: self.points,
            });
        }
        self.points -= amount;
        Ok(())
    }

    /// Debit the prize cost and append a redemption record in one step.
    ///
    /// On failure neither the balance nor the log changes.
    pub fn redeem(
        &mut self,
        prize: &PrizeCatalogEntry,
        at: DateTime<Utc>,
    ) -> Result<RedemptionRecord, TypeError> {
        self.debit(prize.points_required())?;
        let record = RedemptionRecord::for_prize(prize, at);
        self.redemptions.push(record.clone());
        Ok(record)
    }

    pub fn to_json_bytes(&self) -> Result<Vec<u8>, TypeError> {
        serde_json::to_vec(self).map_err(|e| TypeError::Serialization(e.to_string()))
    }

    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, TypeError> {
        serde_json::from_slice(bytes).map_err(|e| TypeError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn user(id: &str) -> UserState {
        UserState::new(UserId::new(id).unwrap())
    }

    fn prize(points: u64) -> PrizeCatalogEntry {
        PrizeCatalogEntry::new("discount_50", "50% Off Cinema Ticket", "half price", points).unwrap()
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 18, 30, 0).unwrap()
    }

    #[test]
    fn new_state_is_empty() {
        let state = user("u1");
        assert_eq!(state.points(), 0);
        assert!(state.redemptions().is_empty());
        assert!(state.last_login.is_none());
    }

    #[test]
    fn credit_and_debit() {
        let mut state = user("u1");
        state.credit(150).unwrap();
        state.debit(50).unwrap();
        assert_eq!(state.points(), 100);
    }

    #[test]
    fn zero_amounts_rejected() {
        let mut state = user("u1");
        assert_eq!(state.credit(0), Err(TypeError::ZeroPoints));
        assert_eq!(state.debit(0), Err(TypeError::ZeroPoints));
    }

    #[test]
    fn overdraw_leaves_balance_untouched() {
        let mut state = user("u1");
        state.credit(10).unwrap();
        assert_eq!(
            state.debit(11),
            Err(TypeError::InsufficientPoints {
                required: 11,
                available: 10
            })
        );
        assert_eq!(state.points(), 10);
    }

    #[test]
    fn credit_overflow_detected() {
        let mut state = user("u1");
        state.credit(u64::MAX).unwrap();
        assert_eq!(state.credit(1), Err(TypeError::PointsOverflow));
        assert_eq!(state.points(), u64::MAX);
    }

    #[test]
    fn redeem_appends_record() {
        let mut state = user("u1");
        state.credit(1100).unwrap();
        let record = state.redeem(&prize(1000), at()).unwrap();
        assert_eq!(record.prize_id, "discount_50");
        assert_eq!(record.points_required, 1000);
        assert_eq!(record.redeemed_at, "2026-03-14T18:30:00.000Z");
        assert_eq!(state.points(), 100);
        assert_eq!(state.redemptions(), &[record]);
    }

    #[test]
    fn failed_redeem_appends_nothing() {
        let mut state = user("u1");
        state.credit(100).unwrap();
        assert!(state.redeem(&prize(1000), at()).is_err());
        assert_eq!(state.points(), 100);
        assert!(state.redemptions().is_empty());
    }

    #[test]
    fn reads_documents_written_at_sign_in() {
        // The mobile client writes the profile without a redemptions array.
        let json = br#"{
            "id": "1234",
            "name": "Ada",
            "email": "ada@example.com",
            "photoUrl": "",
            "lastLogin": "Sat Mar 14 18:30:00 GMT 2026",
            "points": 0
        }"#;
        let state = UserState::from_json_slice(json).unwrap();
        assert_eq!(state.user_id().as_str(), "1234");
        assert_eq!(state.name, "Ada");
        assert!(state.redemptions().is_empty());
        assert!(state.extra().is_empty());
    }

    #[test]
    fn negative_points_are_malformed() {
        let json = br#"{"id":"u","points":-5}"#;
        assert!(matches!(
            UserState::from_json_slice(json),
            Err(TypeError::Serialization(_))
        ));
    }

    #[test]
    fn unknown_fields_survive_rewrite() {
        let json = br#"{"id":"u","points":3,"favouriteGenre":"noir"}"#;
        let mut state = UserState::from_json_slice(json).unwrap();
        state.credit(1).unwrap();
        let value: Value = serde_json::from_slice(&state.to_json_bytes().unwrap()).unwrap();
        assert_eq!(value["favouriteGenre"], "noir");
        assert_eq!(value["points"], 4);
    }

    #[test]
    fn apply_profile_keeps_balance() {
        let mut state = user("u1");
        state.credit(40).unwrap();
        let profile = UserProfile::new(UserId::new("u1").unwrap()).with_name("Grace");
        state.apply_profile(&profile, at());
        assert_eq!(state.name, "Grace");
        assert_eq!(state.points(), 40);
        assert_eq!(state.last_login.as_deref(), Some("2026-03-14T18:30:00.000Z"));
    }

    proptest! {
        #[test]
        fn json_round_trip(points in 0u64..1_000_000, costs in prop::collection::vec(1u64..500, 0..5)) {
            let mut state = user("prop");
            state.name = "Prop".into();
            state.credit(points + costs.iter().sum::<u64>() + 1).unwrap();
            for cost in costs {
                state.redeem(&prize(cost), at()).unwrap();
            }
            let bytes = state.to_json_bytes().unwrap();
            let back = UserState::from_json_slice(&bytes).unwrap();
            prop_assert_eq!(back, state);
        }
    }
}
