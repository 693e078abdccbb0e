use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A prize that can be redeemed for points.
///
/// Catalog entries are static configuration and are not persisted per user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawPrize")]
pub struct PrizeCatalogEntry {
    pub id: String,
    pub name: String,
    pub description: String,
    points_required: u64,
}

impl PrizeCatalogEntry {
    /// Create an entry. `points_required` must be greater than zero.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        points_required: u64,
    ) -> Result<Self, TypeError> {
        if points_required == 0 {
            return Err(TypeError::ZeroPoints);
        }
        Ok(Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            points_required,
        })
    }

    pub fn points_required(&self) -> u64 {
        self.points_required
    }

    /// Whether a balance of `points` is enough to redeem this prize.
    pub fn affordable_with(&self, points: u64) -> bool {
        points >= self.points_required
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPrize {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
    points_required: u64,
}

impl TryFrom<RawPrize> for PrizeCatalogEntry {
    type Error = TypeError;

    fn try_from(raw: RawPrize) -> Result<Self, Self::Error> {
        Self::new(raw.id, raw.name, raw.description, raw.points_required)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_cost_prize_rejected() {
        assert_eq!(
            PrizeCatalogEntry::new("x", "X", "", 0),
            Err(TypeError::ZeroPoints)
        );
    }

    #[test]
    fn affordability() {
        let prize = PrizeCatalogEntry::new("discount_50", "50% Off", "", 1000).unwrap();
        assert!(!prize.affordable_with(999));
        assert!(prize.affordable_with(1000));
        assert!(prize.affordable_with(5000));
    }

    #[test]
    fn deserialize_checks_points() {
        let ok: PrizeCatalogEntry = serde_json::from_str(
            r#"{"id":"a","name":"A","description":"d","pointsRequired":10}"#,
        )
        .unwrap();
        assert_eq!(ok.points_required(), 10);

        let zero = serde_json::from_str::<PrizeCatalogEntry>(
            r#"{"id":"a","name":"A","pointsRequired":0}"#,
        );
        assert!(zero.is_err());
    }

    #[test]
    fn serializes_camel_case() {
        let prize = PrizeCatalogEntry::new("a", "A", "d", 7).unwrap();
        let value = serde_json::to_value(&prize).unwrap();
        assert_eq!(value["pointsRequired"], 7);
    }
}
