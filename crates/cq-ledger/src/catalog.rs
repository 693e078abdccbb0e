use cq_types::PrizeCatalogEntry;

use crate::error::{LedgerError, LedgerResult};

/// The prizes a user can redeem points for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrizeCatalog {
    entries: Vec<PrizeCatalogEntry>,
}

impl PrizeCatalog {
    /// Build a catalog from explicit entries. Ids must be unique.
    pub fn new(entries: Vec<PrizeCatalogEntry>) -> LedgerResult<Self> {
        for (i, entry) in entries.iter().enumerate() {
            if entries[..i].iter().any(|e| e.id == entry.id) {
                return Err(LedgerError::DuplicatePrize(entry.id.clone()));
            }
        }
        Ok(Self { entries })
    }

    /// The four prizes offered in the app.
    pub fn standard() -> Self {
        let entry = |id: &str, name: &str, description: &str, points: u64| {
            PrizeCatalogEntry::new(id, name, description, points)
        };
        let entries = [
            entry(
                "discount_50",
                "50% Off Cinema Ticket",
                "Get 50% off a cinema ticket at your nearest theater",
                1000,
            ),
            entry(
                "popcorn_drink",
                "Free Popcorn & Drink",
                "Enjoy a free popcorn and drink combo at any cinema in your city",
                2000,
            ),
            entry(
                "free_ticket",
                "Free Movie Ticket",
                "Redeem a free movie ticket for any standard screening",
                3000,
            ),
            entry(
                "vip_experience",
                "VIP Cinema Experience",
                "Upgrade to VIP seating with premium services",
                5000,
            ),
        ];
        // All costs above are non-zero, so every entry is Ok.
        Self {
            entries: entries.into_iter().flatten().collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&PrizeCatalogEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PrizeCatalogEntry> {
        self.entries.iter()
    }

    /// Prizes a balance of `points` can pay for, in catalog order.
    pub fn affordable(&self, points: u64) -> Vec<&PrizeCatalogEntry> {
        self.entries
            .iter()
            .filter(|e| e.affordable_with(points))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for PrizeCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalog() {
        let catalog = PrizeCatalog::standard();
        assert_eq!(catalog.len(), 4);
        let costs: Vec<u64> = catalog.iter().map(|e| e.points_required()).collect();
        assert_eq!(costs, vec![1000, 2000, 3000, 5000]);
        assert_eq!(catalog.get("free_ticket").unwrap().name, "Free Movie Ticket");
        assert!(catalog.get("nope").is_none());
    }

    #[test]
    fn affordable_filters_by_balance() {
        let catalog = PrizeCatalog::standard();
        assert!(catalog.affordable(999).is_empty());
        let ids: Vec<&str> = catalog
            .affordable(2500)
            .iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(ids, vec!["discount_50", "popcorn_drink"]);
    }

    #[test]
    fn duplicate_ids_rejected() {
        let a = PrizeCatalogEntry::new("x", "X", "", 10).unwrap();
        assert_eq!(
            PrizeCatalog::new(vec![a.clone(), a]),
            Err(LedgerError::DuplicatePrize("x".into()))
        );
    }
}
