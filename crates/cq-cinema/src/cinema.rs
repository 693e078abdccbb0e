use cq_types::GeoPoint;
use serde::{Deserialize, Serialize};

fn default_opening_hours() -> String {
    "10:00 - 23:00".to_string()
}

fn default_ticket_prices() -> String {
    "From 8€".to_string()
}

fn default_facilities() -> String {
    "Digital Projection".to_string()
}

/// A cinema as stored in `cinemas/locations.json`. The name doubles as its id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cinema {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub website: String,
    #[serde(default = "default_opening_hours")]
    pub opening_hours: String,
    #[serde(default = "default_ticket_prices")]
    pub ticket_prices: String,
    #[serde(default = "default_facilities")]
    pub facilities: String,
    #[serde(default)]
    pub current_movies: Vec<String>,
}

impl Cinema {
    /// A cinema with only a name and position; other fields take their
    /// stored-document defaults.
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            latitude,
            longitude,
            address: String::new(),
            phone: String::new(),
            website: String::new(),
            opening_hours: default_opening_hours(),
            ticket_prices: default_ticket_prices(),
            facilities: default_facilities(),
            current_movies: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.name
    }

    /// Validated position, `None` if the stored coordinates are out of range.
    pub fn position(&self) -> Option<GeoPoint> {
        GeoPoint::new(self.latitude, self.longitude).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_fields_take_defaults() {
        let cinema: Cinema =
            serde_json::from_str(r#"{"name":"Cine Doré","latitude":40.4118,"longitude":-3.6997}"#)
                .unwrap();
        assert_eq!(cinema, Cinema::new("Cine Doré", 40.4118, -3.6997));
        assert_eq!(cinema.opening_hours, "10:00 - 23:00");
        assert_eq!(cinema.ticket_prices, "From 8€");
        assert_eq!(cinema.facilities, "Digital Projection");
        assert!(cinema.current_movies.is_empty());
    }

    #[test]
    fn out_of_range_position() {
        assert!(Cinema::new("x", 40.0, -3.0).position().is_some());
        assert!(Cinema::new("x", 140.0, -3.0).position().is_none());
    }
}
