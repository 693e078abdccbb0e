use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Mean earth radius in kilometres (IUGG).
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// A WGS84 coordinate in decimal degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawGeoPoint")]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a point, rejecting NaN and out-of-range values.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, TypeError> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(TypeError::InvalidCoordinate {
                latitude: latitude.to_string(),
                longitude: longitude.to_string(),
            });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Great-circle distance to `other` using the haversine formula.
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        let (lat1, lat2) = (self.latitude.to_radians(), other.latitude.to_radians());
        let d_lat = lat2 - lat1;
        let d_lon = (other.longitude - self.longitude).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().min(1.0).asin()
    }
}

#[derive(Deserialize)]
struct RawGeoPoint {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawGeoPoint> for GeoPoint {
    type Error = TypeError;

    fn try_from(raw: RawGeoPoint) -> Result<Self, Self::Error> {
        Self::new(raw.latitude, raw.longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range() {
        assert!(GeoPoint::new(91.0, 0.0).is_err());
        assert!(GeoPoint::new(0.0, -180.5).is_err());
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
        assert!(GeoPoint::new(-90.0, 180.0).is_ok());
    }

    #[test]
    fn deserialize_validates_range() {
        let p: GeoPoint = serde_json::from_str(r#"{"latitude":40.4168,"longitude":-3.7038}"#).unwrap();
        assert_eq!(p, GeoPoint::new(40.4168, -3.7038).unwrap());
        assert!(serde_json::from_str::<GeoPoint>(r#"{"latitude":95.0,"longitude":0.0}"#).is_err());
        assert!(serde_json::from_str::<GeoPoint>(r#"{"latitude":0.0,"longitude":-181.0}"#).is_err());
        assert!(serde_json::from_str::<GeoPoint>(r#"{"latitude":0.0}"#).is_err());
    }

    #[test]
    fn zero_distance_to_self() {
        let p = GeoPoint::new(40.4168, -3.7038).unwrap();
        assert_eq!(p.distance_km(&p), 0.0);
    }

    #[test]
    fn known_distance() {
        // Madrid (Puerta del Sol) to Barcelona (Plaça de Catalunya): ~505 km.
        let madrid = GeoPoint::new(40.4168, -3.7038).unwrap();
        let barcelona = GeoPoint::new(41.3874, 2.1686).unwrap();
        let d = madrid.distance_km(&barcelona);
        assert!((d - 505.0).abs() < 5.0, "got {d}");
    }

    #[test]
    fn distance_is_symmetric() {
        let a = GeoPoint::new(40.4183, -3.7070).unwrap();
        let b = GeoPoint::new(40.4233, -3.7044).unwrap();
        assert!((a.distance_km(&b) - b.distance_km(&a)).abs() < 1e-12);
    }
}
