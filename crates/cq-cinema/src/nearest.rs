use cq_types::GeoPoint;

use crate::cinema::Cinema;

/// Anything with a position on the map.
pub trait Located {
    fn location(&self) -> GeoPoint;
}

impl Located for GeoPoint {
    fn location(&self) -> GeoPoint {
        *self
    }
}

impl Located for Cinema {
    fn location(&self) -> GeoPoint {
        GeoPoint {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

impl<S> Located for (S, GeoPoint) {
    fn location(&self) -> GeoPoint {
        self.1
    }
}

/// An item paired with its distance from the search origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Nearby<T> {
    pub item: T,
    pub distance_km: f64,
}

/// The `k` items closest to `origin`, nearest first.
///
/// Ties keep their input order.
pub fn nearest<T: Located>(origin: GeoPoint, items: &[T], k: usize) -> Vec<Nearby<&T>> {
    let mut ranked: Vec<Nearby<&T>> = items
        .iter()
        .map(|item| Nearby {
            item,
            distance_km: origin.distance_km(&item.location()),
        })
        .collect();
    ranked.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    ranked.truncate(k);
    ranked
}

/// Names of the `k` cinemas closest to `origin`, nearest first.
pub fn nearest_cinemas(origin: GeoPoint, cinemas: &[Cinema], k: usize) -> Vec<String> {
    nearest(origin, cinemas, k)
        .into_iter()
        .map(|n| n.item.name.clone())
        .collect()
}
