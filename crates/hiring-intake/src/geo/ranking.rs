use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::{distance_km, Coordinate};

/// At most this many sites are offered to the user.
pub const NEAREST_SITE_LIMIT: usize = 5;

/// Anything that may carry a coordinate and can therefore be ranked.
pub trait Locatable {
    fn coordinate(&self) -> Option<Coordinate>;
}

/// An item enriched with its distance from the ranking origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ranked<T> {
    pub item: T,
    pub distance_km: f64,
}

/// Ranks `items` by distance from `origin`, ascending, keeping at most
/// `limit` entries. Items without usable coordinates are dropped; the
/// spreadsheet uses (0, 0) for rows whose coordinate cell is empty, so that
/// placeholder is dropped as well. The sort is stable: equal distances keep
/// their source order.
pub fn nearest<T: Locatable>(origin: Coordinate, items: Vec<T>, limit: usize) -> Vec<Ranked<T>> {
    let mut ranked: Vec<Ranked<T>> = items
        .into_iter()
        .filter_map(|item| {
            let coordinate = item.coordinate()?;
            if !coordinate.is_valid() {
                return None;
            }
            if coordinate.latitude == 0.0 && coordinate.longitude == 0.0 {
                return None;
            }
            Some(Ranked {
                distance_km: distance_km(origin, coordinate),
                item,
            })
        })
        .collect();

    ranked.sort_by(|a, b| {
        a.distance_km
            .partial_cmp(&b.distance_km)
            .unwrap_or(Ordering::Equal)
    });
    ranked.truncate(limit);
    ranked
}
