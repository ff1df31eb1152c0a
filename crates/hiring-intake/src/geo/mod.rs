//! Coordinate math shared by the ranking and geocoding layers.

pub mod geocoder;
pub mod ranking;

use serde::{Deserialize, Serialize};

pub use geocoder::{
    address_variants, AddressResolver, GeocodeError, GeocodeProvider, Geocoder, NominatimGeocoder,
    QueryScope, YandexGeocoder,
};
pub use ranking::{nearest, Locatable, Ranked, NEAREST_SITE_LIMIT};

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A point on the globe in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Builds a coordinate, rejecting non-finite or out-of-range degrees.
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        let candidate = Self {
            latitude,
            longitude,
        };
        candidate.is_valid().then_some(candidate)
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Great-circle distance between two points (haversine, kilometers).
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos() * b.latitude.to_radians().cos() * (d_lon / 2.0).sin().powi(2);

    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

/// Human-readable distance label: meters below one kilometer, one decimal
/// up to ten kilometers, whole kilometers beyond.
pub fn format_distance_km(km: f64) -> String {
    if km < 1.0 {
        format!("{} м", (km * 1000.0).round() as i64)
    } else if km < 10.0 {
        format!("{:.1} км", km)
    } else {
        format!("{} км", km.round() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moscow() -> Coordinate {
        Coordinate {
            latitude: 55.7558,
            longitude: 37.6176,
        }
    }

    fn saint_petersburg() -> Coordinate {
        Coordinate {
            latitude: 59.9311,
            longitude: 30.3609,
        }
    }

    #[test]
    fn distance_to_self_is_zero() {
        assert_eq!(distance_km(moscow(), moscow()), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let there = distance_km(moscow(), saint_petersburg());
        let back = distance_km(saint_petersburg(), moscow());
        assert!((there - back).abs() < 1e-9);
    }

    #[test]
    fn moscow_to_saint_petersburg_is_roughly_known() {
        let km = distance_km(moscow(), saint_petersburg());
        assert!((km - 634.0).abs() < 5.0, "got {km}");
    }

    #[test]
    fn rejects_out_of_range_degrees() {
        assert!(Coordinate::new(91.0, 0.0).is_none());
        assert!(Coordinate::new(0.0, -180.5).is_none());
        assert!(Coordinate::new(f64::NAN, 0.0).is_none());
        assert!(Coordinate::new(55.7558, 37.6176).is_some());
    }

    #[test]
    fn labels_meters_below_one_kilometer() {
        assert_eq!(format_distance_km(0.0), "0 м");
        assert_eq!(format_distance_km(0.45), "450 м");
        assert_eq!(format_distance_km(0.999), "999 м");
    }

    #[test]
    fn labels_one_decimal_up_to_ten_kilometers() {
        assert_eq!(format_distance_km(1.0), "1.0 км");
        assert_eq!(format_distance_km(2.54), "2.5 км");
        assert_eq!(format_distance_km(9.94), "9.9 км");
    }

    #[test]
    fn labels_whole_kilometers_from_ten() {
        assert_eq!(format_distance_km(10.0), "10 км");
        assert_eq!(format_distance_km(12.4), "12 км");
    }
}
