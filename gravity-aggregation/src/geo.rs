use gravity_shared::errors::{AppError, AppResult};
use serde::Serialize;

/// Earth radius used by every distance computation, in the SQL predicate as well.
///
/// Radius-filter boundaries are evaluated against this value, so changing it moves which
/// candidates sit inside a given radius.
pub const EARTH_RADIUS_M: f64 = 6_378_100.0;

/// A coordinate in degrees. Constructed only from finite, in-range values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    latitude: f64,
    longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> AppResult<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(AppError::invalid_field(
                "latitude",
                "latitude must be a number between -90 and 90",
            ));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(AppError::invalid_field(
                "longitude",
                "longitude must be a number between -180 and 180",
            ));
        }
        Ok(Self { latitude, longitude })
    }

    /// Rows already passed the table CHECK constraints.
    pub(crate) fn from_stored(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Parses an optional `latitude`/`longitude` query pair. Both or neither must be given.
    pub fn parse_pair(latitude: Option<&str>, longitude: Option<&str>) -> AppResult<Option<Self>> {
        let latitude = latitude.map(str::trim).filter(|v| !v.is_empty());
        let longitude = longitude.map(str::trim).filter(|v| !v.is_empty());
        match (latitude, longitude) {
            (None, None) => Ok(None),
            (Some(_), None) => Err(AppError::invalid_field("longitude", "longitude is required with latitude")),
            (None, Some(_)) => Err(AppError::invalid_field("latitude", "latitude is required with longitude")),
            (Some(lat), Some(lon)) => {
                let lat = lat
                    .parse::<f64>()
                    .map_err(|_| AppError::invalid_field("latitude", "latitude must be a number"))?;
                let lon = lon
                    .parse::<f64>()
                    .map_err(|_| AppError::invalid_field("longitude", "longitude must be a number"))?;
                Self::new(lat, lon).map(Some)
            }
        }
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// Haversine great-circle distance in meters.
pub fn distance_m(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = hsin(d_lat) + lat1.cos() * lat2.cos() * hsin(d_lon);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

fn hsin(theta: f64) -> f64 {
    (theta / 2.0).sin().powi(2)
}

/// `km` as meters, the unit the radius predicate compares in.
pub fn km_to_m(km: f64) -> f64 {
    km * 1000.0
}

// ─── Tests ───
