//! Reverse geocoding for delivery locations.
//!
//! Locations arrive as coordinates, but the site's location search box wants
//! text. A Nominatim reverse lookup turns lat/lng into a display name whose
//! first component becomes the search query. Lookup failure only downgrades
//! the combination to the default location.

use serde::Deserialize;
use thiserror::Error;

const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/reverse";

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("reverse geocoding request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("no address found for {lat}, {lng}")]
    NoAddress { lat: f64, lng: f64 },
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    #[serde(default)]
    display_name: Option<String>,
}

/// Look up the address for a coordinate pair.
pub fn reverse_geocode(
    client: &reqwest::blocking::Client,
    lat: f64,
    lng: f64,
) -> Result<String, GeocodeError> {
    let response: ReverseResponse = client
        .get(NOMINATIM_URL)
        .query(&[
            ("format", "jsonv2"),
            ("lat", &lat.to_string()),
            ("lon", &lng.to_string()),
        ])
        .send()?
        .error_for_status()?
        .json()?;

    response
        .display_name
        .filter(|name| !name.is_empty())
        .ok_or(GeocodeError::NoAddress { lat, lng })
}

/// The location search box works best with the most specific component of
/// the address, which Nominatim puts first.
pub fn search_query(display_name: &str) -> &str {
    display_name
        .split(',')
        .next()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .unwrap_or(display_name)
}
