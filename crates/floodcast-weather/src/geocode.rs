//! Geographic context for a coordinate: district (Nominatim reverse geocoding)
//! and elevation. Both lookups run concurrently and each degrades to a
//! default on failure; resolving a context never fails.

use floodcast_core::http::{build_client, send_json};
use floodcast_core::{EndpointConfig, NetworkError};
use reqwest::Client;
use serde::Deserialize;

use crate::district::DistrictNormalizer;
use crate::types::{Coordinate, GeoContext, GeoDegradation, GeoError, GeoLookup, UNKNOWN_DISTRICT};

#[derive(Debug, Deserialize)]
struct NominatimResponse {
    address: Option<NominatimAddress>,
}

#[derive(Debug, Deserialize)]
struct NominatimAddress {
    state_district: Option<String>,
    county: Option<String>,
    state: Option<String>,
}

impl NominatimAddress {
    /// `state_district` → `county` → `state`, first non-blank wins.
    fn district_label(self) -> Option<String> {
        [self.state_district, self.county, self.state]
            .into_iter()
            .flatten()
            .map(|label| label.trim().to_string())
            .find(|label| !label.is_empty())
    }
}

/// Elevation providers answer either `{data: [{elevation}]}` or a bare
/// `elevation`, which Open-Meteo sends as a one-element array.
#[derive(Debug, Deserialize)]
struct ElevationResponse {
    #[serde(default)]
    data: Option<Vec<ElevationPoint>>,
    #[serde(default)]
    elevation: Option<ElevationValue>,
}

#[derive(Debug, Deserialize)]
struct ElevationPoint {
    elevation: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ElevationValue {
    Single(f64),
    Series(Vec<Option<f64>>),
}

impl ElevationResponse {
    fn meters(self) -> Option<f64> {
        let from_data = self
            .data
            .and_then(|points| points.into_iter().next())
            .and_then(|point| point.elevation);
        let bare = match self.elevation {
            Some(ElevationValue::Single(value)) => Some(value),
            Some(ElevationValue::Series(values)) => values.into_iter().next().flatten(),
            None => None,
        };
        from_data.into_iter().chain(bare).find(|value| value.is_finite())
    }
}

#[derive(Debug, Clone)]
pub struct GeoContextService {
    geocoding_client: Client,
    elevation_client: Client,
    geocoding: EndpointConfig,
    elevation: EndpointConfig,
    normalizer: DistrictNormalizer,
}

impl GeoContextService {
    pub fn new(
        geocoding: EndpointConfig,
        elevation: EndpointConfig,
        normalizer: DistrictNormalizer,
    ) -> Result<Self, NetworkError> {
        Ok(Self {
            geocoding_client: build_client(&geocoding)?,
            elevation_client: build_client(&elevation)?,
            geocoding,
            elevation,
            normalizer,
        })
    }

    /// Resolve district and elevation. Failed fields take their defaults
    /// (`UNKNOWN_DISTRICT`, 0 m) and are flagged in `degraded`.
    pub async fn resolve_context(&self, coord: Coordinate) -> GeoLookup {
        let (district, elevation) =
            tokio::join!(self.lookup_district(coord), self.lookup_elevation(coord));

        let mut degraded = GeoDegradation::default();

        let district = district.unwrap_or_else(|e| {
            tracing::warn!("District lookup failed for {}: {}", coord, e);
            degraded.district = true;
            UNKNOWN_DISTRICT.to_string()
        });

        let elevation_meters = elevation.unwrap_or_else(|e| {
            tracing::warn!("Elevation lookup failed for {}: {}", coord, e);
            degraded.elevation = true;
            0.0
        });

        tracing::info!(
            "Geo context for {}: district={}, elevation={}m",
            coord,
            district,
            elevation_meters
        );

        GeoLookup {
            context: GeoContext {
                district,
                elevation_meters,
            },
            degraded,
        }
    }

    /// Reverse geocode to a normalized district name.
    pub async fn lookup_district(&self, coord: Coordinate) -> Result<String, GeoError> {
        tracing::debug!("Reverse geocoding {}", coord);

        let lat = coord.latitude().to_string();
        let lon = coord.longitude().to_string();
        let body: NominatimResponse = send_json(&self.geocoding, "geocoding", || {
            self.geocoding_client
                .get(&self.geocoding.url)
                .query(&[
                    ("lat", lat.as_str()),
                    ("lon", lon.as_str()),
                    ("format", "json"),
                    ("addressdetails", "1"),
                    ("zoom", "10"),
                ])
                .send()
        })
        .await?;

        let raw = body
            .address
            .and_then(NominatimAddress::district_label)
            .ok_or(GeoError::NoAddress)?;

        let district = self.normalizer.normalize(&raw);
        if district != raw {
            tracing::debug!("Normalized district '{}' -> '{}'", raw, district);
        }
        Ok(district)
    }

    /// Elevation in meters above sea level.
    pub async fn lookup_elevation(&self, coord: Coordinate) -> Result<f64, GeoError> {
        tracing::debug!("Looking up elevation for {}", coord);

        let lat = coord.latitude().to_string();
        let lon = coord.longitude().to_string();
        let body: ElevationResponse = send_json(&self.elevation, "elevation", || {
            self.elevation_client
                .get(&self.elevation.url)
                .query(&[("latitude", lat.as_str()), ("longitude", lon.as_str())])
                .send()
        })
        .await?;

        body.meters().ok_or(GeoError::NoElevation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(json: serde_json::Value) -> Option<String> {
        let response: NominatimResponse = serde_json::from_value(json).unwrap();
        response.address.and_then(NominatimAddress::district_label)
    }

    fn elevation(json: serde_json::Value) -> Option<f64> {
        let response: ElevationResponse = serde_json::from_value(json).unwrap();
        response.meters()
    }

    #[test]
    fn test_state_district_takes_precedence() {
        let label = address(serde_json::json!({
            "address": {
                "state_district": "Mysuru district",
                "county": "Mysuru taluk",
                "state": "Karnataka"
            }
        }));
        assert_eq!(label.as_deref(), Some("Mysuru district"));
    }

    #[test]
    fn test_county_then_state_fallback() {
        let county = address(serde_json::json!({
            "address": { "county": "Dakshina Kannada", "state": "Karnataka" }
        }));
        assert_eq!(county.as_deref(), Some("Dakshina Kannada"));

        let state = address(serde_json::json!({
            "address": { "state_district": "  ", "state": "Karnataka" }
        }));
        assert_eq!(state.as_deref(), Some("Karnataka"));
    }

    #[test]
    fn test_missing_address_yields_none() {
        assert!(address(serde_json::json!({ "error": "Unable to geocode" })).is_none());
        assert!(address(serde_json::json!({ "address": { "country": "India" } })).is_none());
    }

    #[test]
    fn test_elevation_shapes() {
        assert_eq!(elevation(serde_json::json!({ "data": [{ "elevation": 38.5 }] })), Some(38.5));
        assert_eq!(elevation(serde_json::json!({ "elevation": 12.0 })), Some(12.0));
        assert_eq!(elevation(serde_json::json!({ "elevation": [7.0] })), Some(7.0));
    }

    #[test]
    fn test_elevation_data_wins_over_bare_field() {
        let value = elevation(serde_json::json!({
            "data": [{ "elevation": 100.0 }],
            "elevation": 5.0
        }));
        assert_eq!(value, Some(100.0));
    }

    #[test]
    fn test_empty_elevation_data_falls_through() {
        assert_eq!(
            elevation(serde_json::json!({ "data": [], "elevation": 5.0 })),
            Some(5.0)
        );
        assert_eq!(
            elevation(serde_json::json!({ "data": [{ "elevation": null }], "elevation": [9.0] })),
            Some(9.0)
        );
        assert_eq!(elevation(serde_json::json!({ "data": [] })), None);
        assert_eq!(elevation(serde_json::json!({ "elevation": [] })), None);
        assert_eq!(elevation(serde_json::json!({})), None);
    }
}
