use chrono::NaiveDate;
use floodcast_core::NetworkError;
use serde::Serialize;

/// Latitude/longitude pair, validated on construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, LocationError> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(LocationError::InvalidCoordinate {
                latitude,
                longitude,
            });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// District used when reverse geocoding yields nothing.
pub const UNKNOWN_DISTRICT: &str = "Unknown District";

/// Resolved location metadata for a coordinate, possibly with defaulted fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoContext {
    /// Normalized district name
    pub district: String,
    pub elevation_meters: f64,
}

/// Which `GeoContext` fields fell back to their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct GeoDegradation {
    pub district: bool,
    pub elevation: bool,
}

impl GeoDegradation {
    pub fn is_degraded(&self) -> bool {
        self.district || self.elevation
    }
}

/// Outcome of a geo-context lookup: always a context, plus what degraded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoLookup {
    pub context: GeoContext,
    pub degraded: GeoDegradation,
}

/// Conditions at the current instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeatherSnapshot {
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub precipitation_mm: f64,
}

/// Model verdict for one set of conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FloodRisk {
    FloodLikely,
    NoFloodExpected,
}

impl FloodRisk {
    pub fn description(&self) -> &'static str {
        match self {
            Self::FloodLikely => "Flood Likely",
            Self::NoFloodExpected => "No Flood Expected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictionResult {
    pub label: FloodRisk,
    /// Probability of flooding, 0..=1
    pub probability: f64,
}

/// One day of the forecast window.
///
/// Rainfall is clamped to be non-negative here, once; consumers never clamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastDay {
    pub date: NaiveDate,
    pub temperature_c: f64,
    pub humidity_pct: f64,
    rain_mm: f64,
    /// Filled in by the forecast loop; `None` until predicted or if prediction failed
    pub prediction: Option<PredictionResult>,
}

impl ForecastDay {
    pub fn new(date: NaiveDate, temperature_c: f64, humidity_pct: f64, rain_mm: f64) -> Self {
        Self {
            date,
            temperature_c,
            humidity_pct,
            rain_mm: rain_mm.max(0.0),
            prediction: None,
        }
    }

    pub fn rain_mm(&self) -> f64 {
        self.rain_mm
    }
}

/// Current conditions plus the ordered daily window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherReport {
    pub current: WeatherSnapshot,
    pub future: Vec<ForecastDay>,
}

/// Positioning errors
#[derive(Debug, thiserror::Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location service unsupported: {0}")]
    Unsupported(String),
    #[error("Invalid coordinate ({latitude}, {longitude})")]
    InvalidCoordinate { latitude: f64, longitude: f64 },
}

impl LocationError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::PermissionDenied => "Location access denied. Enter coordinates manually.",
            Self::Unsupported(_) => "Location detection is unavailable. Enter coordinates manually.",
            Self::InvalidCoordinate { .. } => {
                "Coordinates are out of range. Latitude must be within ±90 and longitude within ±180."
            }
        }
    }
}

/// Failure of one geo sub-lookup; never escapes `GeoContextService`.
#[derive(Debug, thiserror::Error)]
pub enum GeoError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
    #[error("No usable address in reverse-geocode response")]
    NoAddress,
    #[error("No elevation in response")]
    NoElevation,
}

/// Weather provider errors; all of them mean weather is unavailable.
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
    #[error("Malformed weather payload: {0}")]
    Malformed(String),
}

impl WeatherError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Network(e) => e.user_message(),
            Self::Malformed(_) => "The weather service returned incomplete data. Please try again.",
        }
    }
}
