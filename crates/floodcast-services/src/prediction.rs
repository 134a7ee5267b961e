// crates/floodcast-services/src/prediction.rs

use chrono::Datelike;
use floodcast_core::http::{build_client, send_json};
use floodcast_core::{EndpointConfig, NetworkError};
use floodcast_weather::{FloodRisk, ForecastDay, GeoContext, PredictionResult, WeatherSnapshot};
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Features for one prediction, in the model's wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub district: String,
    /// Calendar month, 1..=12
    pub month: u32,
    pub rainfall: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub elevation: f64,
}

impl PredictionRequest {
    /// Request for the current instant.
    pub fn for_current(geo: &GeoContext, current: &WeatherSnapshot, month: u32) -> Self {
        Self {
            district: geo.district.clone(),
            month,
            rainfall: current.precipitation_mm,
            temperature: current.temperature_c,
            humidity: current.humidity_pct,
            elevation: geo.elevation_meters,
        }
    }

    /// Request for one forecast day, using that day's own figures.
    pub fn for_day(geo: &GeoContext, day: &ForecastDay) -> Self {
        Self {
            district: geo.district.clone(),
            month: day.date.month(),
            rainfall: day.rain_mm(),
            temperature: day.temperature_c,
            humidity: day.humidity_pct,
            elevation: geo.elevation_meters,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PredictionResponse {
    prediction: String,
    probability: f64,
}

impl PredictionResponse {
    fn into_result(self) -> Result<PredictionResult, PredictionError> {
        let label = match self.prediction.as_str() {
            "Flood Likely" => FloodRisk::FloodLikely,
            "No Flood" | "No Flood Expected" => FloodRisk::NoFloodExpected,
            other => {
                return Err(PredictionError::InvalidResponse(format!(
                    "unknown prediction label '{}'",
                    other
                )))
            }
        };

        if !(0.0..=1.0).contains(&self.probability) {
            return Err(PredictionError::InvalidResponse(format!(
                "probability {} outside [0, 1]",
                self.probability
            )));
        }

        Ok(PredictionResult {
            label,
            probability: self.probability,
        })
    }
}

/// Any failure here means the prediction service is unavailable for this call.
#[derive(Debug, thiserror::Error)]
pub enum PredictionError {
    #[error("Prediction service unavailable: {0}")]
    ServiceUnavailable(#[from] NetworkError),
    #[error("Invalid prediction response: {0}")]
    InvalidResponse(String),
}

impl PredictionError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::ServiceUnavailable(e) => e.user_message(),
            Self::InvalidResponse(_) => "The prediction service returned an unexpected answer.",
        }
    }
}

/// Stateless client for the flood-risk model endpoint.
#[derive(Debug, Clone)]
pub struct PredictionClient {
    client: Client,
    endpoint: EndpointConfig,
}

impl PredictionClient {
    pub fn new(endpoint: EndpointConfig) -> Result<Self, PredictionError> {
        Ok(Self {
            client: build_client(&endpoint)?,
            endpoint,
        })
    }

    pub async fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult, PredictionError> {
        tracing::debug!(
            "Requesting prediction: district={}, month={}, rainfall={}",
            request.district,
            request.month,
            request.rainfall
        );

        let response: PredictionResponse = send_json(&self.endpoint, "prediction", || {
            self.client.post(&self.endpoint.url).json(request).send()
        })
        .await?;

        response.into_result()
    }
}
