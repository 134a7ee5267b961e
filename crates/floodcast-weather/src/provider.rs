//! Open-Meteo forecast client: current conditions plus a daily window.

use chrono::NaiveDate;
use floodcast_core::http::{build_client, send_json};
use floodcast_core::EndpointConfig;
use reqwest::Client;
use serde::Deserialize;

use crate::types::{Coordinate, ForecastDay, WeatherError, WeatherReport, WeatherSnapshot};

const CURRENT_FIELDS: &str = "temperature_2m,relative_humidity_2m,precipitation";
const DAILY_FIELDS: &str = "temperature_2m_max,relative_humidity_2m_mean,precipitation_sum";

#[derive(Debug, Deserialize)]
struct OpenMeteoResponse {
    current: Option<OpenMeteoCurrent>,
    daily: Option<OpenMeteoDaily>,
}

#[derive(Debug, Deserialize)]
struct OpenMeteoCurrent {
    temperature_2m: f64,
    relative_humidity_2m: f64,
    precipitation: f64,
}

/// Positionally aligned daily arrays.
#[derive(Debug, Deserialize)]
struct OpenMeteoDaily {
    time: Option<Vec<String>>,
    temperature_2m_max: Option<Vec<f64>>,
    relative_humidity_2m_mean: Option<Vec<f64>>,
    precipitation_sum: Option<Vec<f64>>,
}

fn require<T>(field: Option<T>, name: &str) -> Result<T, WeatherError> {
    field.ok_or_else(|| WeatherError::Malformed(format!("missing {}", name)))
}

impl OpenMeteoResponse {
    fn into_report(self) -> Result<WeatherReport, WeatherError> {
        let current = require(self.current, "current")?;
        let daily = require(self.daily, "daily")?;

        let time = require(daily.time, "daily.time")?;
        let temperature = require(daily.temperature_2m_max, "daily.temperature_2m_max")?;
        let humidity = require(daily.relative_humidity_2m_mean, "daily.relative_humidity_2m_mean")?;
        let rain = require(daily.precipitation_sum, "daily.precipitation_sum")?;

        if temperature.len() != time.len() || humidity.len() != time.len() || rain.len() != time.len() {
            return Err(WeatherError::Malformed(format!(
                "daily arrays are misaligned (time={}, temperature={}, humidity={}, precipitation={})",
                time.len(),
                temperature.len(),
                humidity.len(),
                rain.len()
            )));
        }

        let mut future = Vec::with_capacity(time.len());
        for (i, date) in time.iter().enumerate() {
            let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .map_err(|e| WeatherError::Malformed(format!("bad date '{}': {}", date, e)))?;
            future.push(ForecastDay::new(date, temperature[i], humidity[i], rain[i]));
        }

        if future.windows(2).any(|pair| pair[0].date >= pair[1].date) {
            return Err(WeatherError::Malformed(
                "daily dates are not strictly ascending".to_string(),
            ));
        }

        Ok(WeatherReport {
            current: WeatherSnapshot {
                temperature_c: current.temperature_2m,
                humidity_pct: current.relative_humidity_2m,
                precipitation_mm: current.precipitation,
            },
            future,
        })
    }
}

#[derive(Debug, Clone)]
pub struct WeatherProvider {
    client: Client,
    endpoint: EndpointConfig,
    forecast_days: u32,
}

impl WeatherProvider {
    pub fn new(endpoint: EndpointConfig, forecast_days: u32) -> Result<Self, WeatherError> {
        Ok(Self {
            client: build_client(&endpoint)?,
            endpoint,
            forecast_days,
        })
    }

    pub fn forecast_days(&self) -> u32 {
        self.forecast_days
    }

    /// Fetch current conditions and the daily window in one call.
    pub async fn fetch_weather(&self, coord: Coordinate) -> Result<WeatherReport, WeatherError> {
        tracing::debug!("Fetching {}-day weather for {}", self.forecast_days, coord);

        let lat = coord.latitude().to_string();
        let lon = coord.longitude().to_string();
        let days = self.forecast_days.to_string();
        let body: OpenMeteoResponse = send_json(&self.endpoint, "weather", || {
            self.client
                .get(&self.endpoint.url)
                .query(&[
                    ("latitude", lat.as_str()),
                    ("longitude", lon.as_str()),
                    ("current", CURRENT_FIELDS),
                    ("daily", DAILY_FIELDS),
                    ("timezone", "auto"),
                    ("forecast_days", days.as_str()),
                ])
                .send()
        })
        .await?;

        let report = body.into_report()?;
        tracing::info!(
            "Weather for {}: {}°C, {}% humidity, {} day(s) of forecast",
            coord,
            report.current.temperature_c,
            report.current.humidity_pct,
            report.future.len()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: serde_json::Value) -> Result<WeatherReport, WeatherError> {
        let response: OpenMeteoResponse = serde_json::from_value(json).unwrap();
        response.into_report()
    }

    #[test]
    fn test_parses_aligned_arrays() {
        let report = parse(serde_json::json!({
            "current": { "temperature_2m": 28.0, "relative_humidity_2m": 80.0, "precipitation": 2.0 },
            "daily": {
                "time": ["2026-07-01", "2026-07-02"],
                "temperature_2m_max": [29.5, 30.1],
                "relative_humidity_2m_mean": [82.0, 78.0],
                "precipitation_sum": [12.4, -2.3]
            }
        }))
        .unwrap();

        assert_eq!(report.current.precipitation_mm, 2.0);
        assert_eq!(report.future.len(), 2);
        assert_eq!(report.future[0].rain_mm(), 12.4);
        assert_eq!(report.future[1].rain_mm(), 0.0);
        assert_eq!(report.future[1].temperature_c, 30.1);
    }

    #[test]
    fn test_empty_daily_arrays_yield_empty_window() {
        let report = parse(serde_json::json!({
            "current": { "temperature_2m": 20.0, "relative_humidity_2m": 50.0, "precipitation": 0.0 },
            "daily": {
                "time": [],
                "temperature_2m_max": [],
                "relative_humidity_2m_mean": [],
                "precipitation_sum": []
            }
        }))
        .unwrap();

        assert!(report.future.is_empty());
    }

    #[test]
    fn test_missing_daily_array_is_malformed() {
        let result = parse(serde_json::json!({
            "current": { "temperature_2m": 20.0, "relative_humidity_2m": 50.0, "precipitation": 0.0 },
            "daily": {
                "time": ["2026-07-01"],
                "temperature_2m_max": [25.0],
                "relative_humidity_2m_mean": [60.0]
            }
        }));

        match result {
            Err(WeatherError::Malformed(message)) => assert!(message.contains("precipitation_sum")),
            other => panic!("expected malformed payload, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_current_is_malformed() {
        let result = parse(serde_json::json!({
            "daily": {
                "time": [],
                "temperature_2m_max": [],
                "relative_humidity_2m_mean": [],
                "precipitation_sum": []
            }
        }));
        assert!(matches!(result, Err(WeatherError::Malformed(_))));
    }

    #[test]
    fn test_misaligned_arrays_are_malformed() {
        let result = parse(serde_json::json!({
            "current": { "temperature_2m": 20.0, "relative_humidity_2m": 50.0, "precipitation": 0.0 },
            "daily": {
                "time": ["2026-07-01", "2026-07-02"],
                "temperature_2m_max": [25.0],
                "relative_humidity_2m_mean": [60.0, 61.0],
                "precipitation_sum": [0.0, 0.0]
            }
        }));
        assert!(matches!(result, Err(WeatherError::Malformed(_))));
    }

    #[test]
    fn test_out_of_order_dates_are_malformed() {
        let result = parse(serde_json::json!({
            "current": { "temperature_2m": 20.0, "relative_humidity_2m": 50.0, "precipitation": 0.0 },
            "daily": {
                "time": ["2026-07-02", "2026-07-01"],
                "temperature_2m_max": [25.0, 25.0],
                "relative_humidity_2m_mean": [60.0, 61.0],
                "precipitation_sum": [0.0, 0.0]
            }
        }));
        assert!(matches!(result, Err(WeatherError::Malformed(_))));
    }
}
