use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::error::ConfigError;
use crate::retry::RetryConfig;

/// Largest forecast window the weather provider serves.
pub const MAX_FORECAST_DAYS: u32 = 16;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Positioning provider
    #[serde(default)]
    pub location: LocationConfig,

    /// Reverse-geocoding provider
    #[serde(
        default = "EndpointConfig::geocoding",
        deserialize_with = "geocoding_section"
    )]
    pub geocoding: EndpointConfig,

    /// Elevation provider
    #[serde(
        default = "EndpointConfig::elevation",
        deserialize_with = "elevation_section"
    )]
    pub elevation: EndpointConfig,

    /// Weather-forecast provider
    #[serde(default = "EndpointConfig::weather", deserialize_with = "weather_section")]
    pub weather: EndpointConfig,

    /// Flood-risk prediction model
    #[serde(
        default = "EndpointConfig::prediction",
        deserialize_with = "prediction_section"
    )]
    pub prediction: EndpointConfig,

    #[serde(default)]
    pub forecast: ForecastConfig,
}

/// One external collaborator: where it lives and how patiently to call it.
#[derive(Debug, Clone, Serialize)]
pub struct EndpointConfig {
    pub url: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Retries after the first attempt (0 = single-shot)
    pub max_retries: u32,
}

/// A provider section as written in the file. Keys left out keep that
/// provider's own defaults.
#[derive(Debug, Default, Deserialize)]
struct EndpointSection {
    url: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
}

impl EndpointSection {
    fn over(self, defaults: EndpointConfig) -> EndpointConfig {
        EndpointConfig {
            url: self.url.unwrap_or(defaults.url),
            timeout_secs: self.timeout_secs.unwrap_or(defaults.timeout_secs),
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
        }
    }
}

fn geocoding_section<'de, D: Deserializer<'de>>(d: D) -> Result<EndpointConfig, D::Error> {
    Ok(EndpointSection::deserialize(d)?.over(EndpointConfig::geocoding()))
}

fn elevation_section<'de, D: Deserializer<'de>>(d: D) -> Result<EndpointConfig, D::Error> {
    Ok(EndpointSection::deserialize(d)?.over(EndpointConfig::elevation()))
}

fn weather_section<'de, D: Deserializer<'de>>(d: D) -> Result<EndpointConfig, D::Error> {
    Ok(EndpointSection::deserialize(d)?.over(EndpointConfig::weather()))
}

fn prediction_section<'de, D: Deserializer<'de>>(d: D) -> Result<EndpointConfig, D::Error> {
    Ok(EndpointSection::deserialize(d)?.over(EndpointConfig::prediction()))
}

fn default_timeout_secs() -> u64 {
    10
}

impl EndpointConfig {
    pub fn new(url: impl Into<String>, timeout_secs: u64, max_retries: u32) -> Self {
        Self {
            url: url.into(),
            timeout_secs,
            max_retries,
        }
    }

    /// Nominatim (OpenStreetMap)
    pub fn geocoding() -> Self {
        Self::new("https://nominatim.openstreetmap.org/reverse", 10, 1)
    }

    /// Open-Meteo elevation API
    pub fn elevation() -> Self {
        Self::new("https://api.open-meteo.com/v1/elevation", 10, 1)
    }

    /// Open-Meteo forecast API
    pub fn weather() -> Self {
        Self::new("https://api.open-meteo.com/v1/forecast", 15, 1)
    }

    /// Local model service; single-shot unless configured otherwise.
    pub fn prediction() -> Self {
        Self::new("http://127.0.0.1:8000/predict", 20, 0)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry(&self) -> RetryConfig {
        RetryConfig::with_max_retries(self.max_retries)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    /// False when the user declined positioning.
    #[serde(default = "default_location_enabled")]
    pub enabled: bool,

    /// IP positioning service; `None` means no positioning capability.
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_location_retries")]
    pub max_retries: u32,
}

fn default_location_enabled() -> bool {
    true
}

fn default_location_retries() -> u32 {
    1
}

impl LocationConfig {
    /// Endpoint view of the positioning service, if one is configured.
    pub fn endpoint(&self) -> Option<EndpointConfig> {
        self.url
            .as_ref()
            .map(|url| EndpointConfig::new(url.clone(), self.timeout_secs, self.max_retries))
    }
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            enabled: default_location_enabled(),
            url: Some("https://ipapi.co/json/".to_string()),
            timeout_secs: default_timeout_secs(),
            max_retries: default_location_retries(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastConfig {
    /// Number of future days to forecast
    #[serde(default = "default_forecast_days")]
    pub days: u32,
}

fn default_forecast_days() -> u32 {
    7
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            days: default_forecast_days(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            location: LocationConfig::default(),
            geocoding: EndpointConfig::geocoding(),
            elevation: EndpointConfig::elevation(),
            weather: EndpointConfig::weather(),
            prediction: EndpointConfig::prediction(),
            forecast: ForecastConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if missing
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, writing defaults there if it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
            .context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    pub fn load_validated(path: Option<&Path>) -> Result<(Self, ValidationResult)> {
        let config = match path {
            Some(path) => Self::load_from(path)?,
            None => Self::load()?,
        };
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if let Some(endpoint) = self.location.endpoint() {
            self.validate_endpoint(&endpoint, "location", &mut result);
        } else if self.location.enabled {
            result.add_warning(
                "location.url",
                "No positioning service configured - coordinates must be supplied",
            );
        }

        self.validate_endpoint(&self.geocoding, "geocoding", &mut result);
        self.validate_endpoint(&self.elevation, "elevation", &mut result);
        self.validate_endpoint(&self.weather, "weather", &mut result);
        self.validate_endpoint(&self.prediction, "prediction", &mut result);

        if self.forecast.days == 0 {
            result.add_error("forecast.days", "Forecast window must be at least 1 day");
        } else if self.forecast.days > MAX_FORECAST_DAYS {
            result.add_error(
                "forecast.days",
                format!("Forecast window cannot exceed {} days", MAX_FORECAST_DAYS),
            );
        }

        result
    }

    fn validate_endpoint(&self, endpoint: &EndpointConfig, section: &str, result: &mut ValidationResult) {
        self.validate_url(&endpoint.url, &format!("{}.url", section), result);

        let timeout_field = format!("{}.timeout_secs", section);
        if endpoint.timeout_secs == 0 {
            result.add_error(timeout_field, "Timeout must be greater than 0");
        } else if endpoint.timeout_secs > 300 {
            result.add_warning(timeout_field, "Timeout is unusually long (>300s)");
        }

        if endpoint.max_retries > 5 {
            result.add_warning(
                format!("{}.max_retries", section),
                "More than 5 retries will hold the session for a long time",
            );
        }
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }

                if url.port() == Some(0) {
                    result.add_error(field_name, "Port cannot be 0");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("floodcast");

        Ok(config_dir.join("config.toml"))
    }
}
