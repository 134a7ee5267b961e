//! Forecast session orchestration.
//!
//! One session: locate the user, gather geo context and weather concurrently,
//! predict today, then predict each forecast day in date order, one call at a
//! time. Only location and weather failures end a session; geo lookups and
//! prediction calls degrade and are recorded as issues on the result.

use anyhow::Context;
use chrono::{Datelike, Local, NaiveDate};
use floodcast_core::Config;
use floodcast_weather::{
    Coordinate, DistrictNormalizer, ForecastDay, GeoContext, GeoContextService, LocationError,
    LocationResolver, PredictionResult, WeatherError, WeatherProvider, WeatherSnapshot,
};
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use crate::prediction::{PredictionClient, PredictionError, PredictionRequest};

/// Session lifecycle, reported through the progress channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Idle,
    LocatingUser,
    /// Continuing with a fallback: manual coordinate or defaulted geo fields
    Degraded,
    GatheringContext,
    PredictingToday,
    PredictingForecast,
    Complete,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SessionProgress {
    State(SessionState),
    DayAttempted {
        index: usize,
        date: NaiveDate,
        predicted: bool,
    },
}

/// Non-fatal problems, kept on the forecast so gaps can be shown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SessionIssue {
    ManualLocationUsed { reason: String },
    GeoContextDegraded { district: bool, elevation: bool },
    TodayPredictionUnavailable { reason: String },
    DayPredictionUnavailable { index: usize, date: NaiveDate, reason: String },
}

impl std::fmt::Display for SessionIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ManualLocationUsed { reason } => {
                write!(f, "Using manually supplied location ({})", reason)
            }
            Self::GeoContextDegraded { district, elevation } => {
                let fields: Vec<&str> = [(*district, "district"), (*elevation, "elevation")]
                    .into_iter()
                    .filter_map(|(degraded, name)| degraded.then_some(name))
                    .collect();
                write!(f, "Could not resolve {}; using defaults", fields.join(" and "))
            }
            Self::TodayPredictionUnavailable { reason } => {
                write!(f, "Today's prediction unavailable: {}", reason)
            }
            Self::DayPredictionUnavailable { date, reason, .. } => {
                write!(f, "Prediction for {} unavailable: {}", date, reason)
            }
        }
    }
}

/// Session-fatal errors. No partial data accompanies these.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Location permission denied")]
    LocationDenied,
    #[error("Location unsupported: {0}")]
    LocationUnsupported(String),
    #[error("Invalid coordinate ({latitude}, {longitude})")]
    InvalidCoordinate { latitude: f64, longitude: f64 },
    #[error("Weather unavailable: {0}")]
    WeatherUnavailable(#[from] WeatherError),
    #[error("Session cancelled")]
    Cancelled,
}

impl From<LocationError> for SessionError {
    fn from(err: LocationError) -> Self {
        match err {
            LocationError::PermissionDenied => Self::LocationDenied,
            LocationError::Unsupported(reason) => Self::LocationUnsupported(reason),
            LocationError::InvalidCoordinate {
                latitude,
                longitude,
            } => Self::InvalidCoordinate {
                latitude,
                longitude,
            },
        }
    }
}

impl SessionError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::LocationDenied => "Location access denied. Enter coordinates manually.",
            Self::LocationUnsupported(_) => {
                "Location detection is unavailable. Enter coordinates manually."
            }
            Self::InvalidCoordinate { .. } => "The detected location is not a valid coordinate.",
            Self::WeatherUnavailable(e) => e.user_message(),
            Self::Cancelled => "The forecast was cancelled.",
        }
    }
}

/// Complete result of one session, owned by the caller.
#[derive(Debug, Clone, Serialize)]
pub struct Forecast {
    pub coordinate: Coordinate,
    pub geo: GeoContext,
    pub current: WeatherSnapshot,
    pub today: Option<PredictionResult>,
    /// Ascending by date; days whose prediction failed keep `prediction = None`
    pub days: Vec<ForecastDay>,
    pub issues: Vec<SessionIssue>,
}

impl Forecast {
    /// Days that have no prediction.
    pub fn missing_days(&self) -> impl Iterator<Item = &ForecastDay> {
        self.days.iter().filter(|day| day.prediction.is_none())
    }

    pub fn is_degraded(&self) -> bool {
        !self.issues.is_empty()
    }
}

pub struct ForecastOrchestrator<L> {
    location: L,
    geo: GeoContextService,
    weather: WeatherProvider,
    prediction: PredictionClient,
    progress: Option<UnboundedSender<SessionProgress>>,
    cancel: CancellationToken,
    today: Option<NaiveDate>,
}

impl<L: LocationResolver> ForecastOrchestrator<L> {
    pub fn new(
        location: L,
        geo: GeoContextService,
        weather: WeatherProvider,
        prediction: PredictionClient,
    ) -> Self {
        Self {
            location,
            geo,
            weather,
            prediction,
            progress: None,
            cancel: CancellationToken::new(),
            today: None,
        }
    }

    /// Build every provider client from configuration.
    pub fn from_config(
        config: &Config,
        location: L,
        districts: DistrictNormalizer,
    ) -> anyhow::Result<Self> {
        let geo = GeoContextService::new(
            config.geocoding.clone(),
            config.elevation.clone(),
            districts,
        )
        .context("Failed to build geo context clients")?;
        let weather = WeatherProvider::new(config.weather.clone(), config.forecast.days)
            .context("Failed to build weather client")?;
        let prediction = PredictionClient::new(config.prediction.clone())
            .context("Failed to build prediction client")?;
        Ok(Self::new(location, geo, weather, prediction))
    }

    pub fn with_progress(mut self, progress: UnboundedSender<SessionProgress>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Fix the date used for today's month instead of the location's date.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Run one forecast session.
    ///
    /// `manual` is used only when positioning fails; the session is then
    /// marked degraded.
    pub async fn run_session(&self, manual: Option<Coordinate>) -> Result<Forecast, SessionError> {
        self.notify(SessionProgress::State(SessionState::Idle));
        let result = self.run(manual).await;
        match &result {
            Ok(forecast) => {
                tracing::info!(
                    "Forecast complete: {} day(s), {} issue(s)",
                    forecast.days.len(),
                    forecast.issues.len()
                );
                self.notify(SessionProgress::State(SessionState::Complete));
            }
            Err(e) => {
                tracing::error!("Forecast session failed: {}", e);
                self.notify(SessionProgress::State(SessionState::Failed));
            }
        }
        result
    }

    async fn run(&self, manual: Option<Coordinate>) -> Result<Forecast, SessionError> {
        let mut issues = Vec::new();

        self.transition(SessionState::LocatingUser)?;
        let coordinate = self.locate(manual, &mut issues).await?;

        self.transition(SessionState::GatheringContext)?;
        let (geo, weather) = tokio::join!(
            self.geo.resolve_context(coordinate),
            self.weather.fetch_weather(coordinate)
        );
        let weather = weather?;
        if geo.degraded.is_degraded() {
            issues.push(SessionIssue::GeoContextDegraded {
                district: geo.degraded.district,
                elevation: geo.degraded.elevation,
            });
            self.notify(SessionProgress::State(SessionState::Degraded));
        }
        let geo = geo.context;

        self.transition(SessionState::PredictingToday)?;
        let month = self.current_date(&weather.future).month();
        let request = PredictionRequest::for_current(&geo, &weather.current, month);
        let today = match self.prediction.predict(&request).await {
            Ok(result) => Some(result),
            Err(e) => {
                tracing::warn!("Today's prediction failed: {}", e);
                issues.push(SessionIssue::TodayPredictionUnavailable {
                    reason: e.to_string(),
                });
                None
            }
        };

        self.transition(SessionState::PredictingForecast)?;
        let mut days = weather.future;
        for (index, day) in days.iter_mut().enumerate() {
            self.check_cancelled()?;
            let predicted = match self.predict_day(&geo, day).await {
                Ok(result) => {
                    day.prediction = Some(result);
                    true
                }
                Err(e) => {
                    tracing::warn!("Prediction for {} failed: {}", day.date, e);
                    issues.push(SessionIssue::DayPredictionUnavailable {
                        index,
                        date: day.date,
                        reason: e.to_string(),
                    });
                    false
                }
            };
            self.notify(SessionProgress::DayAttempted {
                index,
                date: day.date,
                predicted,
            });
        }

        Ok(Forecast {
            coordinate,
            geo,
            current: weather.current,
            today,
            days,
            issues,
        })
    }

    async fn locate(
        &self,
        manual: Option<Coordinate>,
        issues: &mut Vec<SessionIssue>,
    ) -> Result<Coordinate, SessionError> {
        match self.location.resolve().await {
            Ok(coordinate) => {
                tracing::info!("Located user at {}", coordinate);
                Ok(coordinate)
            }
            Err(e) => match manual {
                Some(coordinate) => {
                    tracing::warn!("Positioning failed ({}), using manual coordinate {}", e, coordinate);
                    issues.push(SessionIssue::ManualLocationUsed {
                        reason: e.to_string(),
                    });
                    self.notify(SessionProgress::State(SessionState::Degraded));
                    Ok(coordinate)
                }
                None => Err(e.into()),
            },
        }
    }

    async fn predict_day(
        &self,
        geo: &GeoContext,
        day: &ForecastDay,
    ) -> Result<PredictionResult, PredictionError> {
        let request = PredictionRequest::for_day(geo, day);
        self.prediction.predict(&request).await
    }

    /// The weather window starts on the location's own calendar day, so its
    /// first date beats the host clock near a month boundary.
    fn current_date(&self, window: &[ForecastDay]) -> NaiveDate {
        self.today
            .or_else(|| window.first().map(|day| day.date))
            .unwrap_or_else(|| Local::now().date_naive())
    }

    fn transition(&self, state: SessionState) -> Result<(), SessionError> {
        self.check_cancelled()?;
        tracing::info!("Session state: {:?}", state);
        self.notify(SessionProgress::State(state));
        Ok(())
    }

    fn check_cancelled(&self) -> Result<(), SessionError> {
        if self.cancel.is_cancelled() {
            return Err(SessionError::Cancelled);
        }
        Ok(())
    }

    fn notify(&self, progress: SessionProgress) {
        if let Some(tx) = &self.progress {
            // A dropped receiver must not affect the session.
            let _ = tx.send(progress);
        }
    }
}
