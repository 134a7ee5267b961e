//! Flood-risk prediction and forecast session orchestration for Floodcast.

pub mod forecast;
pub mod prediction;

pub use forecast::{
    Forecast, ForecastOrchestrator, SessionError, SessionIssue, SessionProgress, SessionState,
};
pub use prediction::{PredictionClient, PredictionError, PredictionRequest};
