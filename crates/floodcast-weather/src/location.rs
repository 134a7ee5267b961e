//! Positioning: where is the user?
//!
//! `LocationResolver` is the seam the forecast session suspends on. Denial
//! and absence of the capability are terminal; there are no retries beyond
//! the transport-level policy of the IP resolver.

use std::future::Future;

use floodcast_core::http::{build_client, send_json};
use floodcast_core::{EndpointConfig, LocationConfig};
use reqwest::Client;
use serde::Deserialize;

use crate::types::{Coordinate, LocationError};

pub trait LocationResolver: Send + Sync {
    fn resolve(&self) -> impl Future<Output = Result<Coordinate, LocationError>> + Send;
}

/// A coordinate the caller already knows.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub Coordinate);

impl LocationResolver for FixedLocation {
    async fn resolve(&self) -> Result<Coordinate, LocationError> {
        Ok(self.0)
    }
}

/// No positioning capability on this host.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedLocation;

impl LocationResolver for UnsupportedLocation {
    async fn resolve(&self) -> Result<Coordinate, LocationError> {
        Err(LocationError::Unsupported(
            "no positioning service configured".to_string(),
        ))
    }
}

/// The user declined to share their position.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeniedLocation;

impl LocationResolver for DeniedLocation {
    async fn resolve(&self) -> Result<Coordinate, LocationError> {
        Err(LocationError::PermissionDenied)
    }
}

#[derive(Debug, Deserialize)]
struct IpLocationResponse {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

/// Approximate position from an IP geolocation service answering
/// `{ latitude, longitude }`.
#[derive(Debug, Clone)]
pub struct IpLocationResolver {
    client: Client,
    endpoint: EndpointConfig,
}

impl IpLocationResolver {
    pub fn new(endpoint: EndpointConfig) -> Result<Self, LocationError> {
        let client = build_client(&endpoint)
            .map_err(|e| LocationError::Unsupported(e.to_string()))?;
        Ok(Self { client, endpoint })
    }
}

impl LocationResolver for IpLocationResolver {
    async fn resolve(&self) -> Result<Coordinate, LocationError> {
        tracing::debug!("Requesting position from {}", self.endpoint.url);

        let body: IpLocationResponse = send_json(&self.endpoint, "location", || {
            self.client.get(&self.endpoint.url).send()
        })
        .await
        .map_err(|e| LocationError::Unsupported(e.to_string()))?;

        match (body.latitude, body.longitude) {
            (Some(latitude), Some(longitude)) => Coordinate::new(latitude, longitude),
            _ => Err(LocationError::Unsupported(
                "positioning service returned no coordinates".to_string(),
            )),
        }
    }
}

/// Resolver chosen from configuration.
#[derive(Debug, Clone)]
pub enum ConfiguredLocation {
    Ip(IpLocationResolver),
    Denied(DeniedLocation),
    Unsupported(UnsupportedLocation),
}

impl ConfiguredLocation {
    pub fn from_config(config: &LocationConfig) -> Self {
        if !config.enabled {
            return Self::Denied(DeniedLocation);
        }
        match config.endpoint().map(IpLocationResolver::new) {
            Some(Ok(resolver)) => Self::Ip(resolver),
            Some(Err(e)) => {
                tracing::warn!("Positioning service unusable: {}", e);
                Self::Unsupported(UnsupportedLocation)
            }
            None => Self::Unsupported(UnsupportedLocation),
        }
    }
}

impl LocationResolver for ConfiguredLocation {
    async fn resolve(&self) -> Result<Coordinate, LocationError> {
        match self {
            Self::Ip(resolver) => resolver.resolve().await,
            Self::Denied(resolver) => resolver.resolve().await,
            Self::Unsupported(resolver) => resolver.resolve().await,
        }
    }
}
