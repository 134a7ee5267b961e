//! Location, geographic context and weather inputs for Floodcast.
//!
//! Resolves where the user is, which district and elevation that is, and
//! what the weather is doing now and over the forecast window.

pub mod district;
pub mod geocode;
pub mod location;
pub mod provider;
pub mod types;

pub use district::DistrictNormalizer;
pub use geocode::GeoContextService;
pub use location::{
    ConfiguredLocation, DeniedLocation, FixedLocation, IpLocationResolver, LocationResolver,
    UnsupportedLocation,
};
pub use provider::WeatherProvider;
pub use types::*;
