//! Integration tests for GeoContextService using wiremock.

use floodcast_core::EndpointConfig;
use floodcast_weather::{Coordinate, DistrictNormalizer, GeoContextService, UNKNOWN_DISTRICT};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn service(server: &MockServer) -> GeoContextService {
    GeoContextService::new(
        EndpointConfig::new(format!("{}/reverse", server.uri()), 5, 0),
        EndpointConfig::new(format!("{}/elevation", server.uri()), 5, 0),
        DistrictNormalizer::builtin(),
    )
    .unwrap()
}

fn mysuru() -> Coordinate {
    Coordinate::new(12.2958, 76.6394).unwrap()
}

#[tokio::test]
async fn test_resolves_normalized_district_and_elevation() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/reverse"))
        .and(query_param("format", "json"))
        .and(query_param("lat", "12.2958"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "display_name": "Mysuru, Karnataka, India",
            "address": { "state_district": "Mysuru district", "state": "Karnataka" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/elevation"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "elevation": [763.0]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let lookup = service(&server).resolve_context(mysuru()).await;

    assert_eq!(lookup.context.district, "Mysore");
    assert_eq!(lookup.context.elevation_meters, 763.0);
    assert!(!lookup.degraded.is_degraded());
}

#[tokio::test]
async fn test_elevation_failure_degrades_to_zero() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "address": { "state_district": "Mysuru district" }
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/elevation"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let lookup = service(&server).resolve_context(mysuru()).await;

    assert_eq!(lookup.context.district, "Mysore");
    assert_eq!(lookup.context.elevation_meters, 0.0);
    assert!(lookup.degraded.elevation);
    assert!(!lookup.degraded.district);
}

#[tokio::test]
async fn test_geocode_failure_degrades_to_unknown_district() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "error": "Unable to geocode"
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/elevation"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{ "elevation": 21.5 }]
        })))
        .mount(&server)
        .await;

    let lookup = service(&server).resolve_context(mysuru()).await;

    assert_eq!(lookup.context.district, UNKNOWN_DISTRICT);
    assert_eq!(lookup.context.elevation_meters, 21.5);
    assert!(lookup.degraded.district);
    assert!(!lookup.degraded.elevation);
}

#[tokio::test]
async fn test_both_lookups_failing_still_returns_context() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let lookup = service(&server).resolve_context(mysuru()).await;

    assert_eq!(lookup.context.district, UNKNOWN_DISTRICT);
    assert_eq!(lookup.context.elevation_meters, 0.0);
    assert!(lookup.degraded.district && lookup.degraded.elevation);
}

#[tokio::test]
async fn test_unmapped_label_passes_through() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "address": { "county": "Dakshina Kannada", "state": "Karnataka" }
        })))
        .mount(&server)
        .await;

    let service = service(&server);
    let district = service.lookup_district(mysuru()).await.unwrap();

    assert_eq!(district, "Dakshina Kannada");
}
