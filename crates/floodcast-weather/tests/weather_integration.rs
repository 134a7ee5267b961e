//! Integration tests for WeatherProvider and IpLocationResolver using wiremock.

use floodcast_core::EndpointConfig;
use floodcast_weather::{
    Coordinate, IpLocationResolver, LocationError, LocationResolver, WeatherError, WeatherProvider,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider(server: &MockServer) -> WeatherProvider {
    WeatherProvider::new(EndpointConfig::new(format!("{}/forecast", server.uri()), 5, 0), 7).unwrap()
}

fn mangaluru() -> Coordinate {
    Coordinate::new(12.9141, 74.8560).unwrap()
}

fn seven_days(rain: [f64; 7]) -> serde_json::Value {
    serde_json::json!({
        "current": { "temperature_2m": 28.0, "relative_humidity_2m": 80.0, "precipitation": 2.0 },
        "daily": {
            "time": [
                "2026-07-01", "2026-07-02", "2026-07-03", "2026-07-04",
                "2026-07-05", "2026-07-06", "2026-07-07"
            ],
            "temperature_2m_max": [29.0, 29.5, 30.0, 28.5, 27.0, 27.5, 28.0],
            "relative_humidity_2m_mean": [81.0, 82.0, 85.0, 88.0, 90.0, 86.0, 84.0],
            "precipitation_sum": rain
        }
    })
}

#[tokio::test]
async fn test_fetch_weather_requests_window_and_clamps_rain() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/forecast"))
        .and(query_param("forecast_days", "7"))
        .and(query_param("timezone", "auto"))
        .and(query_param(
            "daily",
            "temperature_2m_max,relative_humidity_2m_mean,precipitation_sum",
        ))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(seven_days([5.0, 12.5, -1.0, 40.2, 0.0, 3.3, 8.0])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let report = provider(&server).fetch_weather(mangaluru()).await.unwrap();

    assert_eq!(report.current.temperature_c, 28.0);
    assert_eq!(report.current.humidity_pct, 80.0);
    assert_eq!(report.current.precipitation_mm, 2.0);
    assert_eq!(report.future.len(), 7);
    assert_eq!(report.future[2].rain_mm(), 0.0);
    assert!(report.future.iter().all(|day| day.rain_mm() >= 0.0));
    assert!(report.future.windows(2).all(|pair| pair[0].date < pair[1].date));
}

#[tokio::test]
async fn test_provider_outage_is_weather_unavailable() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let result = provider(&server).fetch_weather(mangaluru()).await;

    assert!(matches!(result, Err(WeatherError::Network(_))));
}

#[tokio::test]
async fn test_missing_daily_block_is_weather_unavailable() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "current": { "temperature_2m": 28.0, "relative_humidity_2m": 80.0, "precipitation": 2.0 }
        })))
        .mount(&server)
        .await;

    let result = provider(&server).fetch_weather(mangaluru()).await;

    assert!(matches!(result, Err(WeatherError::Malformed(_))));
}

#[tokio::test]
async fn test_ip_location_resolves_coordinate() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/json/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "city": "Mangaluru",
            "latitude": 12.9141,
            "longitude": 74.856
        })))
        .mount(&server)
        .await;

    let resolver =
        IpLocationResolver::new(EndpointConfig::new(format!("{}/json/", server.uri()), 5, 0)).unwrap();
    let coord = resolver.resolve().await.unwrap();

    assert_eq!(coord.latitude(), 12.9141);
    assert_eq!(coord.longitude(), 74.856);
}

#[tokio::test]
async fn test_ip_location_without_coordinates_is_unsupported() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/json/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "error": true,
            "reason": "RateLimited"
        })))
        .mount(&server)
        .await;

    let resolver =
        IpLocationResolver::new(EndpointConfig::new(format!("{}/json/", server.uri()), 5, 0)).unwrap();

    assert!(matches!(
        resolver.resolve().await,
        Err(LocationError::Unsupported(_))
    ));
}
