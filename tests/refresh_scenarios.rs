//! End-to-end refresh cycle scenarios against a mock weather API

use std::fs;
use std::time::Duration;

use tempfile::TempDir;
use weatherdash::cache::{CachePolicy, WeatherCache};
use weatherdash::data::WeatherClient;
use weatherdash::map::MapRenderer;
use weatherdash::refresh::RefreshCycle;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn current_body(lat: f64, lon: f64, temp: f64, description: &str) -> serde_json::Value {
    serde_json::json!({
        "coord": {"lon": lon, "lat": lat},
        "weather": [{"description": description}],
        "main": {"temp": temp, "humidity": 65}
    })
}

fn forecast_body() -> serde_json::Value {
    let list: Vec<serde_json::Value> = (0..10)
        .map(|i| {
            serde_json::json!({
                "main": {"temp": 18.0 + i as f64},
                "weather": [{"description": "few clouds"}],
                "dt_txt": format!("2024-07-{:02} {:02}:00:00", 15 + i / 8, (i % 8) * 3)
            })
        })
        .collect();
    serde_json::json!({ "cod": "200", "list": list })
}

async fn mount_city(server: &MockServer, city: &str, lat: f64, lon: f64, temp: f64) {
    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("q", city))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body(lat, lon, temp, "clear sky")))
        .mount(server)
        .await;
}

async fn mount_missing(server: &MockServer, city: &str) {
    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("q", city))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(serde_json::json!({"cod": "404", "message": "city not found"})),
        )
        .mount(server)
        .await;
}

async fn mount_forecast(server: &MockServer, city: &str) {
    Mock::given(method("GET"))
        .and(path("/forecast"))
        .and(query_param("q", city))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body()))
        .mount(server)
        .await;
}

fn cycle(server: &MockServer, dir: &TempDir, tracked: &[&str], policy: CachePolicy) -> RefreshCycle {
    let client = WeatherClient::new("test-key")
        .expect("client should build")
        .with_base_url(server.uri());
    RefreshCycle::new(
        client,
        WeatherCache::new(policy),
        MapRenderer::new(dir.path().join("weather_map.html")),
        tracked.iter().map(|c| c.to_string()).collect(),
    )
}

fn cities(result: &weatherdash::refresh::RefreshResult) -> Vec<&str> {
    result.records.iter().map(|r| r.city.as_str()).collect()
}

#[tokio::test]
async fn test_two_tracked_cities_succeed() {
    let server = MockServer::start().await;
    mount_city(&server, "London", 51.51, -0.13, 14.0).await;
    mount_city(&server, "Tokyo", 35.69, 139.69, 27.0).await;
    let dir = TempDir::new().unwrap();
    let cycle = cycle(&server, &dir, &["London", "Tokyo"], CachePolicy::Forever);

    let result = cycle.run(&cycle.city_set("")).await;

    assert_eq!(cities(&result), vec!["London", "Tokyo"]);
    assert_eq!(result.blocks.len(), 2);
    assert!(result.forecast.is_none());
    let map = result.map.expect("map should be written");
    assert_eq!(map.point_count, 2);
    let html = fs::read_to_string(&map.path).unwrap();
    assert!(html.contains("\"London\"") && html.contains("\"Tokyo\""));
}

#[tokio::test]
async fn test_failed_tracked_city_is_omitted_and_search_gets_forecast() {
    let server = MockServer::start().await;
    mount_missing(&server, "London").await;
    mount_city(&server, "Paris", 48.85, 2.35, 22.0).await;
    mount_forecast(&server, "Paris").await;
    let dir = TempDir::new().unwrap();
    let cycle = cycle(&server, &dir, &["London"], CachePolicy::Forever);

    let result = cycle.run(&cycle.city_set("Paris")).await;

    assert_eq!(cities(&result), vec!["Paris"]);
    let forecast = result.forecast.as_ref().expect("forecast for Paris");
    assert_eq!(forecast.city, "Paris");
    assert_eq!(forecast.entries.len(), 8);

    let text = result.text();
    assert!(!text.contains("London"), "failed city must leave no trace");
    assert!(text.contains("24-Hour Forecast for Paris"));
}

#[tokio::test]
async fn test_search_for_tracked_city_renders_once() {
    let server = MockServer::start().await;
    mount_city(&server, "London", 51.51, -0.13, 14.0).await;
    mount_forecast(&server, "London").await;
    let dir = TempDir::new().unwrap();
    let cycle = cycle(&server, &dir, &["London"], CachePolicy::Forever);

    let result = cycle.run(&cycle.city_set("London")).await;

    assert_eq!(cities(&result), vec!["London"]);
    assert_eq!(result.blocks.len(), 1);
    assert_eq!(cycle.cache().len(), 1);
    assert_eq!(result.text().matches("London:").count(), 1);
    assert!(result.forecast.is_some());
}

#[tokio::test]
async fn test_forever_cache_serves_first_value_on_later_cycles() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body(51.51, -0.13, 10.0, "mist")))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body(51.51, -0.13, 20.0, "sun")))
        .expect(0)
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();
    let cycle = cycle(&server, &dir, &["London"], CachePolicy::Forever);

    let first = cycle.run(&cycle.city_set("")).await;
    let second = cycle.run(&cycle.city_set("")).await;

    assert_eq!(first.records[0].temperature, 10.0);
    assert_eq!(second.records[0].temperature, 10.0);
}

#[tokio::test]
async fn test_ttl_cache_refetches_on_later_cycles() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body(51.51, -0.13, 10.0, "mist")))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body(51.51, -0.13, 20.0, "sun")))
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();
    let cycle = cycle(&server, &dir, &["London"], CachePolicy::Ttl(Duration::ZERO));

    let first = cycle.run(&cycle.city_set("")).await;
    let second = cycle.run(&cycle.city_set("")).await;

    assert_eq!(first.records[0].temperature, 10.0);
    assert_eq!(second.records[0].temperature, 20.0);
}

#[tokio::test]
async fn test_output_follows_city_order_not_completion_order() {
    let server = MockServer::start().await;
    // The first city answers last
    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("q", "Anchorage"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(current_body(61.2, -149.9, 5.0, "snow"))
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&server)
        .await;
    mount_missing(&server, "Bogus").await;
    mount_city(&server, "Cairo", 30.04, 31.24, 33.0).await;
    mount_missing(&server, "Dummy").await;
    mount_city(&server, "Edinburgh", 55.95, -3.19, 12.0).await;
    let dir = TempDir::new().unwrap();
    let cycle = cycle(
        &server,
        &dir,
        &["Anchorage", "Bogus", "Cairo", "Dummy", "Edinburgh"],
        CachePolicy::Forever,
    );

    let result = cycle.run(&cycle.city_set("")).await;

    assert_eq!(cities(&result), vec!["Anchorage", "Cairo", "Edinburgh"]);
}

#[tokio::test]
async fn test_all_failures_still_complete_with_empty_map() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();
    let cycle = cycle(&server, &dir, &["London", "Tokyo"], CachePolicy::Forever);

    let result = cycle.run(&cycle.city_set("Paris")).await;

    assert!(result.records.is_empty());
    assert!(result.blocks.is_empty());
    assert!(result.forecast.is_none());
    assert!(result.text().is_empty());
    let map = result.map.expect("empty map should still be written");
    assert_eq!(map.point_count, 0);
    assert!(map.path.exists());
}

#[tokio::test]
async fn test_blank_search_requests_no_forecast() {
    let server = MockServer::start().await;
    mount_city(&server, "London", 51.51, -0.13, 14.0).await;
    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body()))
        .expect(0)
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();
    let cycle = cycle(&server, &dir, &["London"], CachePolicy::Forever);

    let result = cycle.run(&cycle.city_set("   ")).await;

    assert_eq!(cities(&result), vec!["London"]);
    assert!(result.forecast.is_none());
}
