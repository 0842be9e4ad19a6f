use std::sync::Arc;

use parley_core::ToolParameters;
use parley_tools::builtin::{TranslateTool, WeatherTool, WebSearchTool};
use parley_tools::ToolRegistry;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn params(value: Value) -> ToolParameters {
    value.as_object().cloned().unwrap_or_default()
}

fn registry_with(tool: Arc<dyn parley_tools::Tool>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(tool);
    registry
}

#[tokio::test]
async fn weather_happy_path() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("q", "北京"))
        .and(query_param("appid", "ow-key"))
        .and(query_param("units", "metric"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "Beijing",
            "weather": [{"description": "晴"}],
            "main": {"temp": 21.5, "feels_like": 20.0, "humidity": 40},
            "wind": {"speed": 3.2}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let registry = registry_with(Arc::new(WeatherTool::new("ow-key", server.uri(), 5)));
    let result = registry
        .execute("weather", &params(json!({"city": "北京"})))
        .await;

    assert!(result.success, "error: {:?}", result.error);
    assert_eq!(result.result["city"], json!("北京"));
    assert_eq!(result.result["description"], json!("晴"));
    assert_eq!(result.result["temperature_c"], json!(21.5));
    assert_eq!(result.result["wind_speed_ms"], json!(3.2));
}

#[tokio::test]
async fn weather_provider_error_becomes_failed_result() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let registry = registry_with(Arc::new(WeatherTool::new("bad", server.uri(), 5)));
    let result = registry
        .execute("weather", &params(json!({"city": "上海"})))
        .await;

    assert!(!result.success);
    let error = result.error.unwrap();
    assert!(error.contains("401"));
    assert!(error.contains("invalid api key"));
}

#[tokio::test]
async fn translate_happy_path() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/translate"))
        .and(query_param("key", "gt-key"))
        .and(body_partial_json(json!({"q": "hello", "target": "zh"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"translations": [
                {"translatedText": "你好", "detectedSourceLanguage": "en"}
            ]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tool = TranslateTool::new("gt-key", format!("{}/translate", server.uri()), 5);
    let registry = registry_with(Arc::new(tool));
    let result = registry
        .execute(
            "translate",
            &params(json!({"text": "hello", "target_lang": "zh"})),
        )
        .await;

    assert!(result.success, "error: {:?}", result.error);
    assert_eq!(
        result.result,
        json!({
            "original": "hello",
            "translated": "你好",
            "source_lang": "en",
            "target_lang": "zh",
        })
    );
}

#[tokio::test]
async fn translate_defaults_to_english() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({"target": "en"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"translations": [{"translatedText": "good morning"}]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tool = TranslateTool::new("gt-key", server.uri(), 5);
    let registry = registry_with(Arc::new(tool));
    let result = registry
        .execute("translate", &params(json!({"text": "早上好"})))
        .await;

    assert!(result.success);
    assert_eq!(result.result["translated"], json!("good morning"));
    assert_eq!(result.result["source_lang"], Value::Null);
}

#[tokio::test]
async fn web_search_happy_path() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("q", "rust language"))
        .and(query_param("format", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Heading": "Rust",
            "AbstractText": "Rust is a systems programming language.",
            "AbstractURL": "https://en.wikipedia.org/wiki/Rust",
            "RelatedTopics": [
                {"Text": "Cargo", "FirstURL": "https://a"},
                {"Text": "Ferris", "FirstURL": "https://b"},
                {"Name": "More", "Topics": [
                    {"Text": "rustc", "FirstURL": "https://c"},
                    {"Text": "clippy", "FirstURL": "https://d"}
                ]}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let registry = registry_with(Arc::new(WebSearchTool::new(server.uri(), 5)));
    let result = registry
        .execute("web_search", &params(json!({"query": "rust language"})))
        .await;

    assert!(result.success, "error: {:?}", result.error);
    assert_eq!(result.result["heading"], json!("Rust"));
    let related = result.result["related"].as_array().unwrap();
    assert_eq!(related.len(), 3);
    assert_eq!(related[2]["text"], json!("rustc"));
}

#[tokio::test]
async fn web_search_without_results_fails() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Heading": "",
            "AbstractText": "",
            "AbstractURL": "",
            "RelatedTopics": []
        })))
        .mount(&server)
        .await;

    let registry = registry_with(Arc::new(WebSearchTool::new(server.uri(), 5)));
    let result = registry
        .execute("web_search", &params(json!({"query": "zzzz qqqq"})))
        .await;

    assert!(!result.success);
    assert!(result.error.unwrap().contains("no results"));
}
