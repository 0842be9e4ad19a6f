//! Current weather via the OpenWeatherMap API.

use async_trait::async_trait;
use parley_core::config::ToolsConfig;
use parley_core::{ToolDescriptor, ToolParameters};
use serde::Deserialize;
use serde_json::{json, Value};

use super::http;
use crate::error::ToolError;
use crate::tool::{required_str, Tool};

pub struct WeatherTool {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    name: String,
    #[serde(default)]
    weather: Vec<Condition>,
    main: Readings,
    #[serde(default)]
    wind: Option<Wind>,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
}

#[derive(Debug, Deserialize)]
struct Readings {
    temp: f64,
    feels_like: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct Wind {
    speed: f64,
}

impl WeatherTool {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: http::client(timeout_secs),
        }
    }

    pub fn from_config(config: &ToolsConfig) -> Self {
        Self::new(
            config.openweather_api_key.clone(),
            config.weather_base_url.clone(),
            config.timeout_secs,
        )
    }
}

#[async_trait]
impl Tool for WeatherTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("weather", "Get the current weather for a city")
    }

    async fn execute(&self, params: &ToolParameters) -> Result<Value, ToolError> {
        let city = required_str(params, "city")?;
        if self.api_key.is_empty() {
            return Err(ToolError::NotConfigured("weather provider".to_string()));
        }

        let resp = self
            .client
            .get(format!("{}/weather", self.base_url))
            .query(&[
                ("q", city),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
                ("lang", "zh_cn"),
            ])
            .send()
            .await?;
        let body = http::json_body(resp).await?;
        let current: CurrentWeather = serde_json::from_value(body)
            .map_err(|e| ToolError::Http(format!("unexpected weather payload: {}", e)))?;

        tracing::debug!(city = %city, "Fetched weather");

        Ok(json!({
            "city": city,
            "resolved_name": current.name,
            "description": current
                .weather
                .first()
                .map(|c| c.description.clone())
                .unwrap_or_default(),
            "temperature_c": current.main.temp,
            "feels_like_c": current.main.feels_like,
            "humidity_pct": current.main.humidity,
            "wind_speed_ms": current.wind.map(|w| w.speed),
        }))
    }
}
