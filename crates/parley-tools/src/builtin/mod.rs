//! Built-in tools.
//!
//! `calculator` and `time` run locally; `weather`, `translate`, and
//! `web_search` call external HTTP providers.

pub mod calculator;
mod http;
pub mod time;
pub mod translate;
pub mod weather;
pub mod web_search;

pub use calculator::CalculatorTool;
pub use time::TimeTool;
pub use translate::TranslateTool;
pub use weather::WeatherTool;
pub use web_search::WebSearchTool;
