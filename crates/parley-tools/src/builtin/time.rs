//! Current local date and time.

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone};
use parley_core::{ToolDescriptor, ToolParameters};
use serde_json::{json, Value};

use crate::error::ToolError;
use crate::tool::Tool;

pub struct TimeTool;

#[async_trait]
impl Tool for TimeTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("time", "Get the current local date, time, and weekday")
    }

    async fn execute(&self, _params: &ToolParameters) -> Result<Value, ToolError> {
        Ok(describe(&Local::now()))
    }
}

fn describe<Tz: TimeZone>(now: &DateTime<Tz>) -> Value
where
    Tz::Offset: std::fmt::Display,
{
    json!({
        "datetime": now.format("%Y-%m-%d %H:%M:%S").to_string(),
        "date": now.format("%Y-%m-%d").to_string(),
        "time": now.format("%H:%M:%S").to_string(),
        "weekday": now.format("%A").to_string(),
        "utc_offset": now.format("%:z").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    #[test]
    fn test_describe_fixed_time() {
        let tz = FixedOffset::east_opt(8 * 3600).unwrap();
        let now = tz.with_ymd_and_hms(2024, 3, 15, 9, 30, 0).unwrap();
        let value = describe(&now);
        assert_eq!(value["datetime"], "2024-03-15 09:30:00");
        assert_eq!(value["date"], "2024-03-15");
        assert_eq!(value["time"], "09:30:00");
        assert_eq!(value["weekday"], "Friday");
        assert_eq!(value["utc_offset"], "+08:00");
    }

    #[tokio::test]
    async fn test_execute_ignores_parameters() {
        let mut params = ToolParameters::new();
        params.insert("anything".into(), json!(1));
        let value = TimeTool.execute(&params).await.unwrap();
        assert!(value["datetime"].as_str().is_some());
    }

    #[test]
    fn test_descriptor() {
        assert_eq!(TimeTool.descriptor().name, "time");
    }
}
