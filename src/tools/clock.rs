//! get_current_day_and_time tool - local date/time context

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone};
use serde_json::Value;

use super::{Tool, ToolContext, ToolOutput};
use crate::error::Result;

pub struct ClockTool;

/// Render a moment as the sentence handed to the model
pub fn describe_moment<Tz: TimeZone>(moment: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "Today is {}. The current time is {}.",
        moment.format("%A, %B %-d, %Y"),
        moment.format("%I:%M %p")
    )
}

#[async_trait]
impl Tool for ClockTool {
    fn name(&self) -> &'static str {
        "get_current_day_and_time"
    }

    fn description(&self) -> &'static str {
        "Get the current date, day of the week and time, for time-sensitive or scheduling advice."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _input: Value, _ctx: &ToolContext) -> Result<ToolOutput> {
        Ok(ToolOutput::success(describe_moment(&Local::now())))
    }
}
