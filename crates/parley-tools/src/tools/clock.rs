//! GetTime: current local date and time

use crate::registry::{Tool, ToolError};
use chrono::Local;

pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct GetTimeTool;

impl Tool for GetTimeTool {
    fn name(&self) -> &str { "GetTime" }

    fn description(&self) -> &str { "Get the current date and time. No input required." }

    fn invoke(&self, _args: &str) -> Result<String, ToolError> {
        Ok(Local::now().format(TIME_FORMAT).to_string())
    }
}
