//! SwitchMode: describe one of the configured operating modes

use crate::registry::{Tool, ToolError};
use parley_core::ModeProfile;
use std::collections::BTreeMap;
use std::sync::Mutex;
use tracing::info;

pub struct SwitchModeTool {
    modes: BTreeMap<String, ModeProfile>,
    description: String,
    current: Mutex<Option<String>>,
}

impl SwitchModeTool {
    pub fn new(modes: BTreeMap<String, ModeProfile>) -> Self {
        let names: Vec<&str> = modes.keys().map(|s| s.as_str()).collect();
        let description = format!("Switch assistant mode. Options: {}.", names.join(", "));
        Self { modes, description, current: Mutex::new(None) }
    }

    /// Mode selected by the last successful switch.
    pub fn current(&self) -> Option<String> {
        self.current.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Tool for SwitchModeTool {
    fn name(&self) -> &str { "SwitchMode" }

    fn description(&self) -> &str { &self.description }

    fn invoke(&self, args: &str) -> Result<String, ToolError> {
        let wanted = args.trim().to_lowercase();
        let Some(profile) = self.modes.get(&wanted) else {
            let names: Vec<&str> = self.modes.keys().map(|s| s.as_str()).collect();
            return Err(ToolError::invalid(format!(
                "unknown mode '{}'. Choose from: {}",
                args.trim(),
                names.join(", ")
            )));
        };

        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = Some(wanted.clone());
        info!("Switched to {} mode", wanted);
        Ok(format!(
            "Switched to {} mode.\nFeatures: {}\nSpeed: {}",
            wanted, profile.features, profile.speed
        ))
    }
}
