//! Tool registry and trait definitions
//!
//! Tools take a single string argument and return a string. The registry
//! owns name lookup and guarantees that dispatch never fails: missing tools,
//! tool errors and tool panics all come back as a [`ToolResult`].

use parley_llm::LlmTool;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

/// Error returned by a tool's `invoke`.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Failed(String),
}

impl ToolError {
    pub fn invalid(msg: impl Into<String>) -> Self { Self::InvalidInput(msg.into()) }
    pub fn failed(msg: impl Into<String>) -> Self { Self::Failed(msg.into()) }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("tool already registered: {0}")]
    DuplicateName(String),
}

/// Outcome of dispatching a tool invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ToolResult {
    Text(String),
    /// No tool by that name; carries `(name, description)` of every registered tool.
    NotFound { name: String, available: Vec<(String, String)> },
    Failed { name: String, cause: String },
}

impl ToolResult {
    pub fn text(s: impl Into<String>) -> Self { Self::Text(s.into()) }

    pub fn to_content_string(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::NotFound { name, available } => {
                let mut out = format!("Tool not found: {}. Available tools:", name);
                for (n, d) in available {
                    out.push_str(&format!("\n  {} - {}", n, d));
                }
                out
            }
            Self::Failed { name, cause } => format!("Error: {} failed: {}", name, cause),
        }
    }

    pub fn is_error(&self) -> bool { !matches!(self, Self::Text(_)) }
}

/// A named string-in/string-out capability.
pub trait Tool: Send + Sync {
    /// Unique tool name, matched case-sensitively (e.g. "GetTime").
    fn name(&self) -> &str;

    /// Human-readable description, shown in listings and sent to the LLM.
    fn description(&self) -> &str;

    fn invoke(&self, args: &str) -> Result<String, ToolError>;

    /// JSON Schema advertised to the LLM: one free-form string field.
    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "input": {
                    "type": "string",
                    "description": "Tool input; leave empty when the tool takes none"
                }
            },
            "required": ["input"]
        })
    }

    fn to_llm_tool(&self) -> LlmTool {
        LlmTool {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

/// Adapter that turns a closure into a [`Tool`].
pub struct FnTool<F> {
    name: String,
    description: String,
    func: F,
}

impl<F> FnTool<F>
where
    F: Fn(&str) -> Result<String, ToolError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, description: impl Into<String>, func: F) -> Self {
        Self { name: name.into(), description: description.into(), func }
    }
}

impl<F> Tool for FnTool<F>
where
    F: Fn(&str) -> Result<String, ToolError> + Send + Sync,
{
    fn name(&self) -> &str { &self.name }
    fn description(&self) -> &str { &self.description }
    fn invoke(&self, args: &str) -> Result<String, ToolError> { (self.func)(args) }
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self { Self::default() }

    /// Register a tool. Names are unique; a second registration fails.
    pub fn register(&mut self, tool: impl Tool + 'static) -> Result<(), RegistryError> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(RegistryError::DuplicateName(name));
        }
        debug!("Registered tool {}", name);
        self.tools.insert(name, Arc::new(tool));
        Ok(())
    }

    pub fn register_fn<F>(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        func: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn(&str) -> Result<String, ToolError> + Send + Sync + 'static,
    {
        self.register(FnTool::new(name, description, func))
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool { self.tools.contains_key(name) }

    /// Registered names in sorted order.
    pub fn list(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize { self.tools.len() }

    pub fn is_empty(&self) -> bool { self.tools.is_empty() }

    /// `(name, description)` for every tool, sorted by name.
    pub fn describe(&self) -> Vec<(String, String)> {
        self.tools
            .values()
            .map(|t| (t.name().to_string(), t.description().to_string()))
            .collect()
    }

    /// Split raw input on the first whitespace run into `(name, rest)` and execute.
    pub fn dispatch(&self, raw: &str) -> ToolResult {
        let (name, rest) = split_command(raw);
        self.execute(name, rest)
    }

    /// Run a tool by name. Total: never panics, never returns an error.
    pub fn execute(&self, name: &str, args: &str) -> ToolResult {
        let Some(tool) = self.tools.get(name) else {
            debug!("Tool not found: {}", name);
            return ToolResult::NotFound { name: name.to_string(), available: self.describe() };
        };

        debug!("Executing tool {} ({} bytes of input)", name, args.len());
        match catch_unwind(AssertUnwindSafe(|| tool.invoke(args))) {
            Ok(Ok(output)) => ToolResult::Text(output),
            Ok(Err(e)) => {
                warn!("Tool {} failed: {}", name, e);
                ToolResult::Failed { name: name.to_string(), cause: e.to_string() }
            }
            Err(payload) => {
                let cause = panic_message(payload.as_ref());
                warn!("Tool {} panicked: {}", name, cause);
                ToolResult::Failed { name: name.to_string(), cause: format!("panicked: {}", cause) }
            }
        }
    }

    /// LLM tool definitions for all tools.
    pub fn get_definitions(&self) -> Vec<LlmTool> {
        self.tools.values().map(|t| t.to_llm_tool()).collect()
    }

    /// Multi-line listing used by `/help`.
    pub fn help(&self) -> String {
        let mut out = String::from("Available tools:");
        for (name, description) in self.describe() {
            out.push_str(&format!("\n  {} - {}", name, description));
        }
        out
    }
}

/// `"ReadFile  notes.txt"` → `("ReadFile", "notes.txt")`.
pub fn split_command(raw: &str) -> (&str, &str) {
    let raw = raw.trim();
    match raw.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim_start()),
        None => (raw, ""),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_command_variants() {
        assert_eq!(split_command("GetTime"), ("GetTime", ""));
        assert_eq!(split_command("  ReadFile   a b  "), ("ReadFile", "a b"));
        assert_eq!(split_command("WriteFile\tx ||| y"), ("WriteFile", "x ||| y"));
        assert_eq!(split_command(""), ("", ""));
    }

    #[test]
    fn not_found_listing_names_every_tool() {
        let result = ToolResult::NotFound {
            name: "FooBar".into(),
            available: vec![("A".into(), "first".into()), ("B".into(), "second".into())],
        };
        let text = result.to_content_string();
        assert!(text.starts_with("Tool not found: FooBar"));
        assert!(text.contains("A - first"));
        assert!(text.contains("B - second"));
        assert!(result.is_error());
    }
}
