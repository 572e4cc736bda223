//! Parley Tools: string-in/string-out tools and their registry
//!
//! Each builtin tool is a self-contained file in src/tools/.
//! To add a tool: create the file, implement Tool trait, register below.

pub mod registry;
pub mod tools;

pub use registry::{split_command, FnTool, RegistryError, Tool, ToolError, ToolRegistry, ToolResult};
pub use tools::split_fields;

use parley_core::ModeProfile;
use std::collections::BTreeMap;
use std::path::Path;

/// Create the default tool registry with all builtin tools.
///
/// Relative paths given to the file tools resolve against `workspace_root`.
pub fn create_default_registry(
    workspace_root: impl AsRef<Path>,
    modes: BTreeMap<String, ModeProfile>,
) -> Result<ToolRegistry, RegistryError> {
    let mut registry = ToolRegistry::new();
    let root = workspace_root.as_ref();

    registry.register(tools::clock::GetTimeTool)?;

    // --- Files ---
    registry.register(tools::files::ReadFileTool::new(root))?;
    registry.register(tools::files::WriteFileTool::new(root))?;
    registry.register(tools::files::ListDirTool::new(root))?;
    registry.register(tools::files::SummarizeFileTool::new(root))?;

    // --- Desktop ---
    registry.register(tools::browser::OpenUrlTool::new())?;
    registry.register(tools::mode::SwitchModeTool::new(modes))?;

    Ok(registry)
}
