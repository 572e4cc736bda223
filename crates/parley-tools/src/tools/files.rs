//! File tools: ReadFile, WriteFile, ListDir, SummarizeFile

use super::{resolve_path, split_fields};
use crate::registry::{Tool, ToolError};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Characters kept by SummarizeFile.
pub const SUMMARY_CHARS: usize = 1000;

fn read_to_string(path: &Path, shown: &str) -> Result<String, ToolError> {
    fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ToolError::failed(format!("file not found: {}", shown)),
        _ => ToolError::Io(e),
    })
}

fn require_path(args: &str) -> Result<&str, ToolError> {
    let path = args.trim();
    if path.is_empty() {
        return Err(ToolError::invalid("expected a file path"));
    }
    Ok(path)
}

pub struct ReadFileTool {
    workspace_root: PathBuf,
}

impl ReadFileTool {
    pub fn new(workspace_root: impl AsRef<Path>) -> Self {
        Self { workspace_root: workspace_root.as_ref().to_path_buf() }
    }
}

impl Tool for ReadFileTool {
    fn name(&self) -> &str { "ReadFile" }

    fn description(&self) -> &str { "Read a file from disk. Input: a valid file path." }

    fn invoke(&self, args: &str) -> Result<String, ToolError> {
        let path = require_path(args)?;
        let content = read_to_string(&resolve_path(&self.workspace_root, path), path)?;
        debug!("ReadFile: {} ({} bytes)", path, content.len());
        Ok(content)
    }
}

pub struct WriteFileTool {
    workspace_root: PathBuf,
}

impl WriteFileTool {
    pub fn new(workspace_root: impl AsRef<Path>) -> Self {
        Self { workspace_root: workspace_root.as_ref().to_path_buf() }
    }
}

impl Tool for WriteFileTool {
    fn name(&self) -> &str { "WriteFile" }

    fn description(&self) -> &str {
        "Write content to a file. Input format: filename.txt ||| content."
    }

    fn invoke(&self, args: &str) -> Result<String, ToolError> {
        let fields = split_fields(args, 2)
            .ok_or_else(|| ToolError::invalid("use format: filename.txt ||| content"))?;
        let (name, content) = (fields[0], fields[1]);
        if name.is_empty() {
            return Err(ToolError::invalid("missing file name before |||"));
        }

        let full_path = resolve_path(&self.workspace_root, name);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&full_path, content)?;
        debug!("WriteFile: {} ({} bytes)", name, content.len());
        Ok(format!("Wrote {} bytes to {}", content.len(), name))
    }
}

pub struct ListDirTool {
    workspace_root: PathBuf,
}

impl ListDirTool {
    pub fn new(workspace_root: impl AsRef<Path>) -> Self {
        Self { workspace_root: workspace_root.as_ref().to_path_buf() }
    }
}

impl Tool for ListDirTool {
    fn name(&self) -> &str { "ListDir" }

    fn description(&self) -> &str {
        "List directory contents. Input: a directory path (defaults to the current directory)."
    }

    fn invoke(&self, args: &str) -> Result<String, ToolError> {
        let path = match args.trim() {
            "" => ".",
            p => p,
        };
        let dir = resolve_path(&self.workspace_root, path);

        let mut entries = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let mut name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                name.push('/');
            }
            entries.push(name);
        }
        entries.sort();

        if entries.is_empty() {
            return Ok(format!("{} is empty", path));
        }
        Ok(entries.join("\n"))
    }
}

pub struct SummarizeFileTool {
    workspace_root: PathBuf,
}

impl SummarizeFileTool {
    pub fn new(workspace_root: impl AsRef<Path>) -> Self {
        Self { workspace_root: workspace_root.as_ref().to_path_buf() }
    }
}

impl Tool for SummarizeFileTool {
    fn name(&self) -> &str { "SummarizeFile" }

    fn description(&self) -> &str {
        "Show the beginning of a file (first 1000 characters). Input: a valid file path."
    }

    fn invoke(&self, args: &str) -> Result<String, ToolError> {
        let path = require_path(args)?;
        let content = read_to_string(&resolve_path(&self.workspace_root, path), path)?;
        let mut summary: String = content.chars().take(SUMMARY_CHARS).collect();
        if content.chars().nth(SUMMARY_CHARS).is_some() {
            summary.push_str("...");
        }
        Ok(summary)
    }
}
