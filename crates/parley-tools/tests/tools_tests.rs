//! Tests for parley-tools: ToolResult, ToolRegistry dispatch, and the builtin tools against a real filesystem

use parley_core::ParleyConfig;
use parley_tools::tools::browser::{validate_url, OpenUrlTool};
use parley_tools::tools::files::{ReadFileTool, SummarizeFileTool};
use parley_tools::tools::mode::SwitchModeTool;
use parley_tools::*;
use tempfile::TempDir;

fn default_registry(dir: &TempDir) -> ToolRegistry {
    create_default_registry(dir.path(), ParleyConfig::default().modes).unwrap()
}

fn text(result: ToolResult) -> String {
    match result {
        ToolResult::Text(s) => s,
        other => panic!("expected text, got {:?}", other),
    }
}

// ===========================================================================
// ToolResult
// ===========================================================================

#[test]
fn tool_result_text() {
    let r = ToolResult::text("hello");
    assert!(!r.is_error());
    assert_eq!(r.to_content_string(), "hello");
}

#[test]
fn tool_result_failed() {
    let r = ToolResult::Failed { name: "ReadFile".into(), cause: "boom".into() };
    assert!(r.is_error());
    assert_eq!(r.to_content_string(), "Error: ReadFile failed: boom");
}

// ===========================================================================
// ToolRegistry
// ===========================================================================

#[test]
fn registry_default_is_empty() {
    let reg = ToolRegistry::new();
    assert!(reg.is_empty());
    assert!(reg.get_definitions().is_empty());
}

#[test]
fn registry_rejects_duplicate_names() {
    let mut reg = ToolRegistry::new();
    reg.register_fn("Echo", "echo input", |a| Ok(a.to_string())).unwrap();
    let err = reg.register_fn("Echo", "again", |_| Ok(String::new())).unwrap_err();
    assert!(matches!(err, RegistryError::DuplicateName(ref n) if n == "Echo"));
    assert_eq!(reg.len(), 1);
    assert_eq!(reg.get("Echo").unwrap().description(), "echo input");
}

#[test]
fn registry_lookup_is_case_sensitive() {
    let mut reg = ToolRegistry::new();
    reg.register_fn("GetTime", "time", |_| Ok("now".into())).unwrap();
    assert!(reg.contains("GetTime"));
    assert!(!reg.contains("gettime"));
    assert!(matches!(reg.dispatch("gettime"), ToolResult::NotFound { .. }));
}

#[test]
fn dispatch_passes_rest_of_line() {
    let mut reg = ToolRegistry::new();
    reg.register_fn("Echo", "echo input", |a| Ok(format!("<{}>", a))).unwrap();
    assert_eq!(text(reg.dispatch("Echo   hello there")), "<hello there>");
    assert_eq!(text(reg.dispatch("Echo")), "<>");
}

#[test]
fn dispatch_missing_tool_lists_registered_tools() {
    let mut reg = ToolRegistry::new();
    reg.register_fn("Alpha", "first tool", |_| Ok(String::new())).unwrap();
    reg.register_fn("Beta", "second tool", |_| Ok(String::new())).unwrap();

    match reg.dispatch("FooBar args") {
        ToolResult::NotFound { name, available } => {
            assert_eq!(name, "FooBar");
            assert_eq!(
                available,
                vec![
                    ("Alpha".to_string(), "first tool".to_string()),
                    ("Beta".to_string(), "second tool".to_string()),
                ]
            );
        }
        other => panic!("expected NotFound, got {:?}", other),
    }
}

#[test]
fn dispatch_wraps_tool_errors() {
    let mut reg = ToolRegistry::new();
    reg.register_fn("Fail", "always fails", |_| Err(ToolError::failed("disk on fire"))).unwrap();
    assert_eq!(
        reg.dispatch("Fail now"),
        ToolResult::Failed { name: "Fail".into(), cause: "disk on fire".into() }
    );
}

#[test]
fn dispatch_survives_panicking_tool() {
    let mut reg = ToolRegistry::new();
    reg.register_fn("Boom", "panics", |_| panic!("kaboom")).unwrap();
    match reg.dispatch("Boom") {
        ToolResult::Failed { name, cause } => {
            assert_eq!(name, "Boom");
            assert!(cause.contains("kaboom"), "cause: {}", cause);
        }
        other => panic!("expected Failed, got {:?}", other),
    }
    // Registry still usable afterwards
    assert!(matches!(reg.dispatch("Boom"), ToolResult::Failed { .. }));
}

#[test]
fn definitions_advertise_single_input_field() {
    let dir = TempDir::new().unwrap();
    let reg = default_registry(&dir);
    let defs = reg.get_definitions();
    assert_eq!(defs.len(), reg.len());
    for def in defs {
        assert_eq!(def.input_schema["type"], "object");
        assert_eq!(def.input_schema["properties"]["input"]["type"], "string");
    }
}

#[test]
fn default_registry_has_builtin_tools() {
    let dir = TempDir::new().unwrap();
    let reg = default_registry(&dir);
    assert_eq!(
        reg.list(),
        vec!["GetTime", "ListDir", "OpenWebURL", "ReadFile", "SummarizeFile", "SwitchMode", "WriteFile"]
    );
    let help = reg.help();
    assert!(help.starts_with("Available tools:"));
    assert!(help.contains("GetTime - Get the current date and time"));
}

// ===========================================================================
// Builtin tools
// ===========================================================================

#[test]
fn get_time_returns_timestamp() {
    let dir = TempDir::new().unwrap();
    let out = text(default_registry(&dir).dispatch("GetTime"));
    assert!(chrono::NaiveDateTime::parse_from_str(&out, "%Y-%m-%d %H:%M:%S").is_ok(), "got {}", out);
}

#[test]
fn write_then_read_file() {
    let dir = TempDir::new().unwrap();
    let reg = default_registry(&dir);

    let out = text(reg.dispatch("WriteFile notes/todo.txt ||| buy milk ||| and eggs"));
    assert_eq!(out, "Wrote 21 bytes to notes/todo.txt");
    assert_eq!(
        std::fs::read_to_string(dir.path().join("notes/todo.txt")).unwrap(),
        "buy milk ||| and eggs"
    );
    assert_eq!(text(reg.dispatch("ReadFile notes/todo.txt")), "buy milk ||| and eggs");
}

#[test]
fn write_file_without_delimiter_is_invalid_input() {
    let dir = TempDir::new().unwrap();
    match default_registry(&dir).dispatch("WriteFile just some text") {
        ToolResult::Failed { name, cause } => {
            assert_eq!(name, "WriteFile");
            assert!(cause.contains("filename.txt ||| content"));
        }
        other => panic!("expected Failed, got {:?}", other),
    }
}

#[test]
fn read_missing_file_reports_not_found() {
    let dir = TempDir::new().unwrap();
    let tool = ReadFileTool::new(dir.path());
    let err = tool.invoke("missing.txt").unwrap_err();
    assert_eq!(err.to_string(), "file not found: missing.txt");
    assert!(matches!(tool.invoke("   "), Err(ToolError::InvalidInput(_))));
}

#[test]
fn list_dir_sorts_and_marks_directories() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("b.txt"), "b").unwrap();
    std::fs::write(dir.path().join("a.txt"), "a").unwrap();
    std::fs::create_dir(dir.path().join("sub")).unwrap();
    let reg = default_registry(&dir);

    assert_eq!(text(reg.dispatch("ListDir")), "a.txt\nb.txt\nsub/");
    assert_eq!(text(reg.dispatch("ListDir sub")), "sub is empty");
    assert!(reg.dispatch("ListDir nope").is_error());
}

#[test]
fn summarize_truncates_long_files() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("long.txt"), "x".repeat(1500)).unwrap();
    std::fs::write(dir.path().join("short.txt"), "short").unwrap();
    let tool = SummarizeFileTool::new(dir.path());

    let summary = tool.invoke("long.txt").unwrap();
    assert_eq!(summary.len(), 1003);
    assert!(summary.ends_with("..."));
    assert_eq!(tool.invoke("short.txt").unwrap(), "short");
}

#[test]
fn url_validation() {
    assert_eq!(validate_url(" https://example.com/a ").unwrap(), "https://example.com/a");
    assert!(validate_url("http://localhost:8080").is_ok());
    assert!(validate_url("ftp://example.com").is_err());
    assert!(validate_url("example.com").is_err());
    assert!(validate_url("https://").is_err());
    assert!(validate_url("https://exa mple.com").is_err());
    assert!(validate_url("").is_err());
}

#[cfg(unix)]
#[test]
fn open_url_uses_configured_opener() {
    let tool = OpenUrlTool::with_opener(["true"]);
    assert_eq!(tool.invoke("https://example.com").unwrap(), "Opened https://example.com");

    let broken = OpenUrlTool::with_opener(["/nonexistent/opener"]);
    assert!(matches!(broken.invoke("https://example.com"), Err(ToolError::Failed(_))));
}

#[test]
fn switch_mode_describes_profile() {
    let tool = SwitchModeTool::new(ParleyConfig::default().modes);
    assert!(tool.description().contains("balanced"));

    let out = tool.invoke("Eco").unwrap();
    assert!(out.starts_with("Switched to eco mode."));
    assert!(out.contains("Features:"));
    assert_eq!(tool.current().as_deref(), Some("eco"));

    let err = tool.invoke("turbo").unwrap_err();
    assert!(err.to_string().contains("Choose from: balanced, eco, power"));
    assert_eq!(tool.current().as_deref(), Some("eco"));
}
