//! OpenWebURL: hand an http(s) URL to the platform opener

use crate::registry::{Tool, ToolError};
use std::io;
use std::process::{Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use tracing::{debug, info};

pub struct OpenUrlTool {
    /// Program followed by leading arguments; the URL is appended.
    opener: Vec<String>,
}

impl Default for OpenUrlTool {
    fn default() -> Self { Self::new() }
}

impl OpenUrlTool {
    pub fn new() -> Self {
        let opener: &[&str] = if cfg!(target_os = "macos") {
            &["open"]
        } else if cfg!(windows) {
            &["cmd", "/C", "start", ""]
        } else {
            &["xdg-open"]
        };
        Self::with_opener(opener.iter().copied())
    }

    pub fn with_opener<I, S>(opener: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { opener: opener.into_iter().map(Into::into).collect() }
    }
}

/// Accept only absolute http/https URLs with a host and no whitespace.
pub fn validate_url(input: &str) -> Result<&str, ToolError> {
    let url = input.trim();
    if url.is_empty() {
        return Err(ToolError::invalid("expected a URL"));
    }
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .ok_or_else(|| ToolError::invalid(format!("not an http(s) URL: {}", url)))?;
    if rest.is_empty() || rest.starts_with('/') || url.chars().any(char::is_whitespace) {
        return Err(ToolError::invalid(format!("malformed URL: {}", url)));
    }
    Ok(url)
}

/// Start `command` detached from our stdio and reap it on a background
/// thread, so the opener never lingers as a zombie.
pub(crate) fn launch(mut command: Command) -> io::Result<JoinHandle<io::Result<ExitStatus>>> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    thread::Builder::new().name("parley-opener".into()).spawn(move || {
        let status = child.wait();
        debug!("URL opener exited: {:?}", status);
        status
    })
}

impl Tool for OpenUrlTool {
    fn name(&self) -> &str { "OpenWebURL" }

    fn description(&self) -> &str {
        "Open a website URL in the default browser. Input: a valid http or https URL."
    }

    fn invoke(&self, args: &str) -> Result<String, ToolError> {
        let url = validate_url(args)?;
        let (program, leading) = self
            .opener
            .split_first()
            .ok_or_else(|| ToolError::failed("no URL opener configured"))?;

        let mut command = Command::new(program);
        command.args(leading).arg(url);
        launch(command).map_err(|e| ToolError::failed(format!("could not launch {}: {}", program, e)))?;

        info!("Opened {}", url);
        Ok(format!("Opened {}", url))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn launched_opener_is_reaped() {
        let reaper = launch(Command::new("true")).unwrap();
        let status = reaper.join().unwrap().unwrap();
        assert!(status.success());

        let mut failing = Command::new("sh");
        failing.args(["-c", "exit 3"]);
        let status = launch(failing).unwrap().join().unwrap().unwrap();
        assert_eq!(status.code(), Some(3));
    }
}
