//! Runs ffmpeg/ffprobe as bounded child processes

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Default limit for a single tool run: 5 minutes
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Captured output of a successful run
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub stdout: String,
}

/// Builder for one external tool invocation
///
/// The child is killed when the returned future is dropped, so an aborted
/// request never leaves an encoder running.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn tool_name(&self) -> String {
        self.program
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    /// Run to completion, failing on spawn error, non-zero exit or timeout
    pub async fn execute(&self) -> MediaResult<ToolOutput> {
        let tool = self.tool_name();
        debug!("Running {} {}", tool, self.args.join(" "));

        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => MediaError::ToolUnavailable(tool.clone()),
                _ => MediaError::Tool {
                    tool: tool.clone(),
                    message: format!("failed to spawn: {}", e),
                },
            })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(MediaError::Tool {
                    tool,
                    message: format!("I/O error waiting for process: {}", e),
                });
            }
            Err(_) => {
                return Err(MediaError::Timeout {
                    tool,
                    after: self.timeout,
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MediaError::Tool {
                tool,
                message: format!("exited with {}: {}", output.status, last_lines(&stderr, 5)),
            });
        }

        Ok(ToolOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        })
    }
}

/// ffmpeg prints its banner first; the useful part of a failure is at the end.
fn last_lines(text: &str, count: usize) -> String {
    let lines: Vec<&str> = text.trim().lines().collect();
    lines[lines.len().saturating_sub(count)..].join("\n")
}
