use super::traits::Tool;
use super::types::{ParamKind, ToolArgs, ToolParameter, ToolResult};
use crate::security::RiskLevel;
use regex::Regex;
use serde_json::Value;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::LazyLock;
use std::time::Duration;

/// Combined stdout/stderr beyond this many characters is truncated.
const MAX_OUTPUT_CHARS: usize = 10_000;
/// Environment variables safe to pass to shell commands.
/// Only functional variables are included -- never API keys or secrets.
const SAFE_ENV_VARS: &[&str] = &[
    "PATH", "HOME", "TERM", "LANG", "LC_ALL", "LC_CTYPE", "USER", "SHELL",
];

/// Commands the tool refuses on its own, before policy ever sees them.
static DANGEROUS_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"rm\s+(-rf|-fr)",
        r"mkfs",
        r"dd\s+if=",
        r">\s*/dev/",
        r"chmod\s+777",
        r"curl.*\|\s*(bash|sh)",
        r"wget.*\|\s*(bash|sh)",
        r"eval\s",
        r"(?i)fork\s*bomb",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

/// Shell command execution inside the workspace.
pub struct ShellTool {
    workspace_dir: PathBuf,
    timeout: Duration,
}

impl ShellTool {
    pub fn new(workspace_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            workspace_dir: workspace_dir.into(),
            timeout,
        }
    }
}

fn blocked_pattern(command: &str) -> Option<&'static Regex> {
    DANGEROUS_PATTERNS.iter().find(|re| re.is_match(command))
}

impl Tool for ShellTool {
    fn name(&self) -> &str {
        "shell"
    }

    fn description(&self) -> &str {
        "Execute a shell command in the workspace directory. Dangerous commands are blocked."
    }

    fn parameters(&self) -> Vec<ToolParameter> {
        vec![ToolParameter::required(
            "command",
            ParamKind::String,
            "The shell command to execute",
        )]
    }

    fn risk_level(&self) -> RiskLevel {
        RiskLevel::Medium
    }

    fn execute<'a>(
        &'a self,
        args: &'a ToolArgs,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ToolResult>> + Send + 'a>> {
        Box::pin(async move {
            let command = args
                .get("command")
                .and_then(Value::as_str)
                .ok_or_else(|| anyhow::anyhow!("Missing 'command' parameter"))?;

            if let Some(pattern) = blocked_pattern(command) {
                return Ok(ToolResult::failed(format!(
                    "Command blocked by safety filter: matches pattern {}",
                    pattern.as_str()
                )));
            }

            // Clear the environment so API keys never reach child processes,
            // then re-add only functional variables.
            let mut cmd = tokio::process::Command::new("sh");
            cmd.arg("-c")
                .arg(command)
                .current_dir(&self.workspace_dir)
                .env_clear()
                .kill_on_drop(true);
            for var in SAFE_ENV_VARS {
                if let Ok(val) = std::env::var(var) {
                    cmd.env(var, val);
                }
            }
            cmd.env("TERM", "dumb");

            match tokio::time::timeout(self.timeout, cmd.output()).await {
                Ok(Ok(output)) => {
                    let stdout = String::from_utf8_lossy(&output.stdout);
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    let combined = if stderr.is_empty() {
                        stdout.into_owned()
                    } else {
                        format!("{stdout}\nSTDERR: {stderr}")
                    };
                    let result = if output.status.success() {
                        ToolResult::ok(combined)
                    } else {
                        ToolResult {
                            output: combined,
                            ..ToolResult::failed(format!("Command exited with {}", output.status))
                        }
                    };
                    Ok(result.truncate_output(MAX_OUTPUT_CHARS))
                }
                Ok(Err(e)) => Ok(ToolResult::failed(format!(
                    "Failed to execute command: {e}"
                ))),
                Err(_) => Ok(ToolResult::failed(format!(
                    "Command timed out after {}s and was killed",
                    self.timeout.as_secs()
                ))),
            }
        })
    }
}
