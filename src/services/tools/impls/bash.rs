//! Bash Tool Implementation
//!
//! Executes shell commands inside the working root, after the command
//! blacklist and traversal check, with a deadline.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use agent_runtime_core::{CoreError, CoreResult, InvocationResult, ToolContext};
use agent_runtime_llm::ParameterSchema;
use agent_runtime_tools::{validate_command, Tool};

use super::common::{limit_output, optional_str, required_str, sandboxed, working_root};

/// Maximum per-call timeout in milliseconds (10 minutes)
const MAX_TIMEOUT_MS: u64 = 600_000;

/// Shell command tool
pub struct BashTool {
    default_timeout: Duration,
}

impl BashTool {
    pub fn new(default_timeout: Duration) -> Self {
        Self { default_timeout }
    }
}

impl Default for BashTool {
    fn default() -> Self {
        Self::new(Duration::from_secs(120))
    }
}

#[async_trait]
impl Tool for BashTool {
    fn name(&self) -> &str {
        "Bash"
    }

    fn description(&self) -> &str {
        "Execute a shell command in the working root. Returns stdout and stderr. Has a configurable timeout. Destructive, privilege-escalating and network-piping commands are blocked."
    }

    fn parameters_schema(&self) -> ParameterSchema {
        let mut properties = HashMap::new();
        properties.insert(
            "command".to_string(),
            ParameterSchema::string(Some("The command to execute")),
        );
        properties.insert(
            "timeout".to_string(),
            ParameterSchema::integer(Some("Timeout in milliseconds (max: 600000)")),
        );
        properties.insert(
            "working_dir".to_string(),
            ParameterSchema::string(Some("Directory inside the working root to run in")),
        );
        ParameterSchema::object(
            Some("Bash command parameters"),
            properties,
            vec!["command".to_string()],
        )
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> CoreResult<InvocationResult> {
        let command = required_str(&args, "command")?;
        validate_command(command)?;

        let working_dir = match optional_str(&args, "working_dir") {
            Some(dir) => sandboxed(ctx, dir)?,
            None => working_root(ctx)?,
        };
        if !working_dir.is_dir() {
            return Err(CoreError::not_found(format!(
                "Working directory not found: {}",
                working_dir.display()
            )));
        }

        let timeout = args
            .get("timeout")
            .and_then(|v| v.as_u64())
            .map(|ms| Duration::from_millis(ms.min(MAX_TIMEOUT_MS)))
            .unwrap_or(self.default_timeout);

        #[cfg(windows)]
        let (shell, shell_arg) = ("cmd", "/C");
        #[cfg(not(windows))]
        let (shell, shell_arg) = ("sh", "-c");

        let mut cmd = Command::new(shell);
        cmd.arg(shell_arg)
            .arg(command)
            .current_dir(&working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(command = %command, cwd = %working_dir.display(), "Running shell command");

        let output = match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(CoreError::invocation(format!("Failed to execute command: {}", e)))
            }
            Err(_) => {
                return Err(CoreError::timeout(format!(
                    "Command timed out after {} ms",
                    timeout.as_millis()
                )))
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let mut text = stdout.to_string();
        if !stderr.is_empty() {
            if !text.is_empty() {
                text.push_str("\n\n--- stderr ---\n");
            }
            text.push_str(&stderr);
        }
        let text = limit_output(text);

        if output.status.success() {
            Ok(InvocationResult::text(if text.is_empty() {
                "Command completed successfully with no output".to_string()
            } else {
                text
            }))
        } else {
            Ok(InvocationResult::error(format!(
                "Command failed with exit code {}\n{}",
                output.status.code().unwrap_or(-1),
                text
            )))
        }
    }
}
