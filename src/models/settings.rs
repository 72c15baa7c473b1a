//! Settings Models
//!
//! Runtime configuration stored in config.json.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

use crate::models::mcp::McpServerConfig;
use crate::services::orchestrator::permissions::PermissionLevel;

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RuntimeConfig {
    /// Root every filesystem/shell capability is confined to. Unset means
    /// those capabilities refuse to run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_root: Option<PathBuf>,
    /// Upper bound on generate/execute cycles per turn
    pub max_iterations: u32,
    /// Deadline for one provider request
    pub request_timeout_secs: u64,
    /// Deadline for one shell command
    pub command_timeout_secs: u64,
    /// Which risks require approval
    pub permission_level: PermissionLevel,
    /// Seconds to wait for an approval decision before refusing
    pub approval_timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Capability providers connected at startup
    pub providers: Vec<McpServerConfig>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            working_root: None,
            max_iterations: 25,
            request_timeout_secs: 30,
            command_timeout_secs: 120,
            permission_level: PermissionLevel::default(),
            approval_timeout_secs: 300,
            system_prompt: None,
            providers: Vec::new(),
        }
    }
}

/// Partial update applied by `ConfigService::update_config`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeConfigUpdate {
    pub working_root: Option<PathBuf>,
    pub max_iterations: Option<u32>,
    pub request_timeout_secs: Option<u64>,
    pub command_timeout_secs: Option<u64>,
    pub permission_level: Option<PermissionLevel>,
    pub approval_timeout_secs: Option<u64>,
    pub system_prompt: Option<String>,
    pub providers: Option<Vec<McpServerConfig>>,
}

impl RuntimeConfig {
    /// Apply a partial update
    pub fn apply_update(&mut self, update: RuntimeConfigUpdate) {
        if let Some(root) = update.working_root {
            self.working_root = Some(root);
        }
        if let Some(v) = update.max_iterations {
            self.max_iterations = v;
        }
        if let Some(v) = update.request_timeout_secs {
            self.request_timeout_secs = v;
        }
        if let Some(v) = update.command_timeout_secs {
            self.command_timeout_secs = v;
        }
        if let Some(v) = update.permission_level {
            self.permission_level = v;
        }
        if let Some(v) = update.approval_timeout_secs {
            self.approval_timeout_secs = v;
        }
        if let Some(v) = update.system_prompt {
            self.system_prompt = Some(v);
        }
        if let Some(v) = update.providers {
            self.providers = v;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_iterations == 0 {
            return Err("maxIterations must be at least 1".to_string());
        }
        if self.request_timeout_secs == 0 {
            return Err("requestTimeoutSecs must be at least 1".to_string());
        }
        if self.command_timeout_secs == 0 {
            return Err("commandTimeoutSecs must be at least 1".to_string());
        }
        if self.approval_timeout_secs == 0 {
            return Err("approvalTimeoutSecs must be at least 1".to_string());
        }
        if let Some(root) = &self.working_root {
            if !root.is_absolute() {
                return Err(format!("workingRoot must be absolute: {}", root.display()));
            }
        }

        let mut seen = HashSet::new();
        for provider in &self.providers {
            if provider.name.trim().is_empty() {
                return Err("Provider names must not be empty".to_string());
            }
            if provider.name.contains(':') {
                return Err(format!("Provider name '{}' must not contain ':'", provider.name));
            }
            if !seen.insert(provider.name.as_str()) {
                return Err(format!("Duplicate provider name: {}", provider.name));
            }
        }

        Ok(())
    }
}
