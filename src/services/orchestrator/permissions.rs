//! Permission Types and Risk Classification
//!
//! Decides which requested actions count as risky for a given permission
//! level. Risky actions are batched and sent to the approval gate.

use serde::{Deserialize, Serialize};

use crate::services::tools::mcp_adapter::McpToolAdapter;

/// Which risk categories require approval.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionLevel {
    /// Write and dangerous actions require approval
    Strict,
    /// Only dangerous actions require approval
    #[default]
    Standard,
    /// Nothing requires approval
    Permissive,
}

/// Risk classification of one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolRisk {
    /// Never requires approval
    ReadOnly,
    /// File create/edit
    SafeWrite,
    /// Shell, remote capabilities and anything unrecognized
    Dangerous,
}

impl ToolRisk {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolRisk::ReadOnly => "ReadOnly",
            ToolRisk::SafeWrite => "SafeWrite",
            ToolRisk::Dangerous => "Dangerous",
        }
    }
}

/// Actions that are always auto-approved and never shown to the gate.
pub const READ_ONLY_ALLOW_LIST: &[&str] = &["Read", "LS", "Grep", "Glob", "Cwd"];

/// Classify an action by name.
///
/// | Action                      | Risk      |
/// |-----------------------------|-----------|
/// | Read, LS, Grep, Glob, Cwd   | ReadOnly  |
/// | Write, Edit                 | SafeWrite |
/// | Bash, `mcp:*`, unknown      | Dangerous |
pub fn classify_tool_risk(tool_name: &str) -> ToolRisk {
    if READ_ONLY_ALLOW_LIST.contains(&tool_name) {
        return ToolRisk::ReadOnly;
    }
    if McpToolAdapter::parse_qualified_name(tool_name).is_some() {
        return ToolRisk::Dangerous;
    }
    match tool_name {
        "Write" | "Edit" => ToolRisk::SafeWrite,
        _ => ToolRisk::Dangerous,
    }
}

/// Classify a registered action. A registration that declares itself
/// read-only is never risky, whatever its name.
pub fn classify_registered_risk(tool_name: &str, declared_read_only: bool) -> ToolRisk {
    if declared_read_only {
        ToolRisk::ReadOnly
    } else {
        classify_tool_risk(tool_name)
    }
}

/// Whether an action needs approval at the given level.
pub fn needs_approval(tool_name: &str, level: PermissionLevel) -> bool {
    risk_needs_approval(classify_tool_risk(tool_name), level)
}

pub fn risk_needs_approval(risk: ToolRisk, level: PermissionLevel) -> bool {
    match level {
        PermissionLevel::Strict => matches!(risk, ToolRisk::SafeWrite | ToolRisk::Dangerous),
        PermissionLevel::Standard => matches!(risk, ToolRisk::Dangerous),
        PermissionLevel::Permissive => false,
    }
}
