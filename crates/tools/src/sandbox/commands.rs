//! Command Validation
//!
//! Shell commands are matched against a fixed blacklist before they reach a
//! shell. A second heuristic rejects commands with excessive `../` runs, which
//! the path confinement cannot see inside free-form command text.

use regex::Regex;
use std::sync::OnceLock;

use agent_runtime_core::{CoreError, CoreResult};

/// More `../` sequences than this in one command are rejected.
pub const MAX_PARENT_TRAVERSALS: usize = 2;

struct BlockedPattern {
    category: &'static str,
    regex: Regex,
}

/// (category, pattern)
const BLOCKED_COMMANDS: &[(&str, &str)] = &[
    // Recursive force delete, in any flag spelling
    ("recursive force delete", r"\brm\s+(-[a-zA-Z]+\s+)*(-[a-zA-Z]*[rR][a-zA-Z]*f|-[a-zA-Z]*f[a-zA-Z]*[rR])\b"),
    ("recursive force delete", r"\brm\s+(-[a-zA-Z]+\s+)*(-r|-R|--recursive)\s+(-[a-zA-Z]+\s+)*(-f|--force)\b"),
    ("recursive force delete", r"\brm\s+(-[a-zA-Z]+\s+)*(-f|--force)\s+(-[a-zA-Z]+\s+)*(-r|-R|--recursive)\b"),
    // Raw disk writes
    ("raw disk write", r"\bdd\b.*\bof=/dev/"),
    ("raw disk write", r">\s*/dev/(sd|hd|nvme|xvd|vd|disk|mmcblk)"),
    ("raw disk write", r"\bmkfs(\.[a-z0-9]+)?\b"),
    ("raw disk write", r"\b(fdisk|parted|wipefs)\b"),
    // Fork bombs
    ("fork bomb", r":\(\)\s*\{\s*:\s*\|\s*:\s*&\s*\}\s*;\s*:"),
    // Privilege and ownership escalation
    ("privilege escalation", r"(^|[;&|]\s*|\s)sudo\b"),
    ("privilege escalation", r"(^|[;&|]\s*)su(\s|$)"),
    ("privilege escalation", r"\bchmod\s+(-R\s+)?[0-7]?777\b"),
    ("privilege escalation", r"\bchmod\s+[ugoa]*\+s\b"),
    ("privilege escalation", r"\bchown\s+(-[a-zA-Z]*R|--recursive)\b"),
    // Reverse shells
    ("reverse shell", r"/dev/(tcp|udp)/"),
    ("reverse shell", r"\b(nc|ncat|netcat)\b.*\s-[a-zA-Z]*[ec]\b"),
    ("reverse shell", r"\bsocat\b.*\bexec:"),
    ("reverse shell", r"\b(ba|z)?sh\s+-i\s*[<>]&"),
    // Download and execute
    ("download and execute", r"\b(curl|wget)\b[^|;&]*\|\s*(sudo\s+)?(ba|z|da|k)?sh\b"),
    ("download and execute", r"\b(curl|wget)\b[^|;&]*\|\s*(sudo\s+)?(python[0-9.]*|perl|ruby|node)\b"),
    ("download and execute", r"\b(ba|z)?sh\s+<\(\s*(curl|wget)\b"),
    // Direct system-credential access
    ("credential access", r"/etc/(shadow|gshadow|sudoers|master\.passwd)\b"),
    ("credential access", r"~/\.ssh/|\$HOME/\.ssh/"),
    ("credential access", r"~/\.aws/|\$HOME/\.aws/"),
    // Destructive command chaining
    ("destructive chaining", r"(;|&&|\|\|)\s*(rm\s+-[a-zA-Z]*[rRf]|mkfs|dd\s+if=)"),
    ("destructive chaining", r"\b(shutdown|reboot|halt|poweroff)\b"),
    ("destructive chaining", r">\s*/(etc|bin|sbin|usr|boot)/"),
];

fn blocked_patterns() -> &'static Vec<BlockedPattern> {
    static PATTERNS: OnceLock<Vec<BlockedPattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        BLOCKED_COMMANDS
            .iter()
            .filter_map(|&(category, pattern)| {
                Regex::new(pattern)
                    .ok()
                    .map(|regex| BlockedPattern { category, regex })
            })
            .collect()
    })
}

fn count_parent_traversals(command: &str) -> usize {
    command.matches("../").count() + command.matches("..\\").count()
}

/// Validate a shell command before it reaches a shell.
pub fn validate_command(command: &str) -> CoreResult<()> {
    let trimmed = command.trim();
    if trimmed.is_empty() {
        return Err(CoreError::validation("Command must not be empty"));
    }

    if let Some(blocked) = blocked_patterns()
        .iter()
        .find(|p| p.regex.is_match(trimmed))
    {
        return Err(CoreError::denied(format!(
            "Command blocked for safety: matches {} rule",
            blocked.category
        )));
    }

    let traversals = count_parent_traversals(trimmed);
    if traversals > MAX_PARENT_TRAVERSALS {
        return Err(CoreError::denied(format!(
            "Command blocked for safety: {} parent-directory traversals",
            traversals
        )));
    }

    Ok(())
}
