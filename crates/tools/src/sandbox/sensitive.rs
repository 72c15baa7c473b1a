//! Sensitive Path Table
//!
//! Paths matching one of these patterns are denied even when they resolve
//! inside the working root. Patterns run against the normalized path with
//! forward slashes.

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// Which table entry matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensitiveMatch {
    pub category: &'static str,
    pub description: &'static str,
}

struct CompiledPattern {
    category: &'static str,
    description: &'static str,
    regex: Regex,
}

/// (category, description, pattern)
const SENSITIVE_PATTERNS: &[(&str, &str, &str)] = &[
    // Credential files
    ("credentials", "dotenv file", r"(^|/)\.env(\.[^/]+)?$"),
    ("credentials", "netrc", r"(^|/)_?\.?netrc$"),
    ("credentials", "PostgreSQL password file", r"(^|/)\.pgpass$"),
    ("credentials", "credentials file", r"(^|/)credentials(\.json|\.toml|\.ya?ml)?$"),
    ("credentials", "secrets file", r"(^|/)secrets?\.(json|ya?ml|toml)$"),
    ("credentials", "system credential store", r"^/etc/(shadow|gshadow|sudoers)(/|$)"),
    // Private keys
    ("private-key", "SSH directory", r"(^|/)\.ssh(/|$)"),
    ("private-key", "SSH private key", r"(^|/)id_(rsa|dsa|ecdsa|ed25519)$"),
    ("private-key", "key or certificate bundle", r"\.(pem|key|p12|pfx|jks|keystore)$"),
    ("private-key", "GnuPG home", r"(^|/)\.gnupg(/|$)"),
    // Cloud provider credentials
    ("cloud", "AWS credentials", r"(^|/)\.aws(/|$)"),
    ("cloud", "Google Cloud credentials", r"(^|/)\.config/gcloud(/|$)"),
    ("cloud", "Azure credentials", r"(^|/)\.azure(/|$)"),
    ("cloud", "Kubernetes config", r"(^|/)\.kube/config$"),
    ("cloud", "Docker registry auth", r"(^|/)\.docker/config\.json$"),
    // Package manager configuration
    ("package-manager", "npm config", r"(^|/)\.npmrc$"),
    ("package-manager", "yarn config", r"(^|/)\.yarnrc(\.yml)?$"),
    ("package-manager", "PyPI config", r"(^|/)\.pypirc$"),
    ("package-manager", "pip config", r"(^|/)pip\.conf$"),
    ("package-manager", "Cargo credentials", r"(^|/)\.cargo/credentials(\.toml)?$"),
    ("package-manager", "RubyGems credentials", r"(^|/)\.gem/credentials$"),
    // VCS credentials
    ("vcs", "git credential store", r"(^|/)\.git-credentials$"),
    ("vcs", "GitHub CLI hosts", r"(^|/)\.config/gh/hosts\.yml$"),
    // Embedded databases
    ("database", "SQLite database", r"\.(db|sqlite|sqlite3)$"),
    ("database", "database journal", r"\.(db|sqlite|sqlite3)-(wal|shm|journal)$"),
];

fn compiled_patterns() -> &'static Vec<CompiledPattern> {
    static PATTERNS: OnceLock<Vec<CompiledPattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        SENSITIVE_PATTERNS
            .iter()
            .filter_map(|&(category, description, pattern)| {
                Regex::new(&format!("(?i){}", pattern))
                    .ok()
                    .map(|regex| CompiledPattern {
                        category,
                        description,
                        regex,
                    })
            })
            .collect()
    })
}

/// Match a normalized path against the sensitive-path table.
pub fn match_sensitive_path(path: &Path) -> Option<SensitiveMatch> {
    let normalized = path.to_string_lossy().replace('\\', "/");
    compiled_patterns()
        .iter()
        .find(|p| p.regex.is_match(&normalized))
        .map(|p| SensitiveMatch {
            category: p.category,
            description: p.description,
        })
}
