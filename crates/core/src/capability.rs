//! Capability Shapes
//!
//! Pure data shared by local and remote capabilities: the descriptor the
//! registry stores and the result every invocation produces, whatever its
//! origin.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where a capability is implemented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "provider", rename_all = "snake_case")]
pub enum CapabilityOrigin {
    Local,
    /// Served by the named provider connection
    Provider(String),
}

impl CapabilityOrigin {
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local)
    }

    pub fn provider(&self) -> Option<&str> {
        match self {
            Self::Local => None,
            Self::Provider(name) => Some(name),
        }
    }
}

/// Registry-wide description of one capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityDescriptor {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object
    pub parameters: Value,
    pub origin: CapabilityOrigin,
    /// Risky capabilities go through the approval gate
    pub risky: bool,
}

/// One piece of invocation output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ContentPart {
    Text {
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    Image {
        data: String,
        mime_type: String,
    },
    Resource {
        resource: Value,
    },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Parse a provider content item, keeping unknown shapes as raw JSON text.
    pub fn from_value(value: &Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_else(|_| Self::text(value.to_string()))
    }

    fn render(&self) -> String {
        match self {
            Self::Text { text } => text.clone(),
            Self::Image { mime_type, .. } => format!("[image: {}]", mime_type),
            Self::Resource { resource } => resource
                .get("text")
                .and_then(|t| t.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| resource.to_string()),
        }
    }
}

/// Uniform outcome of invoking any capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResult {
    pub content: Vec<ContentPart>,
    #[serde(default)]
    pub is_error: bool,
}

impl InvocationResult {
    /// A successful single-text result
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentPart::text(text)],
            is_error: false,
        }
    }

    /// An error-flagged single-text result
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ContentPart::text(message)],
            is_error: true,
        }
    }

    pub fn from_parts(content: Vec<ContentPart>, is_error: bool) -> Self {
        Self { content, is_error }
    }

    /// Flatten content into the text appended to the transcript.
    pub fn to_text(&self) -> String {
        self.content
            .iter()
            .map(ContentPart::render)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
