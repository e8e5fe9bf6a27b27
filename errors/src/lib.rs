//! # Configuration Binding Errors
//!
//! Shared diagnostic types for the configuration binding workspace.
//!
//! - `Message` is a single diagnostic with an optional provenance source
//! - `ConfigurationError` carries a whole batch of messages; builds fail
//!   at phase boundaries, never one message at a time
//! - `CoerceError` describes why a raw string could not be converted to a
//!   target value type

use thiserror::Error;

/// A single diagnostic message.
///
/// `source` is an opaque provenance marker (for example the binding source
/// recorded when a provider was registered) used to decorate the message.
/// `cause` carries the text of an underlying failure when one exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    source: Option<String>,
    text: String,
    cause: Option<String>
}

impl Message {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            source: None,
            text: text.into(),
            cause: None
        }
    }

    pub fn with_cause(text: impl Into<String>, cause: impl Into<String>) -> Self {
        Self {
            source: None,
            text: text.into(),
            cause: Some(cause.into())
        }
    }

    /// Returns a copy of this message annotated with a provenance source.
    #[must_use]
    pub fn annotated(&self, source: Option<String>) -> Self {
        Self {
            source,
            text: self.text.clone(),
            cause: self.cause.clone()
        }
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cause(&self) -> Option<&str> {
        self.cause.as_deref()
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)?;
        if let Some(source) = &self.source {
            write!(f, " (at {})", source)?;
        }
        Ok(())
    }
}

fn summarize(messages: &[Message]) -> String {
    let mut out = format!("{} configuration error(s):", messages.len());
    for (index, message) in messages.iter().enumerate() {
        out.push_str(&format!("\n{}) {}", index + 1, message));
    }
    out
}

/// A batch of configuration errors raised at a phase boundary.
///
/// Accumulated by the binding engine and thrown only after metadata
/// extraction, after attribute binding, and after constraint validation,
/// so one bad build reports everything wrong with it at once.
#[derive(Debug, Clone, Error)]
#[error("{}", summarize(.messages))]
pub struct ConfigurationError {
    messages: Vec<Message>
}

impl ConfigurationError {
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    pub fn from_message(text: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::new(text)]
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }
}

/// Why a raw property string could not be converted to its target type.
///
/// The reason text must never echo the raw value; the binding engine alone
/// decides how values appear in diagnostics (security-sensitive values are
/// redacted there).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoerceError {
    #[error("cannot represent value as {target}: {reason}")]
    Invalid { target: &'static str, reason: String },

    #[error("value matches more than one {target} variant")]
    Ambiguous { target: &'static str },

    #[error("value matches no {target} variant")]
    NoMatch { target: &'static str }
}
