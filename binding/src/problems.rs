//! Diagnostic accumulator.
//!
//! Binding never fails fast: errors pile up in a `Problems` record and are
//! raised together at phase boundaries, while warnings ride along and are
//! delivered to a monitor only when the build succeeds.

use errors::{ConfigurationError, Message};

/// Append-only bag of errors and warnings for one build (or one metadata
/// extraction).
#[derive(Debug, Clone, Default)]
pub struct Problems {
    errors: Vec<Message>,
    warnings: Vec<Message>
}

impl Problems {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges another record into this one, keeping insertion order.
    pub fn record(&mut self, other: Problems) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    pub fn add_error(&mut self, text: impl Into<String>) {
        self.errors.push(Message::new(text));
    }

    pub fn add_error_with_cause(&mut self, text: impl Into<String>, cause: impl Into<String>) {
        self.errors.push(Message::with_cause(text, cause));
    }

    pub fn add_warning(&mut self, text: impl Into<String>) {
        self.warnings.push(Message::new(text));
    }

    pub fn errors(&self) -> &[Message] {
        &self.errors
    }

    pub fn warnings(&self) -> &[Message] {
        &self.warnings
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Fails with every accumulated error if there are any.
    pub fn throw_if_has_errors(&self) -> Result<(), ConfigurationError> {
        if self.errors.is_empty() {
            return Ok(());
        }
        Err(ConfigurationError::new(self.errors.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_problems_do_not_throw() {
        let problems = Problems::new();
        assert!(problems.throw_if_has_errors().is_ok());
        assert!(!problems.has_errors());
    }

    #[test]
    fn test_warnings_never_throw() {
        let mut problems = Problems::new();
        problems.add_warning("watch out");
        assert!(problems.throw_if_has_errors().is_ok());
        assert_eq!(problems.warnings().len(), 1);
    }

    #[test]
    fn test_throw_carries_all_errors() {
        let mut problems = Problems::new();
        problems.add_error("first");
        problems.add_error("second");
        let error = problems.throw_if_has_errors().unwrap_err();
        assert_eq!(error.messages().len(), 2);
        assert_eq!(error.messages()[0].text(), "first");
        assert_eq!(error.messages()[1].text(), "second");
    }

    #[test]
    fn test_record_merges_in_order() {
        let mut first = Problems::new();
        first.add_error("a");
        first.add_warning("w1");

        let mut second = Problems::new();
        second.add_error("b");
        second.add_warning("w2");

        first.record(second);
        assert_eq!(first.errors().len(), 2);
        assert_eq!(first.errors()[1].text(), "b");
        assert_eq!(first.warnings()[1].text(), "w2");
    }
}
