//! Text filters.

use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::error::{RegistrationError, RegistrationResult};

/// A type-erased predicate over a handler's derived text.
pub type PredicateFn = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Decides whether a handler accepts the text it derived from a message.
#[derive(Clone, Default)]
pub enum Filter {
    /// Always passes.
    #[default]
    Any,
    /// Passes when the pattern matches at the start of the text.
    Pattern(Regex),
    /// Passes when the predicate returns `true`.
    Predicate(PredicateFn),
}

impl Filter {
    /// Compiles a pattern filter.
    ///
    /// The pattern is anchored at the start of the text but not at the end,
    /// so `hi` matches `"hi there"` while `^hi$` does not.
    pub fn pattern(pattern: &str) -> RegistrationResult<Self> {
        Regex::new(&format!(r"\A(?:{pattern})"))
            .map(Self::Pattern)
            .map_err(|source| RegistrationError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })
    }

    /// Wraps a predicate.
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(f))
    }

    /// Evaluates the filter.
    pub fn check(&self, text: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Pattern(re) => re.is_match(text),
            Self::Predicate(f) => f(text),
        }
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("Any"),
            Self::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_is_anchored_at_start_only() {
        let filter = Filter::pattern("hi").unwrap();
        assert!(filter.check("hi there"));
        assert!(!filter.check("oh hi"));
    }

    #[test]
    fn test_end_keyword_pattern() {
        let filter = Filter::pattern("(?i)^(end|stop|cancel)$").unwrap();
        assert!(filter.check("STOP"));
        assert!(filter.check("cancel"));
        assert!(!filter.check("cancel please"));
        assert!(!filter.check("hello"));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(matches!(
            Filter::pattern("(unclosed"),
            Err(RegistrationError::InvalidPattern { pattern, .. }) if pattern == "(unclosed"
        ));
    }

    #[test]
    fn test_predicate_and_any() {
        assert!(Filter::Any.check(""));
        let long = Filter::predicate(|text| text.len() > 3);
        assert!(long.check("hello"));
        assert!(!long.check("hey"));
    }
}
