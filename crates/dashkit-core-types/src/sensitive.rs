//! Sensitive data marker for automatic redaction
//!
//! Backend API tokens travel inside the dashboard context, which is logged
//! at debug level. `Sensitive<T>` keeps them out of every log line.

use std::fmt;

/// Wrapper for sensitive data that redacts itself in Debug and Display
///
/// # Example
///
/// ```
/// use dashkit_core_types::Sensitive;
///
/// let token = Sensitive::new("bearer-abc");
/// assert_eq!(format!("{:?}", token), "***REDACTED***");
/// assert_eq!(token.expose(), &"bearer-abc");
/// ```
pub struct Sensitive<T>(T);

impl<T> Sensitive<T> {
    /// Wrap a sensitive value
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Expose the underlying value; only backend adapters should need this
    pub fn expose(&self) -> &T {
        &self.0
    }

    /// Consume the wrapper and return the inner value
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for Sensitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***REDACTED***")
    }
}

impl<T> fmt::Display for Sensitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***REDACTED***")
    }
}

impl<T: Clone> Clone for Sensitive<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_redacted_in_debug_and_display() {
        let token = Sensitive::new("tiger-api-token".to_string());
        assert_eq!(format!("{:?}", token), "***REDACTED***");
        assert_eq!(format!("{}", token), "***REDACTED***");
    }

    #[test]
    fn test_expose_and_into_inner() {
        let token = Sensitive::new(String::from("t0k3n"));
        assert_eq!(token.expose(), "t0k3n");
        assert_eq!(token.clone().into_inner(), "t0k3n");
    }

    #[test]
    fn test_redaction_inside_context_struct() {
        #[derive(Debug)]
        #[allow(dead_code)]
        struct BackendSettings {
            workspace: String,
            token: Option<Sensitive<String>>,
        }

        let settings = BackendSettings {
            workspace: "demo".to_string(),
            token: Some(Sensitive::new("secret123".to_string())),
        };

        let debug_str = format!("{:?}", settings);
        assert!(debug_str.contains("demo"));
        assert!(debug_str.contains("***REDACTED***"));
        assert!(!debug_str.contains("secret123"));
    }
}
