//! Package resolution error types.

use std::fmt;

/// Package resolution error codes.
pub mod codes {
    pub const PKG_SPEC_INVALID: &str = "PKG_SPEC_INVALID";
    pub const PKG_NOT_FOUND: &str = "PKG_NOT_FOUND";
    pub const PKG_UNPUBLISHED: &str = "PKG_UNPUBLISHED";
    pub const PKG_VERSION_NOT_FOUND: &str = "PKG_VERSION_NOT_FOUND";
    pub const PKG_REGISTRY_ERROR: &str = "PKG_REGISTRY_ERROR";
    pub const PKG_MANIFEST_INVALID: &str = "PKG_MANIFEST_INVALID";
}

/// Error raised while turning a package reference into a manifest.
///
/// Cloneable so that a single failed registry request can be handed to every
/// caller that was waiting on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkgError {
    code: &'static str,
    message: String,
}

impl PkgError {
    /// Create a new error with the given code and message.
    #[must_use]
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Get the error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// Get the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn spec_invalid(msg: impl Into<String>) -> Self {
        Self::new(codes::PKG_SPEC_INVALID, msg)
    }

    /// The registry has never heard of this package.
    #[must_use]
    pub fn not_found(name: &str) -> Self {
        Self::new(codes::PKG_NOT_FOUND, format!("Couldn't get package \"{name}\""))
    }

    /// The package existed but every version was unpublished.
    #[must_use]
    pub fn unpublished(name: &str) -> Self {
        Self::new(
            codes::PKG_UNPUBLISHED,
            format!("Package \"{name}\" was unpublished"),
        )
    }

    /// No published version satisfies the requested range or tag.
    #[must_use]
    pub fn version_not_found(name: &str, range: &str) -> Self {
        Self::new(
            codes::PKG_VERSION_NOT_FOUND,
            format!("Couldn't resolve version {range} for \"{name}\""),
        )
    }

    pub fn registry(msg: impl Into<String>) -> Self {
        Self::new(codes::PKG_REGISTRY_ERROR, msg)
    }

    pub fn manifest_invalid(msg: impl Into<String>) -> Self {
        Self::new(codes::PKG_MANIFEST_INVALID, msg)
    }

    /// Whether this error means the package itself is unknown.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.code == codes::PKG_NOT_FOUND
    }

    #[must_use]
    pub fn is_unpublished(&self) -> bool {
        self.code == codes::PKG_UNPUBLISHED
    }

    #[must_use]
    pub fn is_version_not_found(&self) -> bool {
        self.code == codes::PKG_VERSION_NOT_FOUND
    }
}

impl fmt::Display for PkgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PkgError {}

impl From<reqwest::Error> for PkgError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::registry(format!("Request timed out: {e}"))
        } else if e.is_connect() {
            Self::registry(format!("Connection failed: {e}"))
        } else {
            Self::registry(e.to_string())
        }
    }
}

impl From<serde_json::Error> for PkgError {
    fn from(e: serde_json::Error) -> Self {
        Self::registry(format!("Invalid JSON: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_format() {
        let err = PkgError::unpublished("left-pad");
        assert_eq!(err.code(), codes::PKG_UNPUBLISHED);
        assert!(err.to_string().starts_with("PKG_UNPUBLISHED: "));
        assert!(err.message().contains("left-pad"));
    }

    #[test]
    fn test_kinds_are_distinct() {
        let not_found = PkgError::not_found("a");
        let unpublished = PkgError::unpublished("a");
        let no_match = PkgError::version_not_found("a", "^9.0.0");

        assert!(not_found.is_not_found() && !not_found.is_unpublished());
        assert!(unpublished.is_unpublished() && !unpublished.is_version_not_found());
        assert!(no_match.is_version_not_found() && !no_match.is_not_found());
    }

    #[test]
    fn test_error_codes_uppercase() {
        let all_codes = [
            codes::PKG_SPEC_INVALID,
            codes::PKG_NOT_FOUND,
            codes::PKG_UNPUBLISHED,
            codes::PKG_VERSION_NOT_FOUND,
            codes::PKG_REGISTRY_ERROR,
            codes::PKG_MANIFEST_INVALID,
        ];

        for code in all_codes {
            assert!(
                code.chars().all(|c| c.is_uppercase() || c == '_'),
                "Error code '{code}' should be SCREAMING_SNAKE_CASE"
            );
        }
    }
}
