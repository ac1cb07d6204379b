//! Root package reference parsing.
//!
//! Accepts references like:
//! - `react`
//! - `react@18.2.0`
//! - `react@^18.0.0`
//! - `@types/node`
//! - `@types/node@^20`

use super::error::PkgError;
use std::fmt;

/// A package name plus an optional version, range or dist-tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRef {
    /// Full package name, including a leading `@` when scoped.
    pub name: String,
    /// Requested version (None means the `latest` dist-tag).
    pub range: Option<String>,
}

impl PackageRef {
    #[must_use]
    pub fn new(name: impl Into<String>, range: Option<String>) -> Self {
        Self {
            name: name.into(),
            range,
        }
    }

    /// Parse a `name[@version]` reference.
    ///
    /// A leading `@` belongs to the name. The rest is split on `@` and may
    /// yield at most a name and a version; an explicit but blank version is
    /// rejected.
    ///
    /// # Errors
    /// Returns `PKG_SPEC_INVALID` when the reference cannot be split cleanly.
    pub fn parse(input: &str) -> Result<Self, PkgError> {
        let (scoped, rest) = match input.strip_prefix('@') {
            Some(rest) => (true, rest),
            None => (false, input),
        };

        let mut parts = rest.split('@');
        let name = parts.next().unwrap_or_default();
        let version = parts.next();

        if parts.next().is_some() {
            return Err(PkgError::spec_invalid(format!(
                "Too many split tokens in \"{input}\""
            )));
        }

        if name.is_empty() {
            return Err(PkgError::spec_invalid(format!(
                "Couldn't parse package name from \"{input}\""
            )));
        }

        if version.is_some_and(|v| v.trim().is_empty()) {
            return Err(PkgError::spec_invalid(format!(
                "Unable to determine version from \"{input}\""
            )));
        }

        let name = if scoped {
            format!("@{name}")
        } else {
            name.to_string()
        };

        Ok(Self {
            name,
            range: version.map(String::from),
        })
    }
}

impl fmt::Display for PackageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.range {
            Some(range) => write!(f, "{}@{range}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_and_version() {
        let r = PackageRef::parse("foo@1.2.3").unwrap();
        assert_eq!(r.name, "foo");
        assert_eq!(r.range.as_deref(), Some("1.2.3"));
    }

    #[test]
    fn test_scoped_name_and_version() {
        let r = PackageRef::parse("@scope@1.2.3").unwrap();
        assert_eq!(r.name, "@scope");
        assert_eq!(r.range.as_deref(), Some("1.2.3"));
    }

    #[test]
    fn test_scoped_with_slash() {
        let r = PackageRef::parse("@types/node@^20").unwrap();
        assert_eq!(r.name, "@types/node");
        assert_eq!(r.range.as_deref(), Some("^20"));
    }

    #[test]
    fn test_name_only() {
        let r = PackageRef::parse("foo").unwrap();
        assert_eq!(r.name, "foo");
        assert_eq!(r.range, None);

        let r = PackageRef::parse("@foo").unwrap();
        assert_eq!(r.name, "@foo");
        assert_eq!(r.range, None);
    }

    #[test]
    fn test_empty_version_fails() {
        assert!(PackageRef::parse("@scope@").is_err());
        assert!(PackageRef::parse("foo@").is_err());
        assert!(PackageRef::parse("foo@   ").is_err());
    }

    #[test]
    fn test_too_many_segments_fails() {
        assert!(PackageRef::parse("foo@2@extra").is_err());
        assert!(PackageRef::parse("@foo@@ bla").is_err());
        assert!(PackageRef::parse("@@foo@@ bla").is_err());
    }

    #[test]
    fn test_empty_name_fails() {
        let err = PackageRef::parse("").unwrap_err();
        assert_eq!(err.code(), crate::pkg::error::codes::PKG_SPEC_INVALID);
        assert!(PackageRef::parse("@").is_err());
    }

    #[test]
    fn test_display_round_trips_input() {
        assert_eq!(PackageRef::parse("@scope@1.2.3").unwrap().to_string(), "@scope@1.2.3");
        assert_eq!(PackageRef::parse("foo").unwrap().to_string(), "foo");
    }
}
