//! Published package manifests.
//!
//! A manifest is the registry document for one exact version of a package.
//! It is stored once behind an `Arc` and never mutated; callers either borrow
//! nested values through [`Manifest::get`] or take a detached copy through
//! [`Manifest::data`].

use super::error::PkgError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Which dependency section of a manifest the resolver follows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DependencyType {
    #[default]
    #[serde(rename = "dependencies")]
    Dependencies,
    #[serde(rename = "devDependencies")]
    DevDependencies,
}

impl DependencyType {
    /// Manifest key for this section.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dependencies => "dependencies",
            Self::DevDependencies => "devDependencies",
        }
    }

    /// Parse a manifest section name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "dependencies" => Some(Self::Dependencies),
            "devDependencies" => Some(Self::DevDependencies),
            _ => None,
        }
    }
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deprecation state derived from the manifest's `deprecated` field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeprecatedInfo {
    pub deprecated: bool,
    pub message: String,
}

/// An immutable, cheaply cloneable package manifest.
#[derive(Clone, PartialEq)]
pub struct Manifest {
    inner: Arc<ManifestInner>,
}

#[derive(PartialEq)]
struct ManifestInner {
    name: String,
    version: String,
    data: Value,
}

impl Manifest {
    /// Wrap a registry document.
    ///
    /// # Errors
    /// Returns `PKG_MANIFEST_INVALID` if `name` or `version` is missing.
    pub fn new(data: Value) -> Result<Self, PkgError> {
        let name = data
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| PkgError::manifest_invalid("Manifest is missing a \"name\" field"))?
            .to_string();
        let version = data
            .get("version")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                PkgError::manifest_invalid(format!(
                    "Manifest for \"{name}\" is missing a \"version\" field"
                ))
            })?
            .to_string();

        Ok(Self {
            inner: Arc::new(ManifestInner {
                name,
                version,
                data,
            }),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.inner.version
    }

    /// `name@version`.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}@{}", self.inner.name, self.inner.version)
    }

    /// A detached deep copy of the whole document.
    #[must_use]
    pub fn data(&self) -> Value {
        self.inner.data.clone()
    }

    /// Look up a nested value by path, e.g. `dist.tarball` or `maintainers[0].name`.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut current = &self.inner.data;
        for segment in path_segments(path) {
            current = match segment {
                PathSegment::Key(key) => current.get(key)?,
                PathSegment::Index(idx) => current.get(idx)?,
            };
        }
        Some(current)
    }

    /// Convenience for string-valued paths.
    #[must_use]
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    /// Declared dependencies of the given section, in manifest order.
    ///
    /// # Errors
    /// Returns `PKG_MANIFEST_INVALID` when the section is not an object or a
    /// range is not a string.
    pub fn dependencies(&self, dep_type: DependencyType) -> Result<Vec<(String, String)>, PkgError> {
        let Some(section) = self.inner.data.get(dep_type.as_str()) else {
            return Ok(Vec::new());
        };

        let Some(entries) = section.as_object() else {
            return Err(PkgError::manifest_invalid(format!(
                "\"{dep_type}\" of {} is not an object",
                self.full_name()
            )));
        };

        entries
            .iter()
            .map(|(name, range)| match range.as_str() {
                Some(range) => Ok((name.clone(), range.to_string())),
                None => Err(PkgError::manifest_invalid(format!(
                    "Invalid range for '{name}' in {}: expected string",
                    self.full_name()
                ))),
            })
            .collect()
    }

    #[must_use]
    pub fn deprecated_info(&self) -> DeprecatedInfo {
        match self.get_str("deprecated") {
            Some(message) => DeprecatedInfo {
                deprecated: true,
                message: message.to_string(),
            },
            None => DeprecatedInfo::default(),
        }
    }
}

impl fmt::Debug for Manifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Manifest")
            .field("name", &self.inner.name)
            .field("version", &self.inner.version)
            .finish_non_exhaustive()
    }
}

enum PathSegment<'a> {
    Key(&'a str),
    Index(usize),
}

/// Split `a.b[0].c` into keys and indices. Bracketed segments that are not
/// numbers are treated as keys (`a["b"]` is not supported).
fn path_segments(path: &str) -> Vec<PathSegment<'_>> {
    let mut segments = Vec::new();
    for part in path.split('.').filter(|p| !p.is_empty()) {
        let mut rest = part;
        if let Some(open) = rest.find('[') {
            let key = &rest[..open];
            if !key.is_empty() {
                segments.push(PathSegment::Key(key));
            }
            rest = &rest[open..];
            while let Some(stripped) = rest.strip_prefix('[') {
                let Some(close) = stripped.find(']') else {
                    segments.push(PathSegment::Key(stripped));
                    break;
                };
                let inner = &stripped[..close];
                match inner.parse::<usize>() {
                    Ok(idx) => segments.push(PathSegment::Index(idx)),
                    Err(_) => segments.push(PathSegment::Key(inner)),
                }
                rest = &stripped[close + 1..];
            }
        } else {
            segments.push(PathSegment::Key(rest));
        }
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Manifest {
        Manifest::new(json!({
            "name": "request",
            "version": "2.88.2",
            "deprecated": "request has been deprecated",
            "dependencies": {
                "uuid": "^3.3.2",
                "aws4": "^1.8.0",
                "qs": "~6.5.2"
            },
            "maintainers": [{ "name": "mikeal" }, { "name": "simov" }],
            "dist": { "tarball": "https://registry.npmjs.org/request/-/request-2.88.2.tgz" }
        }))
        .unwrap()
    }

    #[test]
    fn test_identity() {
        let m = sample();
        assert_eq!(m.name(), "request");
        assert_eq!(m.version(), "2.88.2");
        assert_eq!(m.full_name(), "request@2.88.2");
    }

    #[test]
    fn test_missing_identity_is_invalid() {
        let err = Manifest::new(json!({ "version": "1.0.0" })).unwrap_err();
        assert_eq!(err.code(), crate::pkg::error::codes::PKG_MANIFEST_INVALID);
        assert!(Manifest::new(json!({ "name": "x" })).is_err());
    }

    #[test]
    fn test_dependencies_keep_declaration_order() {
        let deps = sample().dependencies(DependencyType::Dependencies).unwrap();
        let names: Vec<&str> = deps.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["uuid", "aws4", "qs"]);
        assert!(sample()
            .dependencies(DependencyType::DevDependencies)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_non_string_range_is_invalid() {
        let m = Manifest::new(json!({
            "name": "a",
            "version": "1.0.0",
            "dependencies": { "b": 1 }
        }))
        .unwrap();
        assert!(m.dependencies(DependencyType::Dependencies).is_err());
    }

    #[test]
    fn test_path_lookup() {
        let m = sample();
        assert_eq!(
            m.get_str("dist.tarball"),
            Some("https://registry.npmjs.org/request/-/request-2.88.2.tgz")
        );
        assert_eq!(m.get_str("maintainers[1].name"), Some("simov"));
        assert!(m.get("maintainers[5].name").is_none());
        assert!(m.get("nope.deeper").is_none());
    }

    #[test]
    fn test_data_is_detached_copy() {
        let m = sample();
        let mut copy = m.data();
        copy["name"] = json!("mutated");
        assert_eq!(m.name(), "request");
        assert_eq!(m.get_str("name"), Some("request"));
    }

    #[test]
    fn test_deprecated_info() {
        let info = sample().deprecated_info();
        assert!(info.deprecated);
        assert_eq!(info.message, "request has been deprecated");

        let fresh = Manifest::new(json!({ "name": "a", "version": "1.0.0" })).unwrap();
        assert_eq!(fresh.deprecated_info(), DeprecatedInfo::default());
    }

    #[test]
    fn test_dependency_type_parse() {
        assert_eq!(
            DependencyType::parse("devDependencies"),
            Some(DependencyType::DevDependencies)
        );
        assert_eq!(DependencyType::parse("foo"), None);
        assert_eq!(DependencyType::Dependencies.to_string(), "dependencies");
    }
}
