//! npm version range resolution on top of `semver`.

use super::error::PkgError;
use super::registry::{get_dist_tag, get_latest_version, get_versions};
use semver::{Version, VersionReq};

/// A parsed npm range: one or more `||` alternatives, each a `semver` requirement.
#[derive(Debug, Clone)]
pub struct NpmRange {
    raw: String,
    alternatives: Vec<VersionReq>,
}

impl NpmRange {
    /// Parse an npm range such as `^1.2.0`, `1.x`, `>= 2.1.2 < 3`, `1.0.0 - 2.0.0`
    /// or `^1.0.0 || ^2.0.0`. An empty range matches every version.
    ///
    /// # Errors
    /// Returns `PKG_SPEC_INVALID` if no alternative parses.
    pub fn parse(range: &str) -> Result<Self, PkgError> {
        let mut alternatives = Vec::new();
        let mut last_error = None;

        for alt in range.split("||").map(str::trim) {
            match parse_alternative(alt) {
                Ok(req) => alternatives.push(req),
                Err(e) => last_error = Some(e),
            }
        }

        if alternatives.is_empty() {
            return Err(last_error.unwrap_or_else(|| {
                PkgError::spec_invalid(format!("Invalid version range '{range}'"))
            }));
        }

        Ok(Self {
            raw: range.to_string(),
            alternatives,
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives.iter().any(|req| req.matches(version))
    }

    /// Highest version in `versions` satisfying this range.
    #[must_use]
    pub fn max_satisfying<'a, I>(&self, versions: I) -> Option<Version>
    where
        I: IntoIterator<Item = &'a str>,
    {
        versions
            .into_iter()
            .filter_map(|v| Version::parse(v).ok())
            .filter(|v| self.matches(v))
            .max()
    }
}

/// Pick the version of a packument that a request resolves to.
///
/// - `None` resolves to `dist-tags.latest`
/// - a dist-tag name (`next`, `beta`, ...) resolves through `dist-tags`
/// - an exact published version resolves to itself
/// - anything else is an npm range and resolves to the highest match
///
/// # Errors
/// Returns `PKG_VERSION_NOT_FOUND` if nothing matches, or `PKG_SPEC_INVALID`
/// if the range cannot be parsed.
pub fn resolve_version(
    packument: &serde_json::Value,
    range: Option<&str>,
) -> Result<String, PkgError> {
    let name = packument
        .get("name")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown");

    let Some(range) = range else {
        return get_latest_version(packument)
            .map(String::from)
            .ok_or_else(|| PkgError::version_not_found(name, "latest"));
    };

    let trimmed = range.trim();
    let versions = get_versions(packument);

    if let Some(tagged) = get_dist_tag(packument, trimmed) {
        return Ok(tagged.to_string());
    }

    if versions.contains(&trimmed) {
        return Ok(trimmed.to_string());
    }

    let req = NpmRange::parse(trimmed)?;
    req.max_satisfying(versions)
        .map(|v| v.to_string())
        .ok_or_else(|| PkgError::version_not_found(name, range))
}

/// Parse one `||` alternative into a `semver` requirement.
fn parse_alternative(alt: &str) -> Result<VersionReq, PkgError> {
    let converted = normalize_alternative(alt);
    VersionReq::parse(&converted)
        .map_err(|e| PkgError::spec_invalid(format!("Invalid version range '{alt}': {e}")))
}

/// Rewrite npm-only syntax into something `semver` accepts.
fn normalize_alternative(alt: &str) -> String {
    let alt = alt.trim();

    if alt.is_empty() || matches!(alt, "*" | "x" | "X" | "latest") {
        return "*".to_string();
    }

    // "1.0.0 - 2.0.0" -> ">=1.0.0, <=2.0.0"
    if let Some((start, end)) = alt.split_once(" - ") {
        let (start, end) = (start.trim(), end.trim());
        if !start.is_empty() && !end.is_empty() {
            return format!(">={start}, <={end}");
        }
    }

    if alt.contains(['x', 'X', '*']) {
        return expand_x_range(alt);
    }

    // A bare published-looking version is exact in npm, caret in `semver`.
    let bare = alt.trim_start_matches(['v', '=']);
    if Version::parse(bare).is_ok() {
        return format!("={bare}");
    }

    // "1.2" means 1.2.x in npm.
    if is_partial_version(bare) && bare.matches('.').count() == 1 {
        return format!("~{bare}");
    }

    join_comparators(alt)
}

fn is_partial_version(s: &str) -> bool {
    !s.is_empty() && s.split('.').all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()))
}

/// "1.x" -> ">=1.0.0, <2.0.0", "1.2.x" -> ">=1.2.0, <1.3.0".
fn expand_x_range(range: &str) -> String {
    let parts: Vec<&str> = range.split('.').collect();
    let wild = |p: &str| matches!(p, "x" | "X" | "*");

    match parts.as_slice() {
        [major, rest @ ..] if rest.iter().all(|p| wild(p)) && !wild(major) => {
            if let Ok(m) = major.parse::<u64>() {
                return format!(">={m}.0.0, <{}.0.0", m + 1);
            }
        }
        [major, minor, patch] if wild(patch) => {
            if let (Ok(m), Ok(n)) = (major.parse::<u64>(), minor.parse::<u64>()) {
                return format!(">={m}.{n}.0, <{m}.{}.0", n + 1);
            }
        }
        _ => {}
    }

    range.replace(['x', 'X', '*'], "0")
}

/// npm separates AND-ed comparators with spaces (">= 2.1.2 < 3.0.0");
/// `semver` wants commas (">=2.1.2, <3.0.0").
fn join_comparators(range: &str) -> String {
    let mut comparators: Vec<String> = Vec::new();
    let mut pending_op = String::new();

    for token in range.split_whitespace() {
        if token.bytes().any(|b| b.is_ascii_digit()) {
            comparators.push(format!("{pending_op}{token}"));
            pending_op.clear();
        } else {
            pending_op.push_str(token);
        }
    }

    if comparators.is_empty() {
        return range.to_string();
    }

    comparators.join(", ")
}
