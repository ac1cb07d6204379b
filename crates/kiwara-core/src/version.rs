use std::fmt::Write;

/// The current version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Version line printed by `kiwara version`, with the git hash when the
/// build provides one.
#[must_use]
pub fn version_string() -> String {
    let mut s = format!("kiwara {VERSION}");

    if let Some(hash) = option_env!("KIWARA_BUILD_GIT_HASH") {
        let _ = write!(s, " ({hash})");
    }

    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_string_names_the_tool() {
        let vs = version_string();
        assert!(vs.starts_with("kiwara "));
        assert!(vs.contains(VERSION));
    }
}
