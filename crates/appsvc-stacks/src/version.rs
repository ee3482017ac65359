//! Version ordering for catalog version strings
//!
//! Catalog values are loose: "12 LTS", "3.1", "~7", "DotnetCore2", "1.8".
//! The first `major[.minor[.patch]]` run of digits is read as a semver
//! version so that "10" sorts above "9" and "3.10" above "3.9".

use regex::Regex;
use semver::Version;
use std::cmp::Ordering;
use std::sync::LazyLock;

static VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)(?:\.(\d+))?(?:\.(\d+))?").expect("version regex is valid")
});

/// Extract a semver version from a catalog version string
pub fn normalize(raw: &str) -> Option<Version> {
    let caps = VERSION_PATTERN.captures(raw)?;
    let part = |i: usize| -> Option<u64> {
        caps.get(i)
            .map(|m| m.as_str().parse().ok())
            .unwrap_or(Some(0))
    };
    Some(Version::new(part(1)?, part(2)?, part(3)?))
}

/// Compare two catalog version strings, numerically where possible.
///
/// Strings without digits sort below any numeric version and compare
/// lexicographically among themselves.
pub fn compare(a: &str, b: &str) -> Ordering {
    match (normalize(a), normalize(b)) {
        (Some(va), Some(vb)) => va.cmp(&vb).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("12 LTS", 12, 0, 0 ; "lts suffix")]
    #[test_case("3.1", 3, 1, 0 ; "major minor")]
    #[test_case("~7", 7, 0, 0 ; "tilde")]
    #[test_case("DotnetCore2", 2, 0, 0 ; "embedded digits")]
    #[test_case("3.1.102", 3, 1, 102 ; "full")]
    #[test_case("Node|12.13", 12, 13, 0 ; "fx prefix")]
    fn test_normalize(raw: &str, major: u64, minor: u64, patch: u64) {
        assert_eq!(normalize(raw), Some(Version::new(major, minor, patch)));
    }

    #[test]
    fn test_normalize_without_digits() {
        assert_eq!(normalize("latest"), None);
    }

    #[test]
    fn test_numeric_not_lexicographic() {
        assert_eq!(compare("10", "9"), Ordering::Greater);
        assert_eq!(compare("3.10", "3.9"), Ordering::Greater);
        assert_eq!(compare("12 LTS", "8"), Ordering::Greater);
    }

    #[test]
    fn test_non_numeric_sorts_low() {
        assert_eq!(compare("latest", "1.0"), Ordering::Less);
        assert_eq!(compare("beta", "alpha"), Ordering::Greater);
    }

    #[test]
    fn test_equal_versions_tie_break_on_text() {
        assert_eq!(compare("3", "3.0"), Ordering::Less);
        assert_eq!(compare("3.1", "3.1"), Ordering::Equal);
    }
}
