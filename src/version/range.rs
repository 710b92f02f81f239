//! Half-open compatibility ranges over build identifiers.

use std::fmt;

use super::{BuildVersion, VersionError};

/// A half-open interval `[since, until)` of build identifiers.
///
/// An invalid bound (see [`BuildVersion::is_valid`]) means "unbounded" on that
/// side. When both bounds are invalid the range matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionRange {
    since: BuildVersion,
    until: BuildVersion,
}

impl VersionRange {
    /// Creates a range from two bounds.
    #[must_use]
    pub fn new(since: BuildVersion, until: BuildVersion) -> Self {
        Self { since, until }
    }

    /// Parses a range from optional raw bounds.
    ///
    /// Missing or blank bounds become the invalid identifier.
    ///
    /// # Errors
    ///
    /// Returns [`VersionError::MalformedVersion`] if a present bound fails to parse.
    pub fn parse(since: Option<&str>, until: Option<&str>) -> Result<Self, VersionError> {
        Ok(Self::new(parse_bound(since)?, parse_bound(until)?))
    }

    /// Inclusive lower bound.
    #[must_use]
    pub fn since(&self) -> &BuildVersion {
        &self.since
    }

    /// Exclusive upper bound.
    #[must_use]
    pub fn until(&self) -> &BuildVersion {
        &self.until
    }

    /// Returns true if `version` falls inside `[since, until)`.
    ///
    /// Bounds are compared numerically; product codes are ignored.
    ///
    /// # Example
    ///
    /// ```
    /// use plugin_mirror::version::{BuildVersion, VersionRange};
    ///
    /// let range = VersionRange::parse(Some("1.0"), Some("2.0")).unwrap();
    /// assert!(range.is_in_range(&BuildVersion::parse("1.0").unwrap()));
    /// assert!(!range.is_in_range(&BuildVersion::parse("2.0").unwrap()));
    /// ```
    #[must_use]
    pub fn is_in_range(&self, version: &BuildVersion) -> bool {
        let since_valid = self.since.is_valid();
        let until_valid = self.until.is_valid();
        if !since_valid && !until_valid {
            return false;
        }

        let above_since = !since_valid || version.compare_components(&self.since).is_ge();
        let below_until = !until_valid || version.compare_components(&self.until).is_lt();
        above_since && below_until
    }
}

fn parse_bound(raw: Option<&str>) -> Result<BuildVersion, VersionError> {
    match raw.map(str::trim) {
        Some(text) if !text.is_empty() => BuildVersion::parse(text),
        _ => Ok(BuildVersion::invalid()),
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.since, self.until)
    }
}
