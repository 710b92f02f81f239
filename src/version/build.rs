//! IDE build identifiers such as `RD-191.7141.355` or `191.*`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use super::VersionError;

/// Component value meaning "any/latest" (written `*`).
pub const WILDCARD: i64 = -1;

/// Text form of the unset build identifier.
pub const NOT_AVAILABLE: &str = "n/a";

/// A parsed IDE build identifier.
///
/// Layout is `[PRODUCT-]branch[.build[.extra...]]`. Any numeric component may
/// be `*`, stored as [`WILDCARD`]. Components after the first wildcard carry no
/// meaning and are dropped on construction, so two identifiers that compare
/// equal also hash equal.
///
/// Ordering is lexicographic over `(branch, build, extra...)`:
/// - a missing build sorts before any present build
/// - a wildcard sorts after every concrete value at the same position
/// - when one `extra` list is a prefix of the other, the longer one is greater
///
/// The product code only breaks ties between numerically equal identifiers;
/// see [`BuildVersion::compare_components`] for the numeric-only comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BuildVersion {
    product_id: Option<String>,
    branch: i64,
    build: Option<i64>,
    extra: Vec<i64>,
}

impl BuildVersion {
    /// Creates a build identifier from its parts.
    ///
    /// Components following the first wildcard are discarded.
    #[must_use]
    pub fn new(
        product_id: Option<String>,
        branch: i64,
        build: Option<i64>,
        extra: Vec<i64>,
    ) -> Self {
        let mut version = Self {
            product_id,
            branch,
            build,
            extra,
        };
        version.truncate_after_wildcard();
        version
    }

    /// The canonical unset identifier (`n/a`).
    #[must_use]
    pub fn invalid() -> Self {
        Self::default()
    }

    /// Parses a build identifier.
    ///
    /// `n/a` yields [`BuildVersion::invalid`]. A `-` at any position after the
    /// first character separates the product code from the numeric part.
    ///
    /// # Errors
    ///
    /// Returns [`VersionError::MalformedVersion`] if any dotted component is
    /// not an unsigned integer or `*`.
    ///
    /// # Example
    ///
    /// ```
    /// use plugin_mirror::version::BuildVersion;
    ///
    /// let v = BuildVersion::parse("RD-191.7141.355").unwrap();
    /// assert_eq!(v.product_id(), Some("RD"));
    /// assert_eq!(v.branch(), 191);
    /// assert_eq!(v.build(), Some(7141));
    /// assert_eq!(v.extra(), &[355]);
    /// ```
    pub fn parse(raw: &str) -> Result<Self, VersionError> {
        let text = raw.trim();
        if text == NOT_AVAILABLE {
            return Ok(Self::invalid());
        }

        let (product_id, numeric) = match text.find('-') {
            Some(idx) if idx > 0 => (Some(text[..idx].to_string()), &text[idx + 1..]),
            _ => (None, text),
        };

        let mut components = numeric
            .split('.')
            .map(|component| parse_component(raw, component));

        let branch = components
            .next()
            .transpose()?
            .ok_or_else(|| VersionError::malformed(raw, ""))?;
        let build = components.next().transpose()?;
        let extra = components.collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(product_id, branch, build, extra))
    }

    /// Product code prefix, e.g. `RD` or `IU`.
    #[must_use]
    pub fn product_id(&self) -> Option<&str> {
        self.product_id.as_deref()
    }

    /// Branch number (first numeric component).
    #[must_use]
    pub fn branch(&self) -> i64 {
        self.branch
    }

    /// Build number (second numeric component), if present.
    #[must_use]
    pub fn build(&self) -> Option<i64> {
        self.build
    }

    /// Remaining numeric components.
    #[must_use]
    pub fn extra(&self) -> &[i64] {
        &self.extra
    }

    /// Returns `false` only for the unset identifier (no product code, branch 0).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !(self.product_id.is_none() && self.branch == 0)
    }

    /// Returns true if any component is a wildcard.
    #[must_use]
    pub fn has_wildcard(&self) -> bool {
        self.components().any(|c| c == WILDCARD)
    }

    /// Compares numeric components only, ignoring the product code.
    ///
    /// This is the ordering used for compatibility range checks.
    #[must_use]
    pub fn compare_components(&self, other: &Self) -> Ordering {
        compare_component(self.branch, other.branch)
            .then_with(|| match (self.build, other.build) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(a), Some(b)) => compare_component(a, b),
            })
            .then_with(|| {
                self.extra
                    .iter()
                    .zip(&other.extra)
                    .map(|(a, b)| compare_component(*a, *b))
                    .find(|ord| ord.is_ne())
                    .unwrap_or_else(|| self.extra.len().cmp(&other.extra.len()))
            })
    }

    fn components(&self) -> impl Iterator<Item = i64> + '_ {
        std::iter::once(self.branch)
            .chain(self.build)
            .chain(self.extra.iter().copied())
    }

    fn truncate_after_wildcard(&mut self) {
        if self.branch == WILDCARD {
            self.build = None;
            self.extra.clear();
        } else if self.build == Some(WILDCARD) {
            self.extra.clear();
        } else if let Some(pos) = self.extra.iter().position(|c| *c == WILDCARD) {
            self.extra.truncate(pos + 1);
        } else if self.build.is_none() {
            self.extra.clear();
        }
    }
}

fn parse_component(raw: &str, component: &str) -> Result<i64, VersionError> {
    if component == "*" {
        return Ok(WILDCARD);
    }
    component
        .parse::<u32>()
        .map(i64::from)
        .map_err(|_| VersionError::malformed(raw, component))
}

fn compare_component(a: i64, b: i64) -> Ordering {
    match (a == WILDCARD, b == WILDCARD) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.cmp(&b),
    }
}

impl Ord for BuildVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare_components(other)
            .then_with(|| self.product_id.cmp(&other.product_id))
    }
}

impl PartialOrd for BuildVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for BuildVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for BuildVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_valid() {
            return f.write_str(NOT_AVAILABLE);
        }
        if let Some(product) = &self.product_id {
            write!(f, "{product}-")?;
        }
        for (idx, component) in self.components().enumerate() {
            if idx > 0 {
                f.write_str(".")?;
            }
            if component == WILDCARD {
                // Nothing after a wildcard is kept, so this is always the last component.
                f.write_str("*")?;
            } else {
                write!(f, "{component}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn v(raw: &str) -> BuildVersion {
        BuildVersion::parse(raw).unwrap()
    }

    // ==================== Parsing Tests ====================

    #[test]
    fn test_parse_full_identifier_with_product() {
        let version = v("RD-191.7141.355");
        assert_eq!(version.product_id(), Some("RD"));
        assert_eq!(version.branch(), 191);
        assert_eq!(version.build(), Some(7141));
        assert_eq!(version.extra(), &[355]);
        assert!(version.is_valid());
    }

    #[test]
    fn test_parse_without_product() {
        let version = v("191.7141");
        assert_eq!(version.product_id(), None);
        assert_eq!(version.build(), Some(7141));
        assert!(version.extra().is_empty());
    }

    #[test]
    fn test_parse_branch_only() {
        let version = v("203");
        assert_eq!(version.branch(), 203);
        assert_eq!(version.build(), None);
    }

    #[test]
    fn test_parse_not_available_is_invalid() {
        let version = v("n/a");
        assert!(!version.is_valid());
        assert_eq!(version, BuildVersion::invalid());
    }

    #[test]
    fn test_parse_wildcard_components() {
        let version = v("191.*");
        assert_eq!(version.build(), Some(WILDCARD));
        assert!(version.has_wildcard());

        let version = v("*");
        assert_eq!(version.branch(), WILDCARD);
    }

    #[test]
    fn test_parse_drops_components_after_wildcard() {
        assert_eq!(v("191.*.5"), v("191.*"));
        assert_eq!(v("191.1.*.7.8").extra(), &[WILDCARD]);
    }

    #[test]
    fn test_parse_leading_dash_is_not_product_separator() {
        let result = BuildVersion::parse("-191.1");
        assert!(matches!(result, Err(VersionError::MalformedVersion { .. })));
    }

    #[test]
    fn test_parse_rejects_non_numeric_component() {
        let err = BuildVersion::parse("191.abc").unwrap_err();
        assert_eq!(err, VersionError::malformed("191.abc", "abc"));
    }

    #[test]
    fn test_parse_rejects_empty_text() {
        assert!(BuildVersion::parse("").is_err());
        assert!(BuildVersion::parse("191..2").is_err());
    }

    #[test]
    fn test_from_str_matches_parse() {
        let parsed: BuildVersion = "IU-203.5981.155".parse().unwrap();
        assert_eq!(parsed, v("IU-203.5981.155"));
    }

    // ==================== Validity Tests ====================

    #[test]
    fn test_is_valid_branch_zero_without_product() {
        assert!(!v("0.1").is_valid());
        assert!(v("RD-0.1").is_valid());
    }

    // ==================== Display Tests ====================

    #[test]
    fn test_display_round_trips_canonical_text() {
        for raw in ["RD-191.7141.355", "191.7141", "203", "191.*", "IC-193.1.*"] {
            assert_eq!(v(raw).to_string(), raw);
        }
    }

    #[test]
    fn test_display_invalid_is_not_available() {
        assert_eq!(BuildVersion::invalid().to_string(), "n/a");
    }

    // ==================== Ordering Tests ====================

    #[test]
    fn test_ordering_known_sequence() {
        let ordered = [
            "1", "1.0", "1.0.0", "1.0.1", "1.1", "1.1.*", "1.*", "2.0", "191.7141", "191.7141.355",
            "191.*", "192.1", "*",
        ];
        for pair in ordered.windows(2) {
            assert_eq!(
                v(pair[0]).cmp(&v(pair[1])),
                Ordering::Less,
                "{} should sort before {}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_ordering_is_strict_total_over_concrete_versions() {
        let versions: Vec<BuildVersion> = ["1.0", "1.0.5", "1.2", "2.0", "2.0.0.1", "10.3"]
            .iter()
            .map(|raw| v(raw))
            .collect();

        for a in &versions {
            assert_eq!(a.cmp(a), Ordering::Equal);
            for b in &versions {
                assert_eq!(a.cmp(b), b.cmp(a).reverse());
                for c in &versions {
                    if a < b && b < c {
                        assert!(a < c);
                    }
                }
            }
        }
    }

    #[test]
    fn test_ordering_missing_build_sorts_first() {
        assert!(v("191") < v("191.0"));
    }

    #[test]
    fn test_ordering_wildcard_greater_than_concrete() {
        assert!(v("191.*") > v("191.99999"));
        assert!(v("191.*") < v("192.0"));
    }

    #[test]
    fn test_equality_requires_same_product() {
        assert_ne!(v("RD-191.1"), v("IU-191.1"));
        assert_eq!(
            v("RD-191.1").compare_components(&v("IU-191.1")),
            Ordering::Equal
        );
    }
}
