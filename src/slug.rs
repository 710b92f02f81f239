//! Filesystem-safe path segments derived from display names.
//!
//! Slugs decide where artifacts land on disk, and the skip check relies on
//! finding them there again, so [`slugify`] must be fully deterministic.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Maximum length of a slug in characters.
pub const MAX_SLUG_LEN: usize = 45;

#[allow(clippy::expect_used)]
static DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9\s-]").expect("slug character class regex is valid"));

#[allow(clippy::expect_used)]
static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace run regex is valid"));

/// Converts arbitrary text into a lowercase, hyphenated, diacritic-free slug.
///
/// The steps run in a fixed order:
/// 1. Decompose (NFD) and drop combining marks, so `é` becomes `e`
/// 2. Lowercase
/// 3. Remove everything outside `[a-z0-9\s-]`
/// 4. Collapse whitespace runs to one space and trim
/// 5. Truncate to [`MAX_SLUG_LEN`] characters and trim again
/// 6. Replace the remaining spaces with `-`
///
/// # Example
///
/// ```
/// use plugin_mirror::slug::slugify;
///
/// assert_eq!(slugify("Café  Tools!"), "cafe-tools");
/// assert_eq!(slugify(".NET Core"), "net-core");
/// ```
#[must_use]
pub fn slugify(text: &str) -> String {
    let stripped: String = text.nfd().filter(|c| !is_combining_mark(*c)).nfc().collect();
    let lowered = stripped.to_lowercase();
    let cleaned = DISALLOWED.replace_all(&lowered, "");
    let collapsed = WHITESPACE_RUN.replace_all(&cleaned, " ");

    // Only ASCII remains at this point, so char truncation is byte truncation.
    let truncated: String = collapsed.trim().chars().take(MAX_SLUG_LEN).collect();

    truncated.trim().replace(' ', "-")
}
