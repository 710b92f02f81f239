//! A single plugin release as listed by the repository.

use std::collections::BTreeSet;
use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::version::{BuildVersion, VersionError, VersionRange};

/// Publisher of a plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vendor {
    /// Vendor homepage.
    #[serde(rename = "@url", default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Contact address.
    #[serde(rename = "@email", default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Display name.
    #[serde(rename = "$text", default)]
    pub name: String,
}

/// Raw compatibility bounds as declared by the release (`idea-version`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compatibility {
    #[serde(rename = "@min", default, skip_serializing_if = "Option::is_none")]
    pub min: Option<String>,

    #[serde(rename = "@max", default, skip_serializing_if = "Option::is_none")]
    pub max: Option<String>,

    #[serde(rename = "@since-build", default, skip_serializing_if = "Option::is_none")]
    pub since_build: Option<String>,

    #[serde(rename = "@until-build", default, skip_serializing_if = "Option::is_none")]
    pub until_build: Option<String>,
}

/// One release of a plugin (`idea-plugin` element).
///
/// Identity is the `(id, version)` pair; see [`Plugin::identity_hash`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename = "idea-plugin")]
pub struct Plugin {
    /// Lifetime download count.
    #[serde(rename = "@downloads", default)]
    pub downloads: u64,

    /// Declared artifact size in bytes.
    #[serde(rename = "@size", default)]
    pub size: u64,

    #[serde(rename = "@url", default, skip_serializing_if = "Option::is_none")]
    pub project_url: Option<String>,

    #[serde(rename = "@date", default, skip_serializing_if = "Option::is_none")]
    pub upload_date: Option<String>,

    #[serde(rename = "@updatedDate", default, skip_serializing_if = "Option::is_none")]
    pub update_date: Option<String>,

    pub name: String,

    pub id: String,

    #[serde(default)]
    pub description: String,

    pub version: String,

    #[serde(default)]
    pub vendor: Vendor,

    #[serde(rename = "idea-version", default)]
    pub compatibility: Compatibility,

    #[serde(rename = "change-notes", default)]
    pub change_notes: String,

    /// IDs of plugins this release depends on.
    #[serde(rename = "depends", default)]
    pub depends: Vec<String>,

    /// Tags, carried on the wire as one `;`-separated element.
    #[serde(
        default,
        with = "tag_list",
        skip_serializing_if = "BTreeSet::is_empty"
    )]
    pub tags: BTreeSet<String>,

    /// Average rating, 0 to 5.
    #[serde(default)]
    pub rating: f64,
}

impl Plugin {
    /// Creates a release with the identifying fields set and everything else empty.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: version.into(),
            ..Self::default()
        }
    }

    /// Hash of the `(id, version)` pair.
    ///
    /// Two records with the same identity hash describe the same release.
    /// The hasher uses fixed keys, so values are stable within a process.
    #[must_use]
    pub fn identity_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.id.hash(&mut hasher);
        self.version.hash(&mut hasher);
        hasher.finish()
    }

    /// Returns true if `other` is the same logical release.
    #[must_use]
    pub fn is_same_as(&self, other: &Plugin) -> bool {
        self.identity_hash() == other.identity_hash()
    }

    /// Parses the declared `since-build`/`until-build` pair.
    ///
    /// # Errors
    ///
    /// Returns [`VersionError::MalformedVersion`] if either bound is present but unparsable.
    pub fn compatible_range(&self) -> Result<VersionRange, VersionError> {
        VersionRange::parse(
            self.compatibility.since_build.as_deref(),
            self.compatibility.until_build.as_deref(),
        )
    }

    /// Returns true if this release declares compatibility with `build`.
    ///
    /// Malformed bounds count as incompatible.
    #[must_use]
    pub fn is_compatible_with(&self, build: &BuildVersion) -> bool {
        self.compatible_range()
            .is_ok_and(|range| range.is_in_range(build))
    }
}

impl fmt::Display for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

mod tag_list {
    use std::collections::BTreeSet;

    use serde::{Deserialize, Deserializer, Serializer};

    const SEPARATOR: char = ';';

    pub fn serialize<S>(tags: &BTreeSet<String>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let joined = tags
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(&SEPARATOR.to_string());
        serializer.serialize_str(&joined)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        Ok(raw
            .split(SEPARATOR)
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect())
    }
}
