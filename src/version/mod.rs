//! Build identifiers and compatibility ranges.
//!
//! A [`BuildVersion`] identifies an IDE build (`RD-191.7141.355`); a
//! [`VersionRange`] is the half-open `[since, until)` window a plugin release
//! declares itself compatible with.

mod build;
mod error;
mod range;

pub use build::{BuildVersion, NOT_AVAILABLE, WILDCARD};
pub use error::VersionError;
pub use range::VersionRange;
