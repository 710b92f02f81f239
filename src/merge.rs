//! Folding several per-build listings into one deduplicated repository.

use std::collections::{HashMap, HashSet};

use tracing::{debug, instrument};

use crate::model::{Category, Repository};

/// Merges repositories, keeping the first occurrence of every release.
///
/// Releases are keyed by [`crate::model::Plugin::identity_hash`] within each
/// category. The first repository to introduce an identity wins; later
/// duplicates are dropped without comparing their metadata. Categories appear
/// in the order they were first seen, and a category seen only empty is kept.
///
/// # Example
///
/// ```
/// use plugin_mirror::merge::merge_repositories;
/// use plugin_mirror::model::{Plugin, Repository};
///
/// let mut first = Repository::new();
/// first.push_plugin("Tools", Plugin::new("demo", "Demo", "1.0"));
/// let mut second = Repository::new();
/// second.push_plugin("Tools", Plugin::new("demo", "Demo", "1.0"));
/// second.push_plugin("Tools", Plugin::new("demo", "Demo", "1.1"));
///
/// let merged = merge_repositories([first, second]);
/// assert_eq!(merged.plugin_count(), 2);
/// ```
#[must_use]
#[instrument(skip_all)]
pub fn merge_repositories(repositories: impl IntoIterator<Item = Repository>) -> Repository {
    let mut categories: Vec<Category> = Vec::new();
    let mut seen: HashMap<String, (usize, HashSet<u64>)> = HashMap::new();

    for (index, repository) in repositories.into_iter().enumerate() {
        let mut kept = 0usize;
        let mut dropped = 0usize;

        for category in repository.into_categories() {
            let (slot, identities) = seen.entry(category.name.clone()).or_insert_with(|| {
                categories.push(Category::new(category.name.clone()));
                (categories.len() - 1, HashSet::new())
            });

            for plugin in category.plugins {
                if identities.insert(plugin.identity_hash()) {
                    categories[*slot].plugins.push(plugin);
                    kept += 1;
                } else {
                    dropped += 1;
                }
            }
        }

        debug!(repository = index + 1, kept, dropped, "merged repository");
    }

    Repository::from_categories(categories)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::Plugin;

    fn repository(entries: &[(&str, &str, &str)]) -> Repository {
        let mut repository = Repository::new();
        for (category, id, version) in entries {
            repository.push_plugin(category, Plugin::new(*id, id.to_uppercase(), *version));
        }
        repository
    }

    #[test]
    fn test_merge_same_identity_yields_single_entry() {
        let a = repository(&[("Tools", "demo", "1.0")]);
        let b = repository(&[("Tools", "demo", "1.0")]);

        let merged = merge_repositories([a, b]);

        assert_eq!(merged.plugin_count(), 1);
        assert_eq!(merged.category("Tools").unwrap().plugins[0].id, "demo");
    }

    #[test]
    fn test_merge_first_seen_wins() {
        let mut a = repository(&[("Tools", "demo", "1.0")]);
        let mut b = repository(&[("Tools", "demo", "1.0")]);
        a.push_plugin("Extra", Plugin {
            size: 100,
            ..Plugin::new("first", "First", "1")
        });
        b.push_plugin("Extra", Plugin {
            size: 999,
            ..Plugin::new("first", "First", "1")
        });

        let merged = merge_repositories([a, b]);

        assert_eq!(merged.category("Extra").unwrap().plugins[0].size, 100);
    }

    #[test]
    fn test_merge_different_versions_are_kept() {
        let a = repository(&[("Tools", "demo", "1.0")]);
        let b = repository(&[("Tools", "demo", "1.1")]);

        let merged = merge_repositories([a, b]);

        let versions: Vec<&str> = merged
            .category("Tools")
            .unwrap()
            .plugins
            .iter()
            .map(|p| p.version.as_str())
            .collect();
        assert_eq!(versions, vec!["1.0", "1.1"]);
    }

    #[test]
    fn test_merge_category_union_in_first_seen_order() {
        let a = repository(&[("Tools", "demo", "1.0"), ("Themes", "dark", "1")]);
        let b = repository(&[("VCS", "git", "2"), ("Tools", "other", "3")]);

        let merged = merge_repositories([a, b]);

        let names: Vec<&str> = merged.categories().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Tools", "Themes", "VCS"]);
        assert_eq!(merged.plugin_count(), 4);
    }

    #[test]
    fn test_merge_duplicates_within_one_repository() {
        let a = repository(&[("Tools", "demo", "1.0"), ("Tools", "demo", "1.0")]);

        let merged = merge_repositories([a]);

        assert_eq!(merged.plugin_count(), 1);
    }

    #[test]
    fn test_merge_empty_inputs() {
        assert!(merge_repositories(Vec::new()).is_empty());

        let empty_category = Repository::from_categories([Category::new("Empty")]);
        let merged = merge_repositories([empty_category]);
        assert_eq!(merged.categories().len(), 1);
        assert!(merged.is_empty());
    }
}
