//! Repository snapshots: categories of plugin releases.

use quick_xml::Reader;
use quick_xml::events::Event;
use serde::{Deserialize, Serialize};

use super::{ManifestError, Plugin};

/// Root element name of a manifest document.
pub const ROOT_ELEMENT: &str = "plugin-repository";

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

/// A named group of plugin releases. Releases are not necessarily unique.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "@name")]
    pub name: String,

    #[serde(rename = "idea-plugin", default)]
    pub plugins: Vec<Plugin>,
}

impl Category {
    /// Creates an empty category.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            plugins: Vec::new(),
        }
    }

    /// Sum of declared sizes of every release in the category.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.plugins.iter().map(|p| p.size).sum()
    }
}

/// A snapshot of the remote repository, or the merge of several.
///
/// Category names are unique; inserting into an existing name appends to it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename = "plugin-repository")]
pub struct Repository {
    #[serde(rename = "category", default)]
    categories: Vec<Category>,
}

impl Repository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a repository from categories, folding duplicate names together
    /// in first-seen order.
    #[must_use]
    pub fn from_categories(categories: impl IntoIterator<Item = Category>) -> Self {
        let mut repository = Self::new();
        for category in categories {
            repository
                .category_entry(&category.name)
                .plugins
                .extend(category.plugins);
        }
        repository
    }

    /// Decodes a `plugin-repository` XML document.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::UnexpectedRoot`] if the document is not a
    /// `plugin-repository`, or [`ManifestError::Decode`] if it does not match
    /// the schema.
    pub fn from_xml(xml: &str) -> Result<Self, ManifestError> {
        let root = root_element(xml);
        if root.as_deref() != Some(ROOT_ELEMENT) {
            return Err(ManifestError::UnexpectedRoot { found: root });
        }
        let decoded: Self = quick_xml::de::from_str(xml).map_err(ManifestError::decode)?;
        Ok(Self::from_categories(decoded.categories))
    }

    /// Encodes the repository as an indented `plugin-repository` XML document.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Encode`] if serialization fails.
    pub fn to_xml(&self) -> Result<String, ManifestError> {
        let mut buffer = String::from(XML_DECLARATION);
        let mut serializer = quick_xml::se::Serializer::new(&mut buffer);
        serializer.indent(' ', 2);
        self.serialize(serializer).map_err(ManifestError::encode)?;
        buffer.push('\n');
        Ok(buffer)
    }

    /// All categories in insertion order.
    #[must_use]
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Consumes the repository, returning its categories.
    #[must_use]
    pub fn into_categories(self) -> Vec<Category> {
        self.categories
    }

    /// Looks up a category by exact name.
    #[must_use]
    pub fn category(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    /// Appends a release to the named category, creating it if needed.
    pub fn push_plugin(&mut self, category: &str, plugin: Plugin) {
        self.category_entry(category).plugins.push(plugin);
    }

    /// Iterates every release together with its category.
    pub fn plugins(&self) -> impl Iterator<Item = (&Category, &Plugin)> {
        self.categories
            .iter()
            .flat_map(|c| c.plugins.iter().map(move |p| (c, p)))
    }

    /// Number of releases across all categories.
    #[must_use]
    pub fn plugin_count(&self) -> usize {
        self.categories.iter().map(|c| c.plugins.len()).sum()
    }

    /// Sum of declared sizes of every release, in bytes.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.categories.iter().map(Category::total_size).sum()
    }

    /// Returns true if no category holds any release.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugin_count() == 0
    }

    fn category_entry(&mut self, name: &str) -> &mut Category {
        let index = match self.categories.iter().position(|c| c.name == name) {
            Some(index) => index,
            None => {
                self.categories.push(Category::new(name));
                self.categories.len() - 1
            }
        };
        &mut self.categories[index]
    }
}

fn root_element(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(tag) | Event::Empty(tag)) => {
                return Some(String::from_utf8_lossy(tag.name().as_ref()).into_owned());
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}
