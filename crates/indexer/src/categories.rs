use crate::catalog::{stream_components, ComponentRecord};
use crate::Result;
use flatref_protocol::is_dotted_app_id;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Occurrences of one normalized category across the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: usize,
}

/// Normalized category -> application ids, built from a full catalog scan
#[derive(Debug, Clone, Default)]
pub struct CategoryIndex {
    by_category: BTreeMap<String, BTreeSet<String>>,
    counts: HashMap<String, usize>,
    indexed: usize,
    skipped: usize,
}

impl CategoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume a component stream to completion.
    ///
    /// A stream error aborts the build; nothing is returned for a partial scan.
    pub fn from_components<I>(components: I) -> Result<Self>
    where
        I: IntoIterator<Item = Result<ComponentRecord>>,
    {
        let mut index = Self::new();
        for component in components {
            index.insert(&component?);
        }
        log::info!(
            "Indexed {} components into {} categories ({} skipped)",
            index.indexed,
            index.by_category.len(),
            index.skipped
        );
        Ok(index)
    }

    pub fn from_xml(xml: &[u8]) -> Result<Self> {
        Self::from_components(stream_components(xml))
    }

    /// Add one component. Returns false when its identifier is not an application id.
    pub fn insert(&mut self, component: &ComponentRecord) -> bool {
        let app_id = component.id.trim();
        if !is_dotted_app_id(app_id) {
            self.skipped += 1;
            return false;
        }

        self.indexed += 1;
        for raw in &component.categories {
            let category = normalize_category(raw);
            if category.is_empty() {
                continue;
            }
            *self.counts.entry(category.clone()).or_insert(0) += 1;
            self.by_category
                .entry(category)
                .or_default()
                .insert(app_id.to_string());
        }
        true
    }

    pub fn ids(&self, category: &str) -> Option<&BTreeSet<String>> {
        self.by_category.get(category)
    }

    pub fn contains(&self, category: &str) -> bool {
        self.by_category.contains_key(category)
    }

    /// Categories in ascending name order
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.by_category.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.by_category.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.by_category.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_category.is_empty()
    }

    pub fn count(&self, category: &str) -> usize {
        self.counts.get(category).copied().unwrap_or(0)
    }

    /// Category counts, most frequent first; ties ordered by name.
    pub fn counts(&self) -> Vec<CategoryCount> {
        let mut counts: Vec<CategoryCount> = self
            .counts
            .iter()
            .map(|(category, &count)| CategoryCount {
                category: category.clone(),
                count,
            })
            .collect();
        counts.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.category.cmp(&b.category))
        });
        counts
    }

    /// Components whose id passed the application filter
    pub fn indexed_components(&self) -> usize {
        self.indexed
    }

    pub fn skipped_components(&self) -> usize {
        self.skipped
    }
}

pub fn normalize_category(raw: &str) -> String {
    raw.trim().replace(' ', "")
}
