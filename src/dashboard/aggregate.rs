//! Merge, de-duplication and grouping of the pages a viewer can see.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::session::Viewer;
use crate::error::Result;
use crate::store::Store;
use crate::types::{Page, PageWithCategory};

pub const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Category(String),
}

impl CategoryFilter {
    /// `None`, empty and `"all"` select every category; anything else is an id.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("" | "all") => CategoryFilter::All,
            Some(id) => CategoryFilter::Category(id.to_string()),
        }
    }

    #[must_use]
    pub fn matches(&self, page: &Page) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Category(id) => page.category_id.as_deref() == Some(id.as_str()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageGroup {
    pub category: String,
    pub pages: Vec<PageWithCategory>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Common,
    Owned,
}

pub struct Aggregator<'a> {
    store: &'a dyn Store,
}

impl<'a> Aggregator<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Pages visible to `viewer`, filtered and grouped by category name.
    pub fn aggregate(&self, viewer: &Viewer, filter: &CategoryFilter) -> Vec<PageGroup> {
        group_by_category(self.flatten(viewer, filter))
    }

    /// Same as [`Aggregator::aggregate`] without the grouping step.
    pub fn flatten(&self, viewer: &Viewer, filter: &CategoryFilter) -> Vec<PageWithCategory> {
        let common = fetch_or_empty("common", self.store.list_common_pages());
        let owned = match viewer.user_id() {
            Some(user_id) => fetch_or_empty("owned", self.store.list_owned_pages(user_id)),
            None => Vec::new(),
        };

        merge_sources(common, owned)
            .into_iter()
            .filter(|p| filter.matches(&p.page))
            .collect()
    }
}

fn fetch_or_empty(source: &str, result: Result<Vec<PageWithCategory>>) -> Vec<PageWithCategory> {
    result.unwrap_or_else(|e| {
        tracing::error!("Error fetching {source} pages: {e}");
        Vec::new()
    })
}

/// Concatenates common then owned pages and de-duplicates by id. A repeated id
/// keeps its first position and takes the later value. Pages coming from the
/// owned source are always reported as private.
pub fn merge_sources(
    common: Vec<PageWithCategory>,
    owned: Vec<PageWithCategory>,
) -> Vec<PageWithCategory> {
    let tagged = common
        .into_iter()
        .map(|p| (Source::Common, p))
        .chain(owned.into_iter().map(|p| (Source::Owned, p)));

    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut merged: Vec<(Source, PageWithCategory)> = Vec::new();

    for (source, page) in tagged {
        match positions.get(&page.page.id) {
            Some(&index) => merged[index] = (source, page),
            None => {
                positions.insert(page.page.id.clone(), merged.len());
                merged.push((source, page));
            }
        }
    }

    merged
        .into_iter()
        .map(|(source, mut page)| {
            if source == Source::Owned {
                page.page.is_common = false;
            }
            page
        })
        .collect()
}

/// Groups pages by category display name. Groups keep the order in which
/// their first page appears; pages inside a group are sorted by title.
pub fn group_by_category(pages: Vec<PageWithCategory>) -> Vec<PageGroup> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<PageGroup> = Vec::new();

    for page in pages {
        let name = page
            .category_name
            .clone()
            .unwrap_or_else(|| UNCATEGORIZED.to_string());

        match positions.get(&name) {
            Some(&index) => groups[index].pages.push(page),
            None => {
                positions.insert(name.clone(), groups.len());
                groups.push(PageGroup {
                    category: name,
                    pages: vec![page],
                });
            }
        }
    }

    for group in &mut groups {
        group.pages.sort_by(|a, b| a.page.title.cmp(&b.page.title));
    }

    groups
}
