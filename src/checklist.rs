//! View-state derived from data store rows: category grouping, packing progress,
//! and parsing of the bulk item text box.

use std::collections::{BTreeMap, HashSet};

use crate::models::{
    ChecklistGroup, InventoryGroup, InventoryItem, ListItem, PackingList,
};

/// Names of the outings every household starts with. Shown as fixed cards on the
/// home page rather than among the user's own lists.
pub const PRESET_LIST_NAMES: [&str; 3] = ["daycare", "grandparents", "trip"];

pub trait Categorized {
    fn category(&self) -> &str;
}

impl Categorized for ListItem {
    fn category(&self) -> &str {
        &self.category
    }
}

impl Categorized for InventoryItem {
    fn category(&self) -> &str {
        &self.category
    }
}

/// Distinct categories in first-seen order.
pub fn unique_categories<T: Categorized>(items: &[T]) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .iter()
        .map(Categorized::category)
        .filter(|category| seen.insert(*category))
        .map(str::to_string)
        .collect()
}

/// Items bucketed by category, categories sorted, item order preserved within a bucket.
pub fn group_by_category<T: Categorized + Clone>(items: &[T]) -> Vec<(String, Vec<T>)> {
    let mut groups: BTreeMap<&str, Vec<T>> = BTreeMap::new();
    for item in items {
        groups.entry(item.category()).or_default().push(item.clone());
    }
    groups
        .into_iter()
        .map(|(category, items)| (category.to_string(), items))
        .collect()
}

pub fn checklist_groups(items: &[ListItem]) -> Vec<ChecklistGroup> {
    group_by_category(items)
        .into_iter()
        .map(|(category, items)| ChecklistGroup { category, items })
        .collect()
}

pub fn inventory_groups(items: &[InventoryItem]) -> Vec<InventoryGroup> {
    group_by_category(items)
        .into_iter()
        .map(|(category, items)| InventoryGroup { category, items })
        .collect()
}

pub fn packed_count(items: &[ListItem]) -> usize {
    items.iter().filter(|item| item.is_checked).count()
}

/// An empty list is never "all packed".
pub fn all_packed(items: &[ListItem]) -> bool {
    !items.is_empty() && items.iter().all(|item| item.is_checked)
}

/// Splits the bulk-entry text on newlines and commas, trimming and dropping blanks.
pub fn parse_item_names(text: &str) -> Vec<String> {
    text.split(['\n', ','])
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Trimmed name, or `None` when nothing is left.
pub fn normalize_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

pub fn is_preset_list(name: &str) -> bool {
    PRESET_LIST_NAMES.contains(&name)
}

/// Splits the user's lists into `(preset, custom)`.
pub fn partition_lists(lists: Vec<PackingList>) -> (Vec<PackingList>, Vec<PackingList>) {
    lists.into_iter().partition(|list| is_preset_list(&list.name))
}
