//! Paginated query cache.
//!
//! A secondary cache keyed by query identity (entity kind + parameters),
//! holding the pages returned by list endpoints. Items are raw JSON values:
//! most are entities with an `id`, but non-entity payloads (e.g. trend
//! objects) are supported and simply skip ID-based deduplication.
//!
//! INVARIANT: flattening all pages and deduplicating by ID reproduces a
//! valid ordered sequence; last write wins on duplicate IDs.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde_json::Value;

use super::identity::Cursor;

/// Structured query identity. Keys sharing a `kind` and a params prefix
/// form a family (e.g. every "chats" variant) addressable at once.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QueryKey {
    kind: String,
    params: Vec<String>,
}

impl QueryKey {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: Vec::new(),
        }
    }

    pub fn with_params<I, S>(kind: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind: kind.into(),
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Whether `prefix` addresses this key: same kind, and the prefix's
    /// params lead this key's params.
    pub fn matches_prefix(&self, prefix: &QueryKey) -> bool {
        self.kind == prefix.kind
            && self.params.len() >= prefix.params.len()
            && self.params[..prefix.params.len()] == prefix.params[..]
    }
}

/// One fetched page.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Page {
    pub items: Vec<Value>,
}

impl Page {
    pub fn new(items: Vec<Value>) -> Self {
        Self { items }
    }
}

/// Pages plus the cursor each page was fetched with.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryEntry {
    pub pages: Vec<Page>,
    pub page_params: Vec<Option<Cursor>>,
}

impl QueryEntry {
    pub fn push_page(&mut self, page: Page, cursor: Option<Cursor>) {
        self.pages.push(page);
        self.page_params.push(cursor);
    }
}

fn item_id(item: &Value) -> Option<&str> {
    item.get("id").and_then(Value::as_str)
}

/// Concatenate all pages in page order; when every item carries an `id`,
/// deduplicate keeping the last occurrence's value at the first
/// occurrence's position.
pub fn flatten(entry: &QueryEntry) -> Vec<Value> {
    let items: Vec<&Value> = entry.pages.iter().flat_map(|p| p.items.iter()).collect();
    if !items.iter().all(|i| item_id(i).is_some()) {
        return items.into_iter().cloned().collect();
    }
    let mut latest: BTreeMap<&str, &Value> = BTreeMap::new();
    let mut order: Vec<&str> = Vec::new();
    for item in &items {
        let id = item_id(item).expect("checked above");
        if !latest.contains_key(id) {
            order.push(id);
        }
        latest.insert(id, item);
    }
    order
        .into_iter()
        .map(|id| (*latest[id]).clone())
        .collect()
}

/// The cache proper.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryCache {
    entries: BTreeMap<QueryKey, QueryEntry>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(&self, key: &QueryKey) -> Option<&QueryEntry> {
        self.entries.get(key)
    }

    pub fn entry_mut(&mut self, key: &QueryKey) -> &mut QueryEntry {
        self.entries.entry(key.clone()).or_default()
    }

    pub fn keys(&self) -> impl Iterator<Item = &QueryKey> {
        self.entries.keys()
    }

    pub fn remove_entry(&mut self, key: &QueryKey) -> Option<QueryEntry> {
        self.entries.remove(key)
    }

    /// Drop every entry in a family.
    pub fn remove_family(&mut self, prefix: &QueryKey) {
        self.entries.retain(|key, _| !key.matches_prefix(prefix));
    }

    /// Replace the first matching item in every page of one entry.
    /// No-op when the key or a match is absent.
    pub fn update_item(
        &mut self,
        key: &QueryKey,
        new_item: &Value,
        matcher: &dyn Fn(&Value, &Value) -> bool,
    ) {
        if let Some(entry) = self.entries.get_mut(key) {
            update_entry_item(entry, new_item, matcher);
        }
    }

    /// `update_item` across every entry in a family.
    pub fn update_item_family(
        &mut self,
        prefix: &QueryKey,
        new_item: &Value,
        matcher: &dyn Fn(&Value, &Value) -> bool,
    ) {
        for (_, entry) in self
            .entries
            .iter_mut()
            .filter(|(key, _)| key.matches_prefix(prefix))
        {
            update_entry_item(entry, new_item, matcher);
        }
    }

    /// Prepend an item to the first page (newest-first convention).
    /// Creates the entry and page when absent.
    pub fn append_item(&mut self, key: &QueryKey, item: Value) {
        let entry = self.entry_mut(key);
        if entry.pages.is_empty() {
            entry.push_page(Page::default(), None);
        }
        entry.pages[0].items.insert(0, item);
    }

    /// `append_item` unless an item with the same `id` is already cached
    /// in any page. Items without an `id` are always appended.
    pub fn append_item_if_absent(&mut self, key: &QueryKey, item: Value) {
        if let Some(id) = item_id(&item)
            && let Some(entry) = self.entries.get(key)
            && entry
                .pages
                .iter()
                .flat_map(|p| p.items.iter())
                .any(|existing| item_id(existing) == Some(id))
        {
            return;
        }
        self.append_item(key, item);
    }

    /// Filter matching items out of every page of one entry.
    pub fn remove_item(
        &mut self,
        key: &QueryKey,
        target: &Value,
        matcher: &dyn Fn(&Value, &Value) -> bool,
    ) {
        if let Some(entry) = self.entries.get_mut(key) {
            remove_entry_item(entry, target, matcher);
        }
    }

    /// `remove_item` across every entry in a family.
    pub fn remove_item_family(
        &mut self,
        prefix: &QueryKey,
        target: &Value,
        matcher: &dyn Fn(&Value, &Value) -> bool,
    ) {
        for (_, entry) in self
            .entries
            .iter_mut()
            .filter(|(key, _)| key.matches_prefix(prefix))
        {
            remove_entry_item(entry, target, matcher);
        }
    }

    /// Flatten, sort, and re-chunk one entry into `page_size` pages.
    ///
    /// Used after an event mutates an ordering key out of band from
    /// pagination (e.g. a chat's last-message timestamp). Page cursors are
    /// discarded: the re-sorted sequence no longer corresponds to them.
    pub fn resort(
        &mut self,
        key: &QueryKey,
        comparator: &dyn Fn(&Value, &Value) -> Ordering,
        page_size: usize,
    ) {
        if let Some(entry) = self.entries.get_mut(key) {
            resort_entry(entry, comparator, page_size);
        }
    }

    /// `resort` across every entry in a family.
    pub fn resort_family(
        &mut self,
        prefix: &QueryKey,
        comparator: &dyn Fn(&Value, &Value) -> Ordering,
        page_size: usize,
    ) {
        for (_, entry) in self
            .entries
            .iter_mut()
            .filter(|(key, _)| key.matches_prefix(prefix))
        {
            resort_entry(entry, comparator, page_size);
        }
    }
}

fn update_entry_item(
    entry: &mut QueryEntry,
    new_item: &Value,
    matcher: &dyn Fn(&Value, &Value) -> bool,
) {
    for page in &mut entry.pages {
        for item in &mut page.items {
            if matcher(item, new_item) {
                *item = new_item.clone();
            }
        }
    }
}

fn remove_entry_item(
    entry: &mut QueryEntry,
    target: &Value,
    matcher: &dyn Fn(&Value, &Value) -> bool,
) {
    for page in &mut entry.pages {
        page.items.retain(|item| !matcher(item, target));
    }
}

fn resort_entry(
    entry: &mut QueryEntry,
    comparator: &dyn Fn(&Value, &Value) -> Ordering,
    page_size: usize,
) {
    let mut items = flatten(entry);
    items.sort_by(|a, b| comparator(a, b));
    let page_size = page_size.max(1);
    entry.pages = items
        .chunks(page_size)
        .map(|chunk| Page::new(chunk.to_vec()))
        .collect();
    entry.page_params = vec![None; entry.pages.len()];
}

/// Matcher for entity items: plain `id` equality.
pub fn id_matcher(old: &Value, new: &Value) -> bool {
    match (item_id(old), item_id(new)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}
