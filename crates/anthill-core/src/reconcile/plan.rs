//! Action plans: one classification per manifest artifact.

use std::collections::BTreeMap;
use std::fmt;

/// What the run will do with one artifact.
///
/// Variant order is execution order: cheap reference-only calls first, then
/// transfers of new content, then in-place updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    /// Content already exists remotely; reference it by digest.
    Attach,
    /// New binary content; create its record and transfer the bytes.
    Upload,
    /// Not declared remotely; create it.
    Create,
    /// Declared remotely with different content or metadata.
    Update,
    /// Remote state already matches.
    Skip,
}

impl Action {
    /// Every action that writes, in execution order.
    pub const WRITES: [Action; 4] = [Action::Attach, Action::Upload, Action::Create, Action::Update];

    pub fn is_write(self) -> bool {
        self != Action::Skip
    }

    pub fn label(self) -> &'static str {
        match self {
            Action::Attach => "attach",
            Action::Upload => "upload",
            Action::Create => "create",
            Action::Update => "update",
            Action::Skip => "skip",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classification of a single artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedItem {
    /// Position of the artifact in the manifest.
    pub index: usize,
    pub name: String,
    pub digest: String,
    pub size: u64,
    pub action: Action,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    items: Vec<PlannedItem>,
}

impl Plan {
    pub fn new(items: Vec<PlannedItem>) -> Self {
        Self { items }
    }

    /// All items, in manifest order.
    pub fn items(&self) -> &[PlannedItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when nothing would be written. Skipped items may still be listed.
    pub fn has_no_writes(&self) -> bool {
        !self.items.iter().any(|item| item.action.is_write())
    }

    pub fn with_action(&self, action: Action) -> impl Iterator<Item = &PlannedItem> {
        self.items.iter().filter(move |item| item.action == action)
    }

    pub fn count(&self, action: Action) -> usize {
        self.with_action(action).count()
    }

    pub fn has(&self, action: Action) -> bool {
        self.with_action(action).next().is_some()
    }

    /// Total bytes of items classified as `action`.
    pub fn total_size(&self, action: Action) -> u64 {
        self.with_action(action).map(|item| item.size).sum()
    }

    /// Items grouped by classification, groups in execution order.
    pub fn groups(&self) -> BTreeMap<Action, Vec<&PlannedItem>> {
        let mut groups: BTreeMap<Action, Vec<&PlannedItem>> = BTreeMap::new();
        for item in &self.items {
            groups.entry(item.action).or_default().push(item);
        }
        groups
    }
}
