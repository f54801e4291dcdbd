//! Partial update documents and mutation outcomes.

use bson::{Bson, Document, doc};

/// A partial update: fields to set and fields to remove.
///
/// Built by hand for bulk updates, or computed by [`diff`](crate::encoding::diff)
/// when the mapper updates a record it has seen before.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    /// Fields to assign, with their new values.
    pub set: Document,
    /// Fields to remove.
    pub unset: Vec<String>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns `value` to `field`.
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        let field = field.into();
        self.unset.retain(|name| name != &field);
        self.set.insert(field, value.into());
        self
    }

    /// Removes `field`.
    pub fn unset(mut self, field: impl Into<String>) -> Self {
        let field = field.into();
        self.set.remove(&field);
        if !self.unset.contains(&field) {
            self.unset.push(field);
        }
        self
    }

    /// Whether the update changes nothing.
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.unset.is_empty()
    }

    /// Renders the update with `$set` and `$unset` operators, omitting empty ones.
    pub fn to_document(&self) -> Document {
        let mut document = Document::new();

        if !self.set.is_empty() {
            document.insert("$set", self.set.clone());
        }

        if !self.unset.is_empty() {
            let unset: Document = self
                .unset
                .iter()
                .map(|field| (field.clone(), Bson::String(String::new())))
                .collect();
            document.insert("$unset", unset);
        }

        document
    }

    /// Applies the update to `document`, returning whether anything changed.
    pub fn apply(&self, document: &mut Document) -> bool {
        let mut modified = false;

        for (field, value) in &self.set {
            if document.get(field) != Some(value) {
                document.insert(field.clone(), value.clone());
                modified = true;
            }
        }

        for field in &self.unset {
            modified |= document.remove(field).is_some();
        }

        modified
    }
}

impl From<Document> for Update {
    /// Treats every field of `document` as a field to set.
    fn from(document: Document) -> Self {
        Update { set: document, unset: Vec::new() }
    }
}

/// Counts reported by a mutating backend call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeInfo {
    /// Documents matched by the selector.
    pub matched: u64,
    /// Documents actually changed.
    pub modified: u64,
    /// Documents removed.
    pub removed: u64,
}

impl ChangeInfo {
    pub fn updated(matched: u64, modified: u64) -> Self {
        ChangeInfo { matched, modified, removed: 0 }
    }

    pub fn removed(removed: u64) -> Self {
        ChangeInfo { matched: removed, modified: 0, removed }
    }
}
