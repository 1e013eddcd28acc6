//! Snapshot normalization: identifier-keyed lookup that keeps snapshot order.

use std::collections::HashMap;

use log::debug;

use crate::errors::ModelError;
use crate::model::{RecordType, Snapshot, WidgetAssignment};

/// Immutable, indexed view of one snapshot.
///
/// Duplicate content type or editor interface identifiers are rejected rather
/// than silently overwritten.
#[derive(Debug, Clone, Default)]
pub struct SnapshotIndex {
    order: Vec<String>,
    types: HashMap<String, RecordType>,
    widgets: HashMap<String, WidgetAssignment>,
}

impl SnapshotIndex {
    pub fn new(snapshot: Snapshot) -> Result<Self, ModelError> {
        let mut order = Vec::with_capacity(snapshot.content_types.len());
        let mut types = HashMap::with_capacity(snapshot.content_types.len());

        for record in snapshot.content_types {
            if types.contains_key(&record.id) {
                return Err(ModelError::DuplicateRecordType { id: record.id });
            }
            order.push(record.id.clone());
            types.insert(record.id.clone(), record);
        }

        let mut widgets = HashMap::with_capacity(snapshot.editor_interfaces.len());
        for assignment in snapshot.editor_interfaces {
            if widgets.contains_key(&assignment.record_id) {
                return Err(ModelError::DuplicateWidgetAssignment {
                    id: assignment.record_id,
                });
            }
            assignment.validate()?;
            if !types.contains_key(&assignment.record_id) {
                debug!(
                    "editor interface for '{}' has no content type in this snapshot",
                    assignment.record_id
                );
            }
            widgets.insert(assignment.record_id.clone(), assignment);
        }

        Ok(Self { order, types, widgets })
    }

    /// Content type identifiers in snapshot order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn record(&self, id: &str) -> Option<&RecordType> {
        self.types.get(id)
    }

    pub fn widgets(&self, id: &str) -> Option<&WidgetAssignment> {
        self.widgets.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.types.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Restrict the index to the given content type identifiers.
    ///
    /// An empty allow-list keeps everything.
    pub fn retain(&mut self, allow: &[String]) {
        if allow.is_empty() {
            return;
        }
        let keep = |id: &String| allow.iter().any(|a| a == id);
        self.order.retain(keep);
        self.types.retain(|id, _| keep(id));
        self.widgets.retain(|id, _| keep(id));
    }
}

impl TryFrom<Snapshot> for SnapshotIndex {
    type Error = ModelError;

    fn try_from(snapshot: Snapshot) -> Result<Self, Self::Error> {
        Self::new(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Field, FieldType, Widget};

    fn snapshot(ids: &[&str]) -> Snapshot {
        Snapshot {
            content_types: ids
                .iter()
                .map(|id| RecordType::new(*id, id.to_uppercase()).with_field(Field::new("title", FieldType::Symbol)))
                .collect(),
            editor_interfaces: Vec::new(),
        }
    }

    #[test]
    fn test_keeps_snapshot_order() {
        let index = SnapshotIndex::new(snapshot(&["post", "author", "tag"])).unwrap();
        assert_eq!(index.ids().collect::<Vec<_>>(), vec!["post", "author", "tag"]);
        assert!(index.record("author").is_some());
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_duplicate_content_type_rejected() {
        let err = SnapshotIndex::new(snapshot(&["post", "post"])).unwrap_err();
        assert_eq!(err, ModelError::DuplicateRecordType { id: "post".to_string() });
    }

    #[test]
    fn test_duplicate_editor_interface_rejected() {
        let mut snap = snapshot(&["post"]);
        snap.editor_interfaces.push(WidgetAssignment::new("post"));
        snap.editor_interfaces.push(WidgetAssignment::new("post"));
        assert!(matches!(
            SnapshotIndex::new(snap),
            Err(ModelError::DuplicateWidgetAssignment { .. })
        ));
    }

    #[test]
    fn test_orphan_editor_interface_is_kept_but_vacuous() {
        let mut snap = snapshot(&["post"]);
        snap.editor_interfaces
            .push(WidgetAssignment::new("ghost").with_control("title", Widget::builtin("singleLine")));
        let index = SnapshotIndex::new(snap).unwrap();
        assert!(index.widgets("ghost").is_some());
        assert!(!index.contains("ghost"));
        assert_eq!(index.ids().count(), 1);
    }

    #[test]
    fn test_retain_allow_list() {
        let mut index = SnapshotIndex::new(snapshot(&["post", "author", "tag"])).unwrap();
        index.retain(&[]);
        assert_eq!(index.len(), 3);

        index.retain(&["tag".to_string(), "post".to_string()]);
        assert_eq!(index.ids().collect::<Vec<_>>(), vec!["post", "tag"]);
        assert!(!index.contains("author"));
    }
}
