//! Migration operations and per-content-type operation blocks.

use serde_json::Value;

use crate::model::{ArrayItems, Field, FieldType, LinkType, RecordMeta, Validation, Widget};

/// One atomic schema change.
#[derive(Debug, Clone, PartialEq)]
pub enum MigrationOperation {
    CreateRecordType {
        record: String,
        meta: RecordMeta,
    },
    ChangeRecordTypeMeta {
        record: String,
        changes: MetaPatch,
    },
    DeleteRecordType {
        record: String,
    },
    CreateField {
        record: String,
        field: Field,
    },
    ChangeField {
        record: String,
        field: String,
        changes: FieldPatch,
    },
    DeleteField {
        record: String,
        field: String,
    },
    SetWidgetAssignment {
        record: String,
        field: String,
        widget: Widget,
    },
    ClearWidgetAssignment {
        record: String,
        field: String,
    },
}

impl MigrationOperation {
    pub fn record_id(&self) -> &str {
        match self {
            MigrationOperation::CreateRecordType { record, .. }
            | MigrationOperation::ChangeRecordTypeMeta { record, .. }
            | MigrationOperation::DeleteRecordType { record }
            | MigrationOperation::CreateField { record, .. }
            | MigrationOperation::ChangeField { record, .. }
            | MigrationOperation::DeleteField { record, .. }
            | MigrationOperation::SetWidgetAssignment { record, .. }
            | MigrationOperation::ClearWidgetAssignment { record, .. } => record,
        }
    }

    /// Field targeted by this operation, if any.
    pub fn field_id(&self) -> Option<&str> {
        match self {
            MigrationOperation::CreateField { field, .. } => Some(field.id.as_str()),
            MigrationOperation::ChangeField { field, .. }
            | MigrationOperation::DeleteField { field, .. }
            | MigrationOperation::SetWidgetAssignment { field, .. }
            | MigrationOperation::ClearWidgetAssignment { field, .. } => Some(field.as_str()),
            _ => None,
        }
    }

    pub fn phase(&self) -> Phase {
        match self {
            MigrationOperation::CreateRecordType { .. } => Phase::CreateRecordType,
            MigrationOperation::CreateField { .. } => Phase::CreateField,
            MigrationOperation::ChangeField { .. } => Phase::ChangeField,
            MigrationOperation::ChangeRecordTypeMeta { .. } => Phase::ChangeRecordMeta,
            MigrationOperation::SetWidgetAssignment { .. } | MigrationOperation::ClearWidgetAssignment { .. } => {
                Phase::Widget
            }
            MigrationOperation::DeleteField { .. } => Phase::DeleteField,
            MigrationOperation::DeleteRecordType { .. } => Phase::DeleteRecordType,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            MigrationOperation::CreateRecordType { .. } => "create-content-type",
            MigrationOperation::ChangeRecordTypeMeta { .. } => "change-content-type",
            MigrationOperation::DeleteRecordType { .. } => "delete-content-type",
            MigrationOperation::CreateField { .. } => "create-field",
            MigrationOperation::ChangeField { .. } => "change-field",
            MigrationOperation::DeleteField { .. } => "delete-field",
            MigrationOperation::SetWidgetAssignment { .. } => "set-widget",
            MigrationOperation::ClearWidgetAssignment { .. } => "clear-widget",
        }
    }
}

impl std::fmt::Display for MigrationOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.field_id() {
            Some(field) => write!(f, "{} {}.{}", self.kind(), self.record_id(), field),
            None => write!(f, "{} {}", self.kind(), self.record_id()),
        }
    }
}

/// Execution phase within one content type's block, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    CreateRecordType,
    CreateField,
    ChangeField,
    ChangeRecordMeta,
    Widget,
    DeleteField,
    DeleteRecordType,
}

/// Changed parts of the content type metadata.
///
/// `Some(None)` clears an optional attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub display_field: Option<Option<String>>,
}

impl MetaPatch {
    pub fn between(before: &RecordMeta, after: &RecordMeta) -> Self {
        Self {
            name: changed(&before.name, &after.name),
            description: changed(&before.description, &after.description),
            display_field: changed(&before.display_field, &after.display_field),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.display_field.is_none()
    }
}

/// Changed attributes of a field; absent attributes are unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldPatch {
    pub name: Option<String>,
    pub field_type: Option<FieldType>,
    pub link_type: Option<Option<LinkType>>,
    pub items: Option<Option<ArrayItems>>,
    pub required: Option<bool>,
    pub localized: Option<bool>,
    pub disabled: Option<bool>,
    pub omitted: Option<bool>,
    pub validations: Option<Vec<Validation>>,
    pub default_value: Option<Option<Value>>,
}

impl FieldPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.field_type.is_none()
            && self.link_type.is_none()
            && self.items.is_none()
            && self.required.is_none()
            && self.localized.is_none()
            && self.disabled.is_none()
            && self.omitted.is_none()
            && self.validations.is_none()
            && self.default_value.is_none()
    }

    /// Number of changed attributes.
    pub fn len(&self) -> usize {
        [
            self.name.is_some(),
            self.field_type.is_some(),
            self.link_type.is_some(),
            self.items.is_some(),
            self.required.is_some(),
            self.localized.is_some(),
            self.disabled.is_some(),
            self.omitted.is_some(),
            self.validations.is_some(),
            self.default_value.is_some(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count()
    }
}

fn changed<T: PartialEq + Clone>(before: &T, after: &T) -> Option<T> {
    (before != after).then(|| after.clone())
}

/// The ordered operations for one content type, emitted as a unit.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationBlock {
    pub record: String,
    pub ops: Vec<MigrationOperation>,
}

impl OperationBlock {
    pub fn new(record: impl Into<String>) -> Self {
        Self {
            record: record.into(),
            ops: Vec::new(),
        }
    }

    pub fn push(&mut self, op: MigrationOperation) {
        debug_assert_eq!(op.record_id(), self.record);
        self.ops.push(op);
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MigrationOperation> {
        self.ops.iter()
    }
}

impl<'a> IntoIterator for &'a OperationBlock {
    type Item = &'a MigrationOperation;
    type IntoIter = std::slice::Iter<'a, MigrationOperation>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.iter()
    }
}
