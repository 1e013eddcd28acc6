//! Structural diff of one content type and its field list.

use std::collections::HashMap;

use crate::errors::ModelError;
use crate::model::{Field, RecordType, same_validations};
use crate::ops::{FieldPatch, MetaPatch, MigrationOperation, OperationBlock};

/// Compare two versions of a content type and produce its operation block.
///
/// Block layout:
/// - new type: create type, then one create per field in declared order
/// - removed type: one delete per field in declared order, then delete type
/// - both present: added fields, changed fields, metadata change, removed fields
///
/// Fields are matched by identifier only. A changed value type is reported as a
/// field change carrying the new type, never as delete plus create.
pub fn diff_record_type(before: Option<&RecordType>, after: Option<&RecordType>) -> Result<OperationBlock, ModelError> {
    match (before, after) {
        (None, None) => Ok(OperationBlock::new("")),
        (None, Some(after)) => {
            after.validate()?;
            Ok(create_block(after))
        }
        (Some(before), None) => {
            // A deletion only needs field ids; a malformed old definition must not block it.
            before.check_field_ids()?;
            Ok(delete_block(before))
        }
        (Some(before), Some(after)) => {
            before.validate()?;
            after.validate()?;
            Ok(modify_block(before, after))
        }
    }
}

fn create_block(after: &RecordType) -> OperationBlock {
    let mut block = OperationBlock::new(after.id.clone());
    block.push(MigrationOperation::CreateRecordType {
        record: after.id.clone(),
        meta: after.meta(),
    });
    for field in &after.fields {
        block.push(MigrationOperation::CreateField {
            record: after.id.clone(),
            field: field.clone(),
        });
    }
    block
}

fn delete_block(before: &RecordType) -> OperationBlock {
    let mut block = OperationBlock::new(before.id.clone());
    for field in &before.fields {
        block.push(MigrationOperation::DeleteField {
            record: before.id.clone(),
            field: field.id.clone(),
        });
    }
    block.push(MigrationOperation::DeleteRecordType {
        record: before.id.clone(),
    });
    block
}

fn modify_block(before: &RecordType, after: &RecordType) -> OperationBlock {
    let record = after.id.clone();
    let mut block = OperationBlock::new(record.clone());

    let old_fields: HashMap<&str, &Field> = before.fields.iter().map(|f| (f.id.as_str(), f)).collect();
    let new_fields: HashMap<&str, &Field> = after.fields.iter().map(|f| (f.id.as_str(), f)).collect();

    // Added fields, in the new declared order
    for field in &after.fields {
        if !old_fields.contains_key(field.id.as_str()) {
            block.push(MigrationOperation::CreateField {
                record: record.clone(),
                field: field.clone(),
            });
        }
    }

    // Changed fields, in the new declared order
    for field in &after.fields {
        if let Some(old) = old_fields.get(field.id.as_str()) {
            let changes = field_patch(old, field);
            if !changes.is_empty() {
                block.push(MigrationOperation::ChangeField {
                    record: record.clone(),
                    field: field.id.clone(),
                    changes,
                });
            }
        }
    }

    let meta = MetaPatch::between(&before.meta(), &after.meta());
    if !meta.is_empty() {
        block.push(MigrationOperation::ChangeRecordTypeMeta {
            record: record.clone(),
            changes: meta,
        });
    }

    // Removed fields, in the old declared order
    for field in &before.fields {
        if !new_fields.contains_key(field.id.as_str()) {
            block.push(MigrationOperation::DeleteField {
                record: record.clone(),
                field: field.id.clone(),
            });
        }
    }

    block
}

/// Attribute-level diff of two versions of the same field.
pub fn field_patch(old: &Field, new: &Field) -> FieldPatch {
    let mut patch = FieldPatch::default();

    if old.name != new.name {
        patch.name = Some(new.name.clone());
    }
    if old.field_type != new.field_type {
        patch.field_type = Some(new.field_type);
    }
    if old.link_type != new.link_type {
        patch.link_type = Some(new.link_type);
    }
    if old.items != new.items {
        patch.items = Some(new.items.clone());
    }
    if old.required != new.required {
        patch.required = Some(new.required);
    }
    if old.localized != new.localized {
        patch.localized = Some(new.localized);
    }
    if old.disabled != new.disabled {
        patch.disabled = Some(new.disabled);
    }
    if old.omitted != new.omitted {
        patch.omitted = Some(new.omitted);
    }
    if !same_validations(&old.validations, &new.validations) {
        patch.validations = Some(new.validations.clone());
    }
    if old.default_value != new.default_value {
        patch.default_value = Some(new.default_value.clone());
    }

    patch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ArrayItems, Bounds, FieldType, LinkType, Validation, ValidationRule};

    fn post(fields: Vec<Field>) -> RecordType {
        let mut record = RecordType::new("post", "Post");
        record.display_field = Some("title".to_string());
        record.fields = fields;
        record
    }

    fn title() -> Field {
        Field::new("title", FieldType::Symbol).named("Title").required(true)
    }

    fn kinds(block: &OperationBlock) -> Vec<String> {
        block.iter().map(|op| op.to_string()).collect()
    }

    #[test]
    fn test_identical_record_is_empty() {
        let record = post(vec![title(), Field::new("body", FieldType::Text)]);
        let block = diff_record_type(Some(&record), Some(&record)).unwrap();
        assert!(block.is_empty());
    }

    #[test]
    fn test_new_record_creates_type_then_fields() {
        let record = post(vec![title(), Field::new("body", FieldType::Text)]);
        let block = diff_record_type(None, Some(&record)).unwrap();
        assert_eq!(
            kinds(&block),
            vec![
                "create-content-type post",
                "create-field post.title",
                "create-field post.body"
            ]
        );
    }

    #[test]
    fn test_removed_record_deletes_fields_then_type() {
        let record = post(vec![title(), Field::new("body", FieldType::Text)]);
        let block = diff_record_type(Some(&record), None).unwrap();
        assert_eq!(
            kinds(&block),
            vec![
                "delete-field post.title",
                "delete-field post.body",
                "delete-content-type post"
            ]
        );
    }

    #[test]
    fn test_added_field_only() {
        let before = post(vec![title()]);
        let after = post(vec![title(), Field::new("body", FieldType::Text).named("Body")]);

        let block = diff_record_type(Some(&before), Some(&after)).unwrap();
        assert_eq!(block.len(), 1);
        match &block.ops[0] {
            MigrationOperation::CreateField { field, .. } => {
                assert_eq!(field.id, "body");
                assert_eq!(field.field_type, FieldType::Text);
                assert!(!field.required);
            }
            other => panic!("expected create-field, got {other}"),
        }
    }

    #[test]
    fn test_added_changed_meta_removed_ordering() {
        let before = post(vec![title(), Field::new("legacy", FieldType::Symbol)]);
        let mut after = post(vec![
            Field::new("slug", FieldType::Symbol),
            title().required(false),
        ]);
        after.display_field = Some("slug".to_string());

        let block = diff_record_type(Some(&before), Some(&after)).unwrap();
        assert_eq!(
            kinds(&block),
            vec![
                "create-field post.slug",
                "change-field post.title",
                "change-content-type post",
                "delete-field post.legacy"
            ]
        );
    }

    #[test]
    fn test_change_field_carries_only_changed_attributes() {
        let before = post(vec![title()]);
        let mut changed = title().required(false);
        changed.localized = true;
        let after = post(vec![changed]);

        let block = diff_record_type(Some(&before), Some(&after)).unwrap();
        let MigrationOperation::ChangeField { changes, .. } = &block.ops[0] else {
            panic!("expected change-field");
        };
        assert_eq!(changes.required, Some(false));
        assert_eq!(changes.localized, Some(true));
        assert_eq!(changes.len(), 2);
        assert!(changes.field_type.is_none());
        assert!(changes.validations.is_none());
    }

    #[test]
    fn test_type_change_is_field_change() {
        let before = post(vec![title(), Field::new("age", FieldType::Symbol)]);
        let after = post(vec![title(), Field::new("age", FieldType::Integer)]);

        let block = diff_record_type(Some(&before), Some(&after)).unwrap();
        assert_eq!(kinds(&block), vec!["change-field post.age"]);
        let MigrationOperation::ChangeField { changes, .. } = &block.ops[0] else {
            panic!("expected change-field");
        };
        assert_eq!(changes.field_type, Some(FieldType::Integer));
    }

    #[test]
    fn test_reordered_validations_are_unchanged() {
        let unique = Validation::from(ValidationRule::Unique(true));
        let size = Validation::from(ValidationRule::Size(Bounds {
            min: None,
            max: Some(80.0),
        }));
        let before = post(vec![title().validation(unique.clone()).validation(size.clone())]);
        let after = post(vec![title().validation(size).validation(unique)]);

        let block = diff_record_type(Some(&before), Some(&after)).unwrap();
        assert!(block.is_empty());
    }

    #[test]
    fn test_array_item_change_detected() {
        let tags = |items: ArrayItems| Field::new("tags", FieldType::Array).items(items);
        let before = post(vec![tags(ArrayItems::of(FieldType::Symbol))]);
        let after = post(vec![tags(ArrayItems::links(LinkType::Entry))]);

        let block = diff_record_type(Some(&before), Some(&after)).unwrap();
        let MigrationOperation::ChangeField { changes, .. } = &block.ops[0] else {
            panic!("expected change-field");
        };
        assert_eq!(changes.items, Some(Some(ArrayItems::links(LinkType::Entry))));
        assert_eq!(changes.len(), 1);
    }

    #[test]
    fn test_field_rename_by_display_name_is_not_a_new_field() {
        let before = post(vec![title()]);
        let after = post(vec![title().named("Headline")]);

        let block = diff_record_type(Some(&before), Some(&after)).unwrap();
        assert_eq!(kinds(&block), vec!["change-field post.title"]);
    }

    #[test]
    fn test_malformed_field_fails_the_record() {
        let before = post(vec![title()]);
        let after = post(vec![title(), Field::new("author", FieldType::Link)]);

        let err = diff_record_type(Some(&before), Some(&after)).unwrap_err();
        assert!(matches!(err, ModelError::MalformedField { ref field, .. } if field == "author"));
    }

    #[test]
    fn test_malformed_old_record_is_still_deleted() {
        let before = post(vec![title(), Field::new("author", FieldType::Link)]);

        let block = diff_record_type(Some(&before), None).unwrap();
        assert_eq!(
            kinds(&block),
            vec![
                "delete-field post.title",
                "delete-field post.author",
                "delete-content-type post"
            ]
        );
    }

    #[test]
    fn test_deleting_duplicate_field_ids_fails() {
        let before = post(vec![title(), title()]);

        let err = diff_record_type(Some(&before), None).unwrap_err();
        assert!(matches!(err, ModelError::DuplicateField { ref field, .. } if field == "title"));
    }

    #[test]
    fn test_both_absent_is_empty() {
        assert!(diff_record_type(None, None).unwrap().is_empty());
    }
}
