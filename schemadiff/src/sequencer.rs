//! Global ordering of operation blocks.

use crate::differ::{diff_record_type, diff_widget_assignment};
use crate::errors::ModelError;
use crate::index::SnapshotIndex;
use crate::ops::OperationBlock;

/// Which top-level pass a content type belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    /// Present in the target snapshot: created or modified
    Upsert,
    /// Present only in the source snapshot: deleted
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedRecord {
    pub record: String,
    pub pass: Pass,
}

/// Every content type of `after` in its order, then every content type only in
/// `before` in its order. Deletions run last so that references to a deleted
/// type dangle for as short a time as possible.
pub fn global_order(before: &SnapshotIndex, after: &SnapshotIndex) -> Vec<PlannedRecord> {
    let upserts = after.ids().map(|id| PlannedRecord {
        record: id.to_string(),
        pass: Pass::Upsert,
    });
    let deletes = before.ids().filter(|id| !after.contains(id)).map(|id| PlannedRecord {
        record: id.to_string(),
        pass: Pass::Delete,
    });
    upserts.chain(deletes).collect()
}

/// Merge a record block and its widget block into the per-record emission order:
/// type create, field creates, field changes, type metadata, widgets, field
/// deletes, type delete. Order within each phase is preserved.
pub fn merge_record(record: OperationBlock, widgets: OperationBlock) -> OperationBlock {
    let mut merged = OperationBlock::new(if record.record.is_empty() {
        widgets.record.clone()
    } else {
        record.record.clone()
    });
    merged.ops = record.ops;
    merged.ops.extend(widgets.ops);
    merged.ops.sort_by_key(|op| op.phase());
    merged
}

/// Compute the complete block for one planned content type.
///
/// Editor interfaces of deleted types are not diffed; the type goes away with
/// its editor layout.
pub fn block_for(
    before: &SnapshotIndex,
    after: &SnapshotIndex,
    planned: &PlannedRecord,
) -> Result<OperationBlock, ModelError> {
    let id = planned.record.as_str();
    match planned.pass {
        Pass::Upsert => {
            let record = diff_record_type(before.record(id), after.record(id))?;
            let widgets = diff_widget_assignment(id, before.widgets(id), after.widgets(id));
            Ok(merge_record(record, widgets))
        }
        Pass::Delete => diff_record_type(before.record(id), None),
    }
}

/// Lay per-record blocks on the global timeline, keeping submission order and
/// dropping blocks with nothing to do.
pub fn sequence(per_record: Vec<(String, OperationBlock)>) -> Vec<OperationBlock> {
    per_record
        .into_iter()
        .filter(|(_, block)| !block.is_empty())
        .map(|(id, block)| {
            debug_assert_eq!(id, block.record);
            block
        })
        .collect()
}
