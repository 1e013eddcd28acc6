//! Editor interface (widget assignment) diff.

use crate::model::WidgetAssignment;
use crate::ops::{MigrationOperation, OperationBlock};

/// Compare the widget assignments of one content type.
///
/// A missing side is treated as an empty mapping, so a new editor interface
/// only produces sets and a vanished one only produces clears.
pub fn diff_widget_assignment(
    record_id: &str,
    before: Option<&WidgetAssignment>,
    after: Option<&WidgetAssignment>,
) -> OperationBlock {
    let mut block = OperationBlock::new(record_id);

    if let Some(after) = after {
        for control in &after.controls {
            let unchanged = before
                .and_then(|b| b.get(&control.field_id))
                .is_some_and(|old| *old == control.widget);
            if !unchanged {
                block.push(MigrationOperation::SetWidgetAssignment {
                    record: record_id.to_string(),
                    field: control.field_id.clone(),
                    widget: control.widget.clone(),
                });
            }
        }
    }

    if let Some(before) = before {
        for control in &before.controls {
            let still_assigned = after.is_some_and(|a| a.get(&control.field_id).is_some());
            if !still_assigned {
                block.push(MigrationOperation::ClearWidgetAssignment {
                    record: record_id.to_string(),
                    field: control.field_id.clone(),
                });
            }
        }
    }

    block
}
