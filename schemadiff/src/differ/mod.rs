//! Diff detection between two snapshots of a content type.
//!
//! This module provides:
//! - Record diff: type-level and field-level operations for one content type
//! - Widget diff: editor interface control changes for one content type

mod record;
mod widgets;

pub use record::{diff_record_type, field_patch};
pub use widgets::diff_widget_assignment;
