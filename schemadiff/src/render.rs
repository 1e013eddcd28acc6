//! Rendering of migration operations as `contentful-migration` statements.

use std::fmt::Write;

use serde::Serialize;

use crate::errors::RenderError;
use crate::model::{Field, WidgetNamespace};
use crate::ops::{FieldPatch, MetaPatch, MigrationOperation};

/// Turns one operation into one chunk of output. Must be pure.
pub trait Renderer {
    fn render(&self, op: &MigrationOperation) -> Result<String, RenderError>;
}

/// Output language of generated migration files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flavor {
    #[default]
    Js,
    Ts,
}

impl Flavor {
    pub fn extension(&self) -> &'static str {
        match self {
            Flavor::Js => "js",
            Flavor::Ts => "ts",
        }
    }
}

/// Preamble and postamble written around all blocks of one sink.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Framing {
    pub header: String,
    pub footer: String,
}

impl Framing {
    pub fn for_flavor(flavor: Flavor, from: &str, to: &str) -> Self {
        let comment = format!("// Generated by schemadiff\n// from {from}\n// to   {to}");
        match flavor {
            Flavor::Ts => Self {
                header: format!(
                    "import Migration, {{ MigrationFunction }} from 'contentful-migration'\n\n{comment}\nexport = function (migration: Migration, {{ makeRequest, spaceId, accessToken }}) {{\n"
                ),
                footer: "\n} as MigrationFunction\n".to_string(),
            },
            Flavor::Js => Self {
                header: format!(
                    "{comment}\nmodule.exports = function (migration, {{ makeRequest, spaceId, accessToken }}) {{\n"
                ),
                footer: "\n}\n".to_string(),
            },
        }
    }
}

/// Renders each operation as a standalone, chained `migration.*` statement.
#[derive(Debug, Clone, Copy, Default)]
pub struct MigrationScriptRenderer;

impl Renderer for MigrationScriptRenderer {
    fn render(&self, op: &MigrationOperation) -> Result<String, RenderError> {
        let record = op.record_id();
        let id = literal(record, &record)?;
        let mut out = String::new();

        match op {
            MigrationOperation::CreateRecordType { meta, .. } => {
                let _ = writeln!(out, "\n  migration.createContentType({id}, {});", literal(record, meta)?);
            }
            MigrationOperation::ChangeRecordTypeMeta { changes, .. } => {
                let setters = meta_setters(record, changes)?;
                if setters.is_empty() {
                    return Err(unsupported(op, record, "empty metadata patch"));
                }
                let _ = writeln!(out, "\n  migration.editContentType({id}){setters};");
            }
            MigrationOperation::DeleteRecordType { .. } => {
                let _ = writeln!(out, "\n  migration.deleteContentType({id});");
            }
            MigrationOperation::CreateField { field, .. } => {
                let _ = write!(
                    out,
                    "\n  migration.editContentType({id}).createField({})",
                    literal(record, &field.id)?
                );
                out.push_str(&create_setters(record, field)?);
                out.push_str(";\n");
            }
            MigrationOperation::ChangeField { field, changes, .. } => {
                let setters = patch_setters(record, changes)?;
                if setters.is_empty() {
                    return Err(unsupported(op, record, "empty field patch"));
                }
                let _ = writeln!(
                    out,
                    "\n  migration.editContentType({id}).editField({}){setters};",
                    literal(record, field)?
                );
            }
            MigrationOperation::DeleteField { field, .. } => {
                let _ = writeln!(
                    out,
                    "\n  migration.editContentType({id}).deleteField({});",
                    literal(record, field)?
                );
            }
            MigrationOperation::SetWidgetAssignment { field, widget, .. } => {
                let namespace = widget.widget_namespace.unwrap_or(WidgetNamespace::Builtin);
                let _ = writeln!(
                    out,
                    "\n  migration.editContentType({id}).changeFieldControl({}, {}, {}, {});",
                    literal(record, field)?,
                    literal(record, namespace.as_str())?,
                    literal(record, &widget.widget_id)?,
                    literal(record, &widget.settings)?
                );
            }
            MigrationOperation::ClearWidgetAssignment { field, .. } => {
                let _ = writeln!(
                    out,
                    "\n  migration.editContentType({id}).resetFieldControl({});",
                    literal(record, field)?
                );
            }
        }

        Ok(out)
    }
}

fn create_setters(record: &str, field: &Field) -> Result<String, RenderError> {
    let mut out = String::new();
    setter(&mut out, record, "name", &field.name)?;
    setter(&mut out, record, "type", &field.field_type.to_string())?;
    if let Some(link_type) = &field.link_type {
        setter(&mut out, record, "linkType", link_type)?;
    }
    if let Some(items) = &field.items {
        setter(&mut out, record, "items", items)?;
    }
    setter(&mut out, record, "localized", &field.localized)?;
    setter(&mut out, record, "required", &field.required)?;
    setter(&mut out, record, "validations", &field.validations)?;
    setter(&mut out, record, "disabled", &field.disabled)?;
    setter(&mut out, record, "omitted", &field.omitted)?;
    if let Some(default_value) = &field.default_value {
        setter(&mut out, record, "defaultValue", default_value)?;
    }
    Ok(out)
}

fn patch_setters(record: &str, patch: &FieldPatch) -> Result<String, RenderError> {
    let mut out = String::new();
    if let Some(name) = &patch.name {
        setter(&mut out, record, "name", name)?;
    }
    if let Some(field_type) = &patch.field_type {
        setter(&mut out, record, "type", &field_type.to_string())?;
    }
    if let Some(Some(link_type)) = &patch.link_type {
        setter(&mut out, record, "linkType", link_type)?;
    }
    if let Some(Some(items)) = &patch.items {
        setter(&mut out, record, "items", items)?;
    }
    if let Some(localized) = &patch.localized {
        setter(&mut out, record, "localized", localized)?;
    }
    if let Some(required) = &patch.required {
        setter(&mut out, record, "required", required)?;
    }
    if let Some(validations) = &patch.validations {
        setter(&mut out, record, "validations", validations)?;
    }
    if let Some(disabled) = &patch.disabled {
        setter(&mut out, record, "disabled", disabled)?;
    }
    if let Some(omitted) = &patch.omitted {
        setter(&mut out, record, "omitted", omitted)?;
    }
    if let Some(default_value) = &patch.default_value {
        setter(&mut out, record, "defaultValue", default_value)?;
    }
    Ok(out)
}

fn meta_setters(record: &str, patch: &MetaPatch) -> Result<String, RenderError> {
    let mut out = String::new();
    if let Some(name) = &patch.name {
        setter(&mut out, record, "name", name)?;
    }
    if let Some(description) = &patch.description {
        setter(&mut out, record, "description", &description.as_deref().unwrap_or(""))?;
    }
    if let Some(display_field) = &patch.display_field {
        setter(&mut out, record, "displayField", display_field)?;
    }
    Ok(out)
}

fn setter<T: Serialize + ?Sized>(out: &mut String, record: &str, name: &str, value: &T) -> Result<(), RenderError> {
    let _ = write!(out, "\n    .{name}({})", literal(record, value)?);
    Ok(())
}

/// Encode a value as a script literal; JSON is valid JavaScript.
fn literal<T: Serialize + ?Sized>(record: &str, value: &T) -> Result<String, RenderError> {
    serde_json::to_string(value).map_err(|err| RenderError::Encode {
        record: record.to_string(),
        message: err.to_string(),
    })
}

fn unsupported(op: &MigrationOperation, record: &str, reason: &'static str) -> RenderError {
    RenderError::Unsupported {
        kind: op.kind(),
        record: record.to_string(),
        reason: reason.into(),
    }
}
