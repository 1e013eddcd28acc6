//! Content model snapshot types.
//!
//! The serde layout follows the content-model export format: content types carry
//! their identifier under `sys.id`, editor interfaces point at their content type
//! through `sys.contentType.sys.id`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

/// One loaded snapshot: content types plus their editor interfaces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub content_types: Vec<RecordType>,
    #[serde(default)]
    pub editor_interfaces: Vec<WidgetAssignment>,
}

/// A content type definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordType {
    /// Stable identifier, never changes between versions
    #[serde(rename = "sys", with = "sys_id")]
    pub id: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Identifier of the field used as the entry title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_field: Option<String>,

    #[serde(default)]
    pub fields: Vec<Field>,
}

impl RecordType {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            display_field: None,
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn field(&self, id: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.id == id)
    }

    /// Type-level metadata, compared as a unit by the record diff.
    pub fn meta(&self) -> RecordMeta {
        RecordMeta {
            name: self.name.clone(),
            description: self.description.clone(),
            display_field: self.display_field.clone(),
        }
    }

    /// Check the field-level invariants: unique identifiers and well-formed fields.
    pub fn validate(&self) -> Result<(), ModelError> {
        self.check_field_ids()?;
        self.fields.iter().try_for_each(|field| field.validate(&self.id))
    }

    /// Reject duplicate field identifiers without checking field definitions.
    pub fn check_field_ids(&self) -> Result<(), ModelError> {
        let mut seen = std::collections::HashSet::with_capacity(self.fields.len());
        match self.fields.iter().find(|field| !seen.insert(field.id.as_str())) {
            Some(field) => Err(ModelError::DuplicateField {
                record: self.id.clone(),
                field: field.id.clone(),
            }),
            None => Ok(()),
        }
    }
}

/// Display name, description and display field of a content type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMeta {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_field: Option<String>,
}

/// A single field of a content type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    /// Stable key used to match fields across snapshots
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(rename = "type")]
    pub field_type: FieldType,

    /// Present iff `field_type` is `Link`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_type: Option<LinkType>,

    /// Present iff `field_type` is `Array`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<ArrayItems>,

    #[serde(default)]
    pub required: bool,

    #[serde(default)]
    pub localized: bool,

    #[serde(default)]
    pub disabled: bool,

    /// Omitted from the delivery API
    #[serde(default)]
    pub omitted: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validations: Vec<Validation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<serde_json::Value>,
}

impl Field {
    pub fn new(id: impl Into<String>, field_type: FieldType) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            field_type,
            link_type: None,
            items: None,
            required: false,
            localized: false,
            disabled: false,
            omitted: false,
            validations: Vec::new(),
            default_value: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn link(mut self, link_type: LinkType) -> Self {
        self.link_type = Some(link_type);
        self
    }

    pub fn items(mut self, items: ArrayItems) -> Self {
        self.items = Some(items);
        self
    }

    pub fn validation(mut self, validation: Validation) -> Self {
        self.validations.push(validation);
        self
    }

    fn validate(&self, record: &str) -> Result<(), ModelError> {
        let malformed = |message: &'static str| ModelError::MalformedField {
            record: record.to_string(),
            field: self.id.clone(),
            message: message.into(),
        };

        match (self.field_type, &self.items) {
            (FieldType::Array, None) => return Err(malformed("array field without item type")),
            (FieldType::Array, Some(items)) => {
                if items.item_type == FieldType::Array {
                    return Err(malformed("arrays of arrays are not supported"));
                }
                if (items.item_type == FieldType::Link) != items.link_type.is_some() {
                    return Err(malformed("array items must carry a link type iff they are links"));
                }
            }
            (_, Some(_)) => return Err(malformed("item type on a non-array field")),
            (_, None) => {}
        }

        match (self.field_type, self.link_type) {
            (FieldType::Link, None) => Err(malformed("link field without link type")),
            (FieldType::Link, Some(_)) => Ok(()),
            (_, Some(_)) => Err(malformed("link type on a non-link field")),
            (_, None) => Ok(()),
        }
    }
}

/// Closed set of value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    /// Short text
    Symbol,
    /// Long text
    Text,
    RichText,
    Integer,
    Number,
    Boolean,
    Date,
    Location,
    Object,
    Array,
    /// Reference to an entry or asset
    Link,
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FieldType::Symbol => "Symbol",
            FieldType::Text => "Text",
            FieldType::RichText => "RichText",
            FieldType::Integer => "Integer",
            FieldType::Number => "Number",
            FieldType::Boolean => "Boolean",
            FieldType::Date => "Date",
            FieldType::Location => "Location",
            FieldType::Object => "Object",
            FieldType::Array => "Array",
            FieldType::Link => "Link",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkType {
    Entry,
    Asset,
}

/// Item definition of an array field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrayItems {
    #[serde(rename = "type")]
    pub item_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_type: Option<LinkType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validations: Vec<Validation>,
}

impl ArrayItems {
    pub fn of(item_type: FieldType) -> Self {
        Self {
            item_type,
            link_type: None,
            validations: Vec::new(),
        }
    }

    pub fn links(link_type: LinkType) -> Self {
        Self {
            item_type: FieldType::Link,
            link_type: Some(link_type),
            validations: Vec::new(),
        }
    }
}

impl PartialEq for ArrayItems {
    fn eq(&self, other: &Self) -> bool {
        self.item_type == other.item_type
            && self.link_type == other.link_type
            && same_validations(&self.validations, &other.validations)
    }
}

/// A validation rule plus its optional custom error message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Validation {
    #[serde(flatten)]
    pub rule: ValidationRule,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<ValidationRule> for Validation {
    fn from(rule: ValidationRule) -> Self {
        Self { rule, message: None }
    }
}

/// Closed set of validation kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValidationRule {
    In(Vec<Scalar>),
    Size(Bounds),
    Range(Bounds),
    Regexp(Pattern),
    ProhibitRegexp(Pattern),
    LinkContentType(Vec<String>),
    LinkMimetypeGroup(Vec<String>),
    Unique(bool),
    DateRange(DateBounds),
    AssetFileSize(Bounds),
    AssetImageDimensions(ImageDimensions),
    EnabledNodeTypes(Vec<String>),
    EnabledMarks(Vec<String>),
    /// Rich text: validations applied to embedded nodes, keyed by node type.
    Nodes(BTreeMap<String, Vec<Validation>>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Integer(i64),
    Float(f64),
    Text(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    pub pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateBounds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageDimensions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<Bounds>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<Bounds>,
}

/// Compare two validation lists as unordered multisets.
pub fn same_validations(a: &[Validation], b: &[Validation]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut used = vec![false; b.len()];
    a.iter().all(|left| {
        let hit = b
            .iter()
            .enumerate()
            .find(|(i, right)| !used[*i] && *right == left)
            .map(|(i, _)| i);
        match hit {
            Some(i) => {
                used[i] = true;
                true
            }
            None => false,
        }
    })
}

/// Editor interface of one content type: field identifier to widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetAssignment {
    #[serde(rename = "sys", with = "content_type_ref")]
    pub record_id: String,
    #[serde(default)]
    pub controls: Vec<WidgetControl>,
}

impl WidgetAssignment {
    pub fn new(record_id: impl Into<String>) -> Self {
        Self {
            record_id: record_id.into(),
            controls: Vec::new(),
        }
    }

    pub fn with_control(mut self, field_id: impl Into<String>, widget: Widget) -> Self {
        self.controls.push(WidgetControl {
            field_id: field_id.into(),
            widget,
        });
        self
    }

    pub fn get(&self, field_id: &str) -> Option<&Widget> {
        self.controls
            .iter()
            .find(|c| c.field_id == field_id)
            .map(|c| &c.widget)
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        let mut seen = std::collections::HashSet::with_capacity(self.controls.len());
        for control in &self.controls {
            if !seen.insert(control.field_id.as_str()) {
                return Err(ModelError::DuplicateWidgetControl {
                    record: self.record_id.clone(),
                    field: control.field_id.clone(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetControl {
    pub field_id: String,
    #[serde(flatten)]
    pub widget: Widget,
}

/// A widget bound to a field, plus its widget-specific settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Widget {
    pub widget_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widget_namespace: Option<WidgetNamespace>,
    /// Key order is irrelevant for equality
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub settings: BTreeMap<String, SettingValue>,
}

impl Widget {
    pub fn builtin(widget_id: impl Into<String>) -> Self {
        Self {
            widget_id: widget_id.into(),
            widget_namespace: Some(WidgetNamespace::Builtin),
            settings: BTreeMap::new(),
        }
    }

    pub fn setting(mut self, key: impl Into<String>, value: SettingValue) -> Self {
        self.settings.insert(key.into(), value);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WidgetNamespace {
    Builtin,
    Extension,
    App,
    EditorBuiltin,
}

impl WidgetNamespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            WidgetNamespace::Builtin => "builtin",
            WidgetNamespace::Extension => "extension",
            WidgetNamespace::App => "app",
            WidgetNamespace::EditorBuiltin => "editor-builtin",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        SettingValue::Text(value.to_string())
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        SettingValue::Bool(value)
    }
}

mod sys_id {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct Sys {
        id: String,
    }

    pub fn serialize<S: Serializer>(id: &str, serializer: S) -> Result<S::Ok, S::Error> {
        Sys { id: id.to_string() }.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Sys::deserialize(deserializer).map(|sys| sys.id)
    }
}

mod content_type_ref {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct Link {
        id: String,
    }

    #[derive(Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Sys {
        content_type: LinkSys,
    }

    #[derive(Serialize, Deserialize)]
    struct LinkSys {
        sys: Link,
    }

    pub fn serialize<S: Serializer>(id: &str, serializer: S) -> Result<S::Ok, S::Error> {
        Sys {
            content_type: LinkSys {
                sys: Link { id: id.to_string() },
            },
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Sys::deserialize(deserializer).map(|sys| sys.content_type.sys.id)
    }
}
