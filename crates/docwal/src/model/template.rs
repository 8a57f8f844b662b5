use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::id::newtype_id;

newtype_id!(
    /// A credential template ID.
    TemplateId
);

pub const DEFAULT_TEMPLATE_VERSION: &str = "1.0";

/// Describes one field of a template schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FieldDescriptor {
    pub fn new(field_type: impl Into<String>) -> Self {
        Self {
            field_type: field_type.into(),
            required: false,
            label: None,
            extra: Map::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Template {
    pub id: TemplateId,
    pub name: String,
    pub description: Option<String>,
    pub credential_type: Option<String>,
    #[serde(default)]
    pub schema: BTreeMap<String, FieldDescriptor>,
    pub version: Option<String>,
    pub is_active: Option<bool>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Payload for creating a template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTemplate {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub credential_type: String,
    #[serde(default)]
    pub schema: BTreeMap<String, FieldDescriptor>,
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    DEFAULT_TEMPLATE_VERSION.to_string()
}

impl NewTemplate {
    pub fn new(name: impl Into<String>, credential_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            credential_type: credential_type.into(),
            schema: BTreeMap::new(),
            version: default_version(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn field(mut self, name: impl Into<String>, descriptor: FieldDescriptor) -> Self {
        self.schema.insert(name.into(), descriptor);
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }
}

/// Partial update of a template. Only fields that are set are sent.
///
/// The service creates a new template version when the schema changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<BTreeMap<String, FieldDescriptor>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl TemplateUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.credential_type.is_none()
            && self.schema.is_none()
            && self.version.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_template_payload() {
        let tpl = NewTemplate::new("Bachelor Degree", "diploma")
            .description("Undergraduate degree")
            .field("student_name", FieldDescriptor::new("string").required().label("Student Name"))
            .field("gpa", FieldDescriptor::new("number"));

        let json = serde_json::to_value(&tpl).expect("failed to serialize template");
        assert_eq!(json["version"], "1.0");
        assert_eq!(json["schema"]["student_name"]["type"], "string");
        assert_eq!(json["schema"]["student_name"]["required"], true);
        assert_eq!(json["schema"]["gpa"]["required"], false);
        assert!(json["schema"]["gpa"].get("label").is_none());
    }

    #[test]
    fn test_update_sends_only_set_fields() {
        let update = TemplateUpdate {
            description: Some("new".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&update).expect("failed to serialize update");
        assert_eq!(json, serde_json::json!({"description": "new"}));
        assert!(TemplateUpdate::default().is_empty());
    }
}
