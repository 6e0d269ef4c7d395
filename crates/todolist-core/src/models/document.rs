//! Typed-field documents as exchanged with the task store.
//!
//! The store does not accept a task as one structured value: every field is
//! wrapped individually with its type (`{"text": {"stringValue": "..."}}`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Priority, Task, TaskId};

pub const FIELD_TEXT: &str = "text";
pub const FIELD_PRIORITY: &str = "priority";
pub const FIELD_COMPLETED: &str = "isCompleted";
pub const FIELD_OWNER: &str = "userId";

/// A single typed field. Unknown value kinds deserialize to an empty value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValue {
    #[serde(rename = "stringValue", default, skip_serializing_if = "Option::is_none")]
    pub string_value: Option<String>,
    #[serde(rename = "booleanValue", default, skip_serializing_if = "Option::is_none")]
    pub boolean_value: Option<bool>,
}

impl FieldValue {
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            string_value: Some(value.into()),
            boolean_value: None,
        }
    }

    pub fn boolean(value: bool) -> Self {
        Self {
            string_value: None,
            boolean_value: Some(value),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    /// Full resource name; the document id is its last path segment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl Document {
    /// Body for creating a task. The id is left for the store to assign.
    pub fn from_task(task: &Task) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(FIELD_TEXT.to_string(), FieldValue::string(&task.text));
        fields.insert(
            FIELD_PRIORITY.to_string(),
            FieldValue::string(task.priority.as_str()),
        );
        fields.insert(FIELD_COMPLETED.to_string(), FieldValue::boolean(task.completed));
        if let Some(ref owner) = task.owner_id {
            fields.insert(FIELD_OWNER.to_string(), FieldValue::string(owner));
        }
        Self { name: None, fields }
    }

    /// Body for a partial update touching only the completion flag
    pub fn completion_patch(completed: bool) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(FIELD_COMPLETED.to_string(), FieldValue::boolean(completed));
        Self { name: None, fields }
    }

    pub fn id(&self) -> Option<&str> {
        self.name
            .as_deref()
            .and_then(|name| name.rsplit('/').next())
            .filter(|id| !id.is_empty())
    }

    fn string_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(|v| v.string_value.as_deref())
    }

    pub fn to_task(&self) -> Result<Task, String> {
        let id = self.id().ok_or("Document has no name")?;
        let text = self
            .string_field(FIELD_TEXT)
            .ok_or_else(|| format!("Document {} has no text", id))?;
        let priority: Priority = self
            .string_field(FIELD_PRIORITY)
            .ok_or_else(|| format!("Document {} has no priority", id))?
            .parse()?;
        let completed = self
            .fields
            .get(FIELD_COMPLETED)
            .and_then(|v| v.boolean_value)
            .unwrap_or(false);

        Ok(Task {
            id: TaskId::new(id),
            text: text.to_string(),
            priority,
            completed,
            owner_id: self.string_field(FIELD_OWNER).map(str::to_string),
        })
    }
}
