use serde::{Deserialize, Serialize};

use crate::errors::CoreError;
use crate::models::ReferenceId;

/// The `action` table row joined with its world: schema JSON is kept as-is
/// and parsed lazily into an [`Action`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRow {
    pub name: String,
    pub label: String,
    pub on_type: String,
    pub reference_id: ReferenceId,
    pub action_schema: String,
    pub instance_optional: bool,
}

impl ActionRow {
    pub fn parse(&self) -> Result<Action, CoreError> {
        let mut action: Action = serde_json::from_str(&self.action_schema)?;
        action.name = self.name.clone();
        action.label = self.label.clone();
        action.on_type = self.on_type.clone();
        action.reference_id = self.reference_id;
        action.instance_optional = self.instance_optional;
        Ok(action)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub on_type: String,
    #[serde(skip)]
    pub reference_id: ReferenceId,
    #[serde(default)]
    pub instance_optional: bool,
    #[serde(default)]
    pub in_fields: Vec<serde_json::Value>,
    #[serde(default)]
    pub out_fields: Vec<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_overrides_identity_from_row() {
        let row = ActionRow {
            name: "publish".to_string(),
            label: "Publish".to_string(),
            on_type: "blog".to_string(),
            reference_id: ReferenceId::new_v4(),
            action_schema: r#"{"name":"stale","in_fields":[{"name":"title"}],"out_fields":[]}"#
                .to_string(),
            instance_optional: true,
        };

        let action = row.parse().unwrap();
        assert_eq!(action.name, "publish");
        assert_eq!(action.label, "Publish");
        assert_eq!(action.on_type, "blog");
        assert_eq!(action.reference_id, row.reference_id);
        assert!(action.instance_optional);
        assert_eq!(action.in_fields.len(), 1);
    }

    #[test]
    fn test_parse_rejects_malformed_schema() {
        let row = ActionRow {
            name: "publish".to_string(),
            label: "Publish".to_string(),
            on_type: "blog".to_string(),
            reference_id: ReferenceId::null(),
            action_schema: "not json".to_string(),
            instance_optional: false,
        };
        assert!(matches!(row.parse(), Err(CoreError::DecodeError(_))));
    }
}
