use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    HasOne,
    BelongsTo,
    HasMany,
    HasManyAndBelongsToMany,
}

impl RelationKind {
    pub fn uses_join_table(self) -> bool {
        matches!(
            self,
            RelationKind::HasMany | RelationKind::HasManyAndBelongsToMany
        )
    }
}

/// A declared edge between two types. Declared once at schema load,
/// immutable during serving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRelation {
    pub relation: RelationKind,
    pub subject: String,
    pub subject_name: String,
    pub object: String,
    pub object_name: String,
}

impl TableRelation {
    /// Column names default to `<type>_id`.
    pub fn new(relation: RelationKind, subject: &str, object: &str) -> TableRelation {
        TableRelation {
            relation,
            subject: subject.to_string(),
            subject_name: format!("{}_id", subject),
            object: object.to_string(),
            object_name: format!("{}_id", object),
        }
    }

    pub fn with_names(
        relation: RelationKind,
        subject: &str,
        subject_name: &str,
        object: &str,
        object_name: &str,
    ) -> TableRelation {
        TableRelation {
            relation,
            subject: subject.to_string(),
            subject_name: subject_name.to_string(),
            object: object.to_string(),
            object_name: object_name.to_string(),
        }
    }

    /// The deterministic link table name:
    /// `<subject>_<subjectName>_has_<object>_<objectName>`.
    pub fn join_table_name(&self) -> String {
        format!(
            "{}_{}_has_{}_{}",
            self.subject, self.subject_name, self.object, self.object_name
        )
    }

    /// The usergroup membership relation every permissionable type carries.
    pub fn usergroup_membership(type_name: &str) -> TableRelation {
        TableRelation::new(
            RelationKind::HasManyAndBelongsToMany,
            type_name,
            "usergroup",
        )
    }
}
