use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::{AuthPermission, TableRelation};

/// Where a foreign-key cell points: another table of this store, or a file
/// manifest synced from a cloud store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Table,
    CloudStore,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub data_source: DataSource,
    /// The referenced table for `Table` sources; the column itself for
    /// `CloudStore` sources.
    pub namespace: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Integer,
    Real,
    Text,
    DateTime,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub column_name: String,
    pub column_type: ColumnType,
    pub foreign_key: Option<ForeignKey>,
}

impl ColumnInfo {
    pub fn new(column_name: &str, column_type: ColumnType) -> ColumnInfo {
        ColumnInfo {
            column_name: column_name.to_string(),
            column_type,
            foreign_key: None,
        }
    }

    /// An integer column referencing a row of `namespace`.
    pub fn reference(column_name: &str, namespace: &str) -> ColumnInfo {
        ColumnInfo {
            column_name: column_name.to_string(),
            column_type: ColumnType::Integer,
            foreign_key: Some(ForeignKey {
                data_source: DataSource::Table,
                namespace: namespace.to_string(),
            }),
        }
    }

    /// A column holding a JSON manifest of cloud-store files.
    pub fn file(column_name: &str) -> ColumnInfo {
        ColumnInfo {
            column_name: column_name.to_string(),
            column_type: ColumnType::Json,
            foreign_key: Some(ForeignKey {
                data_source: DataSource::CloudStore,
                namespace: column_name.to_string(),
            }),
        }
    }

    pub fn is_foreign_key(&self) -> bool {
        self.foreign_key.is_some()
    }
}

/// Descriptor of one type: its columns, the relations it participates in,
/// and its defaults. Link tables carry the explicit `is_join_table` flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableInfo {
    pub table_name: String,
    pub columns: Vec<ColumnInfo>,
    pub relations: Vec<TableRelation>,
    pub default_permission: AuthPermission,
    pub is_join_table: bool,
}

impl TableInfo {
    pub fn new(table_name: &str) -> TableInfo {
        TableInfo {
            table_name: table_name.to_string(),
            columns: vec![
                ColumnInfo::new("id", ColumnType::Integer),
                ColumnInfo::new("reference_id", ColumnType::Text),
                ColumnInfo::new("permission", ColumnType::Integer),
                ColumnInfo::new("created_at", ColumnType::DateTime),
            ],
            relations: vec![],
            default_permission: AuthPermission::DEFAULT_PERMISSION,
            is_join_table: false,
        }
    }

    pub fn with_column(mut self, column: ColumnInfo) -> TableInfo {
        self.columns.push(column);
        self
    }

    pub fn with_default_permission(mut self, permission: AuthPermission) -> TableInfo {
        self.default_permission = permission;
        self
    }

    pub fn as_join_table(mut self) -> TableInfo {
        self.is_join_table = true;
        self
    }

    pub fn column(&self, column_name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.column_name == column_name)
    }

    pub fn has_column(&self, column_name: &str) -> bool {
        self.column(column_name).is_some()
    }

    /// True when this type is the subject of a join-backed relation to
    /// `object`.
    pub fn has_many(&self, object: &str) -> bool {
        self.relations.iter().any(|r| {
            r.subject == self.table_name && r.object == object && r.relation.uses_join_table()
        })
    }

    /// The descriptor of the link table backing `relation`.
    pub fn join_table_for(relation: &TableRelation) -> TableInfo {
        TableInfo::new(&relation.join_table_name())
            .with_column(ColumnInfo::reference(&relation.subject_name, &relation.subject))
            .with_column(ColumnInfo::reference(&relation.object_name, &relation.object))
            .as_join_table()
    }
}

/// The per-type relation and column metadata, loaded once at schema time and
/// immutable while serving.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    tables: HashMap<String, TableInfo>,
}

impl SchemaRegistry {
    pub fn new() -> SchemaRegistry {
        SchemaRegistry {
            tables: HashMap::new(),
        }
    }

    pub fn register(&mut self, table: TableInfo) {
        self.tables.insert(table.table_name.clone(), table);
    }

    /// Attach a relation to both endpoints. Join-backed relations also
    /// register the link table descriptor.
    pub fn add_relation(&mut self, relation: TableRelation) {
        if relation.relation.uses_join_table() {
            let join = TableInfo::join_table_for(&relation);
            self.tables.entry(join.table_name.clone()).or_insert(join);
        }
        if let Some(subject) = self.tables.get_mut(&relation.subject) {
            subject.relations.push(relation.clone());
        }
        if relation.subject != relation.object {
            if let Some(object) = self.tables.get_mut(&relation.object) {
                object.relations.push(relation);
            }
        }
    }

    pub fn get(&self, table_name: &str) -> Option<&TableInfo> {
        self.tables.get(table_name)
    }

    pub fn has_many(&self, table_name: &str, object: &str) -> bool {
        self.get(table_name)
            .map(|t| t.has_many(object))
            .unwrap_or(false)
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableInfo> {
        self.tables.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RelationKind;

    #[test]
    fn test_registry_attaches_relations_to_both_endpoints() {
        let mut registry = SchemaRegistry::new();
        registry.register(TableInfo::new("author"));
        registry.register(TableInfo::new("post"));
        registry.add_relation(TableRelation::new(RelationKind::HasMany, "author", "post"));

        assert_eq!(registry.get("author").unwrap().relations.len(), 1);
        assert_eq!(registry.get("post").unwrap().relations.len(), 1);
        assert!(registry.has_many("author", "post"));
        assert!(!registry.has_many("post", "author"));

        let join = registry.get("author_author_id_has_post_post_id").unwrap();
        assert!(join.is_join_table);
        assert!(join.has_column("author_id"));
        assert!(join.has_column("post_id"));
    }

    #[test]
    fn test_default_columns_present() {
        let table = TableInfo::new("document");
        for column in ["id", "reference_id", "permission", "created_at"] {
            assert!(table.has_column(column), "missing {}", column);
        }
        assert!(!table.has_column("user_account_id"));
    }

    #[test]
    fn test_belongs_to_is_not_has_many() {
        let mut registry = SchemaRegistry::new();
        registry.register(TableInfo::new("post"));
        registry.register(TableInfo::new("author"));
        registry.add_relation(TableRelation::new(RelationKind::BelongsTo, "post", "author"));
        assert!(!registry.has_many("post", "author"));
    }
}
