#![allow(dead_code)]

pub mod loader;

use rusqlite::{params, Connection};

use crate::db::{init_pool, DbPool};
use crate::models::{
    AuthPermission, ColumnInfo, ColumnType, ReferenceId, SchemaRegistry, TableInfo, TableRelation,
};
use crate::resource::DataResource;

pub const BASE_SCHEMA: &str = "
CREATE TABLE user_account (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    reference_id TEXT,
    email TEXT,
    password TEXT,
    name TEXT,
    permission INTEGER DEFAULT 0,
    user_account_id INTEGER,
    created_at TEXT DEFAULT CURRENT_TIMESTAMP
);
CREATE TABLE usergroup (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    reference_id TEXT,
    name TEXT,
    permission INTEGER DEFAULT 0,
    created_at TEXT DEFAULT CURRENT_TIMESTAMP
);
CREATE TABLE user_account_user_account_id_has_usergroup_usergroup_id (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    reference_id TEXT,
    user_account_id INTEGER,
    usergroup_id INTEGER,
    permission INTEGER DEFAULT 0,
    created_at TEXT DEFAULT CURRENT_TIMESTAMP
);
CREATE TABLE world (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    reference_id TEXT,
    table_name TEXT,
    permission INTEGER DEFAULT 0,
    default_permission INTEGER DEFAULT 0,
    user_account_id INTEGER,
    created_at TEXT DEFAULT CURRENT_TIMESTAMP
);
CREATE TABLE world_world_id_has_usergroup_usergroup_id (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    reference_id TEXT,
    world_id INTEGER,
    usergroup_id INTEGER,
    permission INTEGER DEFAULT 0,
    created_at TEXT DEFAULT CURRENT_TIMESTAMP
);
CREATE TABLE action (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    reference_id TEXT,
    action_name TEXT,
    label TEXT,
    world_id INTEGER,
    action_schema TEXT,
    instance_optional INTEGER DEFAULT 0,
    permission INTEGER DEFAULT 0,
    user_account_id INTEGER,
    created_at TEXT DEFAULT CURRENT_TIMESTAMP
);
CREATE TABLE action_action_id_has_usergroup_usergroup_id (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    reference_id TEXT,
    action_id INTEGER,
    usergroup_id INTEGER,
    permission INTEGER DEFAULT 0,
    created_at TEXT DEFAULT CURRENT_TIMESTAMP
);
";

pub fn base_registry() -> SchemaRegistry {
    let mut registry = SchemaRegistry::new();
    registry.register(
        TableInfo::new("user_account")
            .with_column(ColumnInfo::new("email", ColumnType::Text))
            .with_column(ColumnInfo::new("password", ColumnType::Text))
            .with_column(ColumnInfo::new("name", ColumnType::Text))
            .with_column(ColumnInfo::reference("user_account_id", "user_account")),
    );
    registry.register(TableInfo::new("usergroup").with_column(ColumnInfo::new(
        "name",
        ColumnType::Text,
    )));
    registry.register(
        TableInfo::new("world")
            .with_column(ColumnInfo::new("table_name", ColumnType::Text))
            .with_column(ColumnInfo::new("default_permission", ColumnType::Integer))
            .with_column(ColumnInfo::reference("user_account_id", "user_account")),
    );
    registry.register(
        TableInfo::new("action")
            .with_column(ColumnInfo::new("action_name", ColumnType::Text))
            .with_column(ColumnInfo::new("label", ColumnType::Text))
            .with_column(ColumnInfo::reference("world_id", "world"))
            .with_column(ColumnInfo::new("action_schema", ColumnType::Text))
            .with_column(ColumnInfo::new("instance_optional", ColumnType::Integer))
            .with_column(ColumnInfo::reference("user_account_id", "user_account")),
    );
    registry.add_relation(TableRelation::usergroup_membership("user_account"));
    registry.add_relation(TableRelation::usergroup_membership("world"));
    registry.add_relation(TableRelation::usergroup_membership("action"));
    registry
}

/// An in-memory database with the base schema plus `extra_schema`. The pool
/// holds a single connection, so sequential checkouts see the same store.
pub fn test_resource(extra_schema: &str, registry: SchemaRegistry) -> DataResource {
    let pool: DbPool = init_pool(":memory:", 1);
    {
        let conn = pool.get().unwrap();
        conn.execute_batch(BASE_SCHEMA).unwrap();
        if !extra_schema.is_empty() {
            conn.execute_batch(extra_schema).unwrap();
        }
    }
    DataResource::new(pool, registry)
}

pub fn insert_user(conn: &Connection, email: &str) -> (i64, ReferenceId) {
    let reference = ReferenceId::new_v4();
    conn.execute(
        "INSERT INTO user_account (reference_id, email, password, name) VALUES (?1, ?2, 'secret-hash', ?2)",
        params![reference.to_string(), email],
    )
    .unwrap();
    (conn.last_insert_rowid(), reference)
}

pub fn insert_group(conn: &Connection, name: &str) -> (i64, ReferenceId) {
    let reference = ReferenceId::new_v4();
    conn.execute(
        "INSERT INTO usergroup (reference_id, name, permission) VALUES (?1, ?2, ?3)",
        params![
            reference.to_string(),
            name,
            AuthPermission::DEFAULT_PERMISSION.0
        ],
    )
    .unwrap();
    (conn.last_insert_rowid(), reference)
}

pub fn insert_world(
    conn: &Connection,
    table_name: &str,
    permission: AuthPermission,
    owner: Option<i64>,
) -> (i64, ReferenceId) {
    let reference = ReferenceId::new_v4();
    conn.execute(
        "INSERT INTO world (reference_id, table_name, permission, user_account_id) VALUES (?1, ?2, ?3, ?4)",
        params![reference.to_string(), table_name, permission.0, owner],
    )
    .unwrap();
    (conn.last_insert_rowid(), reference)
}

pub fn insert_action(
    conn: &Connection,
    world_id: i64,
    action_name: &str,
    permission: AuthPermission,
    owner: Option<i64>,
) -> (i64, ReferenceId) {
    let reference = ReferenceId::new_v4();
    conn.execute(
        "INSERT INTO action (reference_id, action_name, label, world_id, action_schema, permission, user_account_id)
         VALUES (?1, ?2, ?2, ?3, '{\"in_fields\":[]}', ?4, ?5)",
        params![reference.to_string(), action_name, world_id, permission.0, owner],
    )
    .unwrap();
    (conn.last_insert_rowid(), reference)
}

/// Links a subject row into a usergroup via the relation's join table.
pub fn insert_membership(
    conn: &Connection,
    subject_type: &str,
    subject_id: i64,
    group_id: i64,
    permission: AuthPermission,
    created_at: &str,
) -> ReferenceId {
    let relation = TableRelation::usergroup_membership(subject_type);
    let reference = ReferenceId::new_v4();
    let sql = format!(
        "INSERT INTO {} (reference_id, {}, usergroup_id, permission, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        relation.join_table_name(),
        relation.subject_name,
    );
    conn.execute(
        &sql,
        params![
            reference.to_string(),
            subject_id,
            group_id,
            permission.0,
            created_at
        ],
    )
    .unwrap();
    reference
}
