use std::time::Duration;

use rusqlite::types::Value;
use rusqlite::Connection;
use tracing::{error, warn};

use crate::cache::CacheValue;
use crate::db::fetch_rows;
use crate::errors::CoreError;
use crate::models::{
    AuthPermission, CellValue, GroupPermission, PermissionInstance, ReferenceId, Row, RowExt,
    TableRelation,
};
use crate::query::{Cond, Select};
use crate::resource::{
    is_guest_only_type, DataResource, USERGROUP_TABLE, USER_ACCOUNT_ID_COLUMN, USER_ACCOUNT_TABLE,
    WORLD_TABLE,
};
use crate::trace_query;

const OBJECT_PERMISSION_TTL: Duration = Duration::from_secs(10 * 60);
const ROW_PERMISSION_TTL: Duration = Duration::from_secs(60);
const OBJECT_GROUPS_TTL: Duration = Duration::from_secs(30);

impl DataResource {
    /// Loads the owner, usergroup and guest permission of an object by
    /// reference id. Returns the no-permission-to-anyone instance when no
    /// such object exists.
    pub fn object_permission_by_reference_id(
        &self,
        conn: &Connection,
        type_name: &str,
        reference: &ReferenceId,
    ) -> PermissionInstance {
        self.load_object_permission(
            conn,
            type_name,
            Cond::eq_text("reference_id", reference),
            &reference.to_string(),
        )
    }

    /// Same as [`Self::object_permission_by_reference_id`] keyed by the
    /// internal integer id.
    pub fn object_permission_by_id(
        &self,
        conn: &Connection,
        type_name: &str,
        id: i64,
    ) -> PermissionInstance {
        self.load_object_permission(conn, type_name, Cond::eq("id", id), &id.to_string())
    }

    /// Permission of the single object of `type_name` where
    /// `column = value`. Cached; use for near-static lookups such as the
    /// `world` row of a type or an action row.
    pub fn object_permission_by_where(
        &self,
        conn: &Connection,
        type_name: &str,
        column_name: &str,
        value: &str,
    ) -> PermissionInstance {
        let cache_key = format!("object-permission-{}-{}-{}", type_name, column_name, value);
        if let Some(hit) = self.cache().get(&cache_key) {
            if let Some(instance) = hit.into_permission(&cache_key) {
                return instance;
            }
        }

        let instance =
            self.load_object_permission(conn, type_name, Cond::eq_text(column_name, value), value);

        self.cache().put_if_absent(
            &cache_key,
            CacheValue::Permission(instance.clone()),
            OBJECT_PERMISSION_TTL,
        );
        instance
    }

    fn load_object_permission(
        &self,
        conn: &Connection,
        type_name: &str,
        condition: Cond,
        key: &str,
    ) -> PermissionInstance {
        let mut instance = PermissionInstance::default();

        // The usergroup table is its own group and carries no owner column.
        let select = if type_name == USERGROUP_TABLE {
            Select::from(type_name).columns(&["permission", "id"])
        } else {
            Select::from(type_name).columns(&[USER_ACCOUNT_ID_COLUMN, "permission", "id"])
        };
        let (sql, params) = select.filter(condition).to_sql();
        trace_query!(sql, params, "load_object_permission");

        let rows = match fetch_rows(conn, &sql, &params) {
            Ok(rows) => rows,
            Err(e) => {
                error!(
                    message = "Failed to scan permission",
                    type_name = type_name,
                    key = key,
                    error = %e
                );
                return instance;
            }
        };
        let row = match rows.first() {
            Some(row) => row,
            None => {
                warn!(
                    message = "No permission row",
                    type_name = type_name,
                    key = key
                );
                return instance;
            }
        };

        if let Some(owner_id) = row.get(USER_ACCOUNT_ID_COLUMN).and_then(|c| c.as_i64()) {
            if let Ok(owner) = self.id_to_reference_id(conn, USER_ACCOUNT_TABLE, owner_id) {
                instance.owner = Some(owner);
            }
        }

        if let Some(id) = row.get("id").and_then(|c| c.as_i64()) {
            instance.groups = self.object_groups_by_object_id(conn, type_name, id);
        } else {
            return instance;
        }

        if let Some(permission) = row.get("permission") {
            instance.permission = AuthPermission::from_cell(permission);
        }
        instance
    }

    /// Membership entries for an object, from the object-to-usergroup join
    /// table. For `usergroup` rows the row is its own group.
    pub fn object_groups_by_object_id(
        &self,
        conn: &Connection,
        type_name: &str,
        object_id: i64,
    ) -> Vec<GroupPermission> {
        let cache_key = format!("object-groups-{}-{}", type_name, object_id);
        if let Some(hit) = self.cache().get(&cache_key) {
            if let Some(groups) = hit.into_groups(&cache_key) {
                return groups;
            }
        }

        let reference = match self.id_to_reference_id(conn, type_name, object_id) {
            Ok(reference) => reference,
            Err(e) => {
                warn!(
                    message = "Failed to resolve object reference for group lookup",
                    type_name = type_name,
                    object_id = object_id,
                    error = %e
                );
                return vec![];
            }
        };

        if type_name == USERGROUP_TABLE {
            let permission = self
                .registry()
                .get(USERGROUP_TABLE)
                .map(|t| t.default_permission)
                .unwrap_or(AuthPermission::DEFAULT_PERMISSION);
            return vec![GroupPermission {
                group_reference_id: reference,
                object_reference_id: reference,
                relation_reference_id: reference,
                permission,
            }];
        }

        let relation = TableRelation::usergroup_membership(type_name);
        let join_table = relation.join_table_name();
        let (sql, params) = Select::from_alias(USERGROUP_TABLE, "ug")
            .columns(&[
                "ug.reference_id AS groupreferenceid",
                "uug.reference_id AS relationreferenceid",
                "uug.permission AS permission",
            ])
            .join(&join_table, "uug", "uug.usergroup_id", "ug.id")
            .filter(Cond::eq(&format!("uug.{}", relation.subject_name), object_id))
            .to_sql();
        trace_query!(sql, params, "object_groups_by_object_id");

        let groups = match fetch_rows(conn, &sql, &params) {
            Ok(rows) => scan_group_permissions(&rows, Some(reference)),
            Err(e) => {
                error!(
                    message = "Failed to query object groups",
                    type_name = type_name,
                    object_id = object_id,
                    error = %e
                );
                return vec![];
            }
        };

        self.cache().put_if_absent(
            &cache_key,
            CacheValue::Groups(groups.clone()),
            OBJECT_GROUPS_TTL,
        );
        groups
    }

    /// Membership entries for objects of `type_name` where
    /// `column = value`, via one join across subject, link table and
    /// usergroup.
    pub fn object_user_groups_by_where(
        &self,
        conn: &Connection,
        type_name: &str,
        column_name: &str,
        value: Value,
    ) -> Vec<GroupPermission> {
        let relation = TableRelation::usergroup_membership(type_name);
        let join_table = relation.join_table_name();
        let (sql, params) = Select::from(type_name)
            .column(&format!(
                "{}.reference_id AS groupreferenceid",
                relation.object_name
            ))
            .column(&format!("{}.reference_id AS relationreferenceid", join_table))
            .column(&format!("{}.permission AS permission", join_table))
            .join(
                &join_table,
                &join_table,
                &format!("{}.{}", join_table, relation.subject_name),
                &format!("{}.id", type_name),
            )
            .join(
                USERGROUP_TABLE,
                &relation.object_name,
                &format!("{}.{}", join_table, relation.object_name),
                &format!("{}.id", relation.object_name),
            )
            .filter(Cond::Eq(format!("{}.{}", type_name, column_name), value))
            .to_sql();
        trace_query!(sql, params, "object_user_groups_by_where");

        match fetch_rows(conn, &sql, &params) {
            Ok(rows) => scan_group_permissions(&rows, None),
            Err(e) => {
                error!(
                    message = "Failed to get object groups by where clause",
                    type_name = type_name,
                    column_name = column_name,
                    error = %e
                );
                vec![]
            }
        }
    }

    /// Permission of an already-loaded row map. Extracts what the row
    /// already carries and falls back to the database for the rest.
    pub fn row_permission(&self, conn: &Connection, row: &Row) -> PermissionInstance {
        let mut instance = PermissionInstance::default();

        let type_name = match row.type_name() {
            Some(type_name) => type_name.to_string(),
            None => {
                error!(message = "Row has no __type, returning no permission");
                return instance;
            }
        };
        let reference_key = match row.reference_key() {
            Some(key) => key,
            None => {
                error!(
                    message = "Row has neither reference_id nor id",
                    type_name = %type_name
                );
                return instance;
            }
        };

        let cache_key = format!("row-permission-{}-{}", type_name, reference_key);
        if let Some(hit) = self.cache().get(&cache_key) {
            if let Some(cached) = hit.into_permission(&cache_key) {
                return cached;
            }
        }

        if type_name != USERGROUP_TABLE {
            instance.owner = self.row_owner(conn, row, &type_name, &reference_key);
        }

        if is_guest_only_type(&type_name) {
            instance.groups = vec![GroupPermission {
                group_reference_id: ReferenceId::null(),
                object_reference_id: ReferenceId::null(),
                relation_reference_id: ReferenceId::null(),
                permission: AuthPermission::GUEST_READ,
            }];
            return instance;
        }

        if type_name == USERGROUP_TABLE {
            // The group row is its own group.
            let reference = row.reference_id().unwrap_or_default();
            let permission = self
                .registry()
                .get(USERGROUP_TABLE)
                .map(|t| t.default_permission)
                .unwrap_or(AuthPermission::DEFAULT_PERMISSION);
            instance.groups = vec![GroupPermission {
                group_reference_id: reference,
                object_reference_id: reference,
                relation_reference_id: reference,
                permission,
            }];
        } else if !self.is_join_table_type(&type_name)
            && self.registry().has_many(&type_name, USERGROUP_TABLE)
        {
            instance.groups = self.object_user_groups_by_where(
                conn,
                &type_name,
                "reference_id",
                Value::Text(reference_key.clone()),
            );
        }

        match row.get("permission") {
            Some(cell) if !cell.is_null() => {
                instance.permission = AuthPermission::from_cell(cell);
            }
            _ => {
                if let Ok(reference) = ReferenceId::parse(&reference_key) {
                    let loaded =
                        self.object_permission_by_reference_id(conn, &type_name, &reference);
                    instance.permission = loaded.permission;
                }
            }
        }

        self.cache().put_if_absent(
            &cache_key,
            CacheValue::Permission(instance.clone()),
            ROW_PERMISSION_TTL,
        );
        instance
    }

    fn row_owner(
        &self,
        conn: &Connection,
        row: &Row,
        type_name: &str,
        reference_key: &str,
    ) -> Option<ReferenceId> {
        match row.get(USER_ACCOUNT_ID_COLUMN) {
            // Already resolved to a reference by the loader.
            Some(CellValue::Text(owner)) => ReferenceId::parse(owner).ok(),
            // Raw integer foreign key.
            Some(CellValue::Integer(owner_id)) => self
                .id_to_reference_id(conn, USER_ACCOUNT_TABLE, *owner_id)
                .ok(),
            _ => {
                let reference = ReferenceId::parse(reference_key).ok()?;
                let cell = self
                    .reference_id_to_object_column(
                        conn,
                        type_name,
                        &reference,
                        USER_ACCOUNT_ID_COLUMN,
                    )
                    .ok()?;
                cell.as_reference_id().or_else(|| {
                    cell.as_i64().and_then(|owner_id| {
                        self.id_to_reference_id(conn, USER_ACCOUNT_TABLE, owner_id)
                            .ok()
                    })
                })
            }
        }
    }

    /// Permission of the action `action_name` defined on world `world_id`.
    pub fn action_permission_by_name(
        &self,
        conn: &Connection,
        world_id: i64,
        action_name: &str,
    ) -> Result<PermissionInstance, CoreError> {
        let references = self.reference_ids_by_where(
            conn,
            "action",
            &[
                Cond::eq_text("action_name", action_name),
                Cond::eq("world_id", world_id),
            ],
        )?;

        let reference = references.first().ok_or_else(|| {
            CoreError::NotFound(format!(
                "failed to find action [{}] on [{}]",
                action_name, world_id
            ))
        })?;

        Ok(self.object_permission_by_reference_id(conn, "action", reference))
    }

    /// Checks if the caller may invoke `action_name` on `type_name`.
    /// Execute must be granted by BOTH the type-level and the action-level
    /// permission; the grants can come from different groups.
    pub fn is_user_action_allowed(
        &self,
        conn: &Connection,
        user: &ReferenceId,
        groups: &[GroupPermission],
        type_name: &str,
        action_name: &str,
    ) -> bool {
        let type_permission =
            self.object_permission_by_where(conn, WORLD_TABLE, "table_name", type_name);
        let action_permission =
            self.object_permission_by_where(conn, "action", "action_name", action_name);

        type_permission.can_execute(user, groups) && action_permission.can_execute(user, groups)
    }
}

fn scan_group_permissions(rows: &[Row], object: Option<ReferenceId>) -> Vec<GroupPermission> {
    let mut groups = Vec::with_capacity(rows.len());
    for row in rows {
        let group_reference_id = row.get("groupreferenceid").and_then(|c| c.as_reference_id());
        let relation_reference_id = row
            .get("relationreferenceid")
            .and_then(|c| c.as_reference_id());
        let permission = row.get("permission").map(AuthPermission::from_cell);

        match (group_reference_id, relation_reference_id, permission) {
            (Some(group_reference_id), Some(relation_reference_id), Some(permission)) => {
                groups.push(GroupPermission {
                    group_reference_id,
                    object_reference_id: object.unwrap_or_default(),
                    relation_reference_id,
                    permission,
                });
            }
            _ => {
                error!(message = "Failed to scan group permission", row = ?row);
            }
        }
    }
    groups
}
