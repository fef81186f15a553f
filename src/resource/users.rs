use rusqlite::Connection;
use tracing::warn;

use crate::db::fetch_rows;
use crate::errors::CoreError;
use crate::models::{CellValue, ReferenceId, Row};
use crate::query::{Cond, Select};
use crate::resource::{
    user_group_join_table, DataResource, IncludeSet, ADMINISTRATORS_GROUP, USERGROUP_TABLE,
    USER_ACCOUNT_ID_COLUMN, USER_ACCOUNT_TABLE,
};
use crate::trace_query;

impl DataResource {
    /// The user account row matching `email`.
    pub fn user_account_row_by_email(
        &self,
        conn: &Connection,
        email: &str,
    ) -> Result<Row, CoreError> {
        let (mut rows, _) = self.rows_by_where(
            conn,
            USER_ACCOUNT_TABLE,
            &IncludeSet::none(),
            &[Cond::eq_text("email", email)],
        )?;
        if rows.is_empty() {
            return Err(CoreError::NotFound("no such user".to_string()));
        }
        Ok(rows.remove(0))
    }

    pub fn user_password_by_email(
        &self,
        conn: &Connection,
        email: &str,
    ) -> Result<String, CoreError> {
        let user = self.user_account_row_by_email(conn, email)?;
        user.get("password")
            .and_then(CellValue::as_text)
            .map(str::to_string)
            .ok_or_else(|| CoreError::NotFound("user has no password".to_string()))
    }

    pub fn user_by_id(&self, conn: &Connection, user_id: i64) -> Result<Row, CoreError> {
        let (row, _) =
            self.single_row_by_id(conn, USER_ACCOUNT_TABLE, user_id, &IncludeSet::none())?;
        Ok(row)
    }

    /// Converts a group name to its internal integer id.
    pub fn group_name_to_id(&self, conn: &Connection, group_name: &str) -> Result<i64, CoreError> {
        let (sql, params) = Select::from(USERGROUP_TABLE)
            .column("id")
            .filter(Cond::eq_text("name", group_name))
            .to_sql();
        trace_query!(sql, params, "group_name_to_id");

        let rows = fetch_rows(conn, &sql, &params)?;
        rows.first()
            .and_then(|row| row.get("id"))
            .and_then(CellValue::as_i64)
            .ok_or_else(|| CoreError::not_found(USERGROUP_TABLE, group_name))
    }

    /// Reference ids of every member of the named group, oldest membership
    /// first.
    pub fn user_members_of_group(
        &self,
        conn: &Connection,
        group_name: &str,
    ) -> Result<Vec<ReferenceId>, CoreError> {
        let join_table = user_group_join_table();
        let (sql, params) = Select::from_alias(&join_table, "uu")
            .column("u.reference_id AS reference_id")
            .join(
                USER_ACCOUNT_TABLE,
                "u",
                &format!("uu.{}", USER_ACCOUNT_ID_COLUMN),
                "u.id",
            )
            .join(USERGROUP_TABLE, "g", "uu.usergroup_id", "g.id")
            .filter(Cond::eq_text("g.name", group_name))
            .order_by_asc("uu.created_at")
            .to_sql();
        trace_query!(sql, params, "user_members_of_group");

        let rows = fetch_rows(conn, &sql, &params)?;
        Ok(rows
            .iter()
            .filter_map(|row| row.get("reference_id"))
            .filter_map(CellValue::as_reference_id)
            .collect())
    }

    /// Email of the longest-standing member of the group.
    pub fn user_email_by_group_id(
        &self,
        conn: &Connection,
        usergroup_id: i64,
    ) -> Result<String, CoreError> {
        let join_table = user_group_join_table();
        let (sql, params) = Select::from_alias(&join_table, "uu")
            .column("u.email AS email")
            .join(
                USER_ACCOUNT_TABLE,
                "u",
                &format!("uu.{}", USER_ACCOUNT_ID_COLUMN),
                "u.id",
            )
            .filter(Cond::eq("uu.usergroup_id", usergroup_id))
            .order_by_asc("uu.created_at")
            .limit(1)
            .to_sql();
        trace_query!(sql, params, "user_email_by_group_id");

        let rows = fetch_rows(conn, &sql, &params)?;
        rows.first()
            .and_then(|row| row.get("email"))
            .and_then(CellValue::as_text)
            .map(str::to_string)
            .ok_or_else(|| CoreError::not_found(USERGROUP_TABLE, usergroup_id))
    }

    /// Members of the `administrators` group. Empty until the first admin
    /// bootstrap.
    pub fn admin_reference_ids(&self, conn: &Connection) -> Vec<ReferenceId> {
        match self.user_members_of_group(conn, ADMINISTRATORS_GROUP) {
            Ok(members) => members,
            Err(e) => {
                warn!(message = "Failed to list administrators", error = %e);
                vec![]
            }
        }
    }
}
