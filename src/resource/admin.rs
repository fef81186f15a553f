use rusqlite::Connection;
use tracing::{error, info};

use crate::db::execute;
use crate::models::{AuthPermission, ReferenceId};
use crate::query::{Cond, Insert, Update};
use crate::resource::{
    user_group_join_table, DataResource, ADMINISTRATORS_GROUP, USER_ACCOUNT_ID_COLUMN, WORLD_TABLE,
};
use crate::trace_query;

impl DataResource {
    /// True while no administrator exists. Once the first user has become
    /// admin this never returns true again.
    pub fn can_become_admin(&self, conn: &Connection) -> bool {
        self.admin_reference_ids(conn).is_empty()
    }

    /// Makes `user_id` the administrator and owner of everything. Callers
    /// hold the transaction boundary; the steps are not atomic on their own
    /// and a partial failure leaves partial state.
    pub fn become_admin(&self, conn: &Connection, user_id: i64) -> bool {
        info!(message = "User is going to become admin", user_id = user_id);
        if !self.can_become_admin(conn) {
            return false;
        }

        let join_table = user_group_join_table();
        for table in self.registry().tables() {
            if table.table_name == join_table {
                continue;
            }
            if !table.has_column(USER_ACCOUNT_ID_COLUMN) {
                continue;
            }

            let (sql, params) = Update::table(&table.table_name)
                .set(USER_ACCOUNT_ID_COLUMN, user_id)
                .set("permission", AuthPermission::DEFAULT_PERMISSION.0)
                .to_sql();
            trace_query!(sql, params, "become_admin_owner");
            if let Err(e) = execute(conn, &sql, &params) {
                error!(
                    message = "Failed to execute become admin update query",
                    table_name = %table.table_name,
                    error = %e
                );
                continue;
            }
        }

        let admin_group_id = match self.group_name_to_id(conn, ADMINISTRATORS_GROUP) {
            Ok(id) => id,
            Err(e) => {
                error!(message = "Failed to find administrators group", error = %e);
                return false;
            }
        };

        let (sql, params) = Insert::into_table(&join_table)
            .value(USER_ACCOUNT_ID_COLUMN, user_id)
            .value("usergroup_id", admin_group_id)
            .value("permission", AuthPermission::DEFAULT_PERMISSION.0)
            .value("reference_id", ReferenceId::new_v4().to_string())
            .to_sql();
        trace_query!(sql, params, "become_admin_membership");
        if let Err(e) = execute(conn, &sql, &params) {
            error!(
                message = "Failed to add user to administrators usergroup",
                error = %e
            );
            return false;
        }

        let (sql, params) = Update::table(WORLD_TABLE)
            .set("permission", AuthPermission::DEFAULT_PERMISSION.0)
            .set("default_permission", AuthPermission::DEFAULT_PERMISSION.0)
            .filter(Cond::not_like("table_name", "%_audit"))
            .to_sql();
        trace_query!(sql, params, "become_admin_world");
        if let Err(e) = execute(conn, &sql, &params) {
            error!(message = "Failed to update world permissions", error = %e);
            return false;
        }

        let audit_permission = AuthPermission::USER_CREATE | AuthPermission::GROUP_CREATE;
        let audit_default = AuthPermission::USER_READ | AuthPermission::GROUP_READ;
        let (sql, params) = Update::table(WORLD_TABLE)
            .set("permission", audit_permission.0)
            .set("default_permission", audit_default.0)
            .filter(Cond::like("table_name", "%_audit"))
            .to_sql();
        trace_query!(sql, params, "become_admin_world_audit");
        if let Err(e) = execute(conn, &sql, &params) {
            error!(message = "Failed to update world audit permissions", error = %e);
        }

        let action_permission = AuthPermission::USER_READ
            | AuthPermission::USER_EXECUTE
            | AuthPermission::GROUP_CRUD
            | AuthPermission::GROUP_EXECUTE
            | AuthPermission::GROUP_REFER;
        let (sql, params) = Update::table("action")
            .set("permission", action_permission.0)
            .to_sql();
        trace_query!(sql, params, "become_admin_actions");
        if let Err(e) = execute(conn, &sql, &params) {
            error!(message = "Failed to update action permissions", error = %e);
        }

        let signin_permission = AuthPermission::GUEST_PEEK
            | AuthPermission::GUEST_EXECUTE
            | AuthPermission::USER_READ
            | AuthPermission::USER_EXECUTE
            | AuthPermission::GROUP_READ
            | AuthPermission::GROUP_EXECUTE;
        let (sql, params) = Update::table("action")
            .set("permission", signin_permission.0)
            .filter(Cond::eq_text("action_name", "signin"))
            .to_sql();
        trace_query!(sql, params, "become_admin_signin");
        if let Err(e) = execute(conn, &sql, &params) {
            error!(message = "Failed to update signin action permission", error = %e);
        }

        true
    }
}
