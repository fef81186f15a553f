use std::time::Duration;

use rusqlite::Connection;
use tracing::warn;

use crate::cache::CacheValue;
use crate::db::fetch_rows;
use crate::errors::CoreError;
use crate::models::{Action, ActionRow, CellValue, ReferenceId, Row};
use crate::query::{Cond, Select};
use crate::resource::{DataResource, WORLD_TABLE};
use crate::trace_query;

const ACTION_TTL: Duration = Duration::from_secs(60);

impl DataResource {
    /// Gets an action by the type it is defined on and its name. The row is
    /// cached for a minute; the schema JSON is parsed on every call.
    pub fn action_by_name(
        &self,
        conn: &Connection,
        type_name: &str,
        action_name: &str,
    ) -> Result<Action, CoreError> {
        let cache_key = format!("action-{}-{}", type_name, action_name);
        if let Some(hit) = self.cache().get(&cache_key) {
            if let Some(cached) = hit.into_action(&cache_key) {
                match cached.parse() {
                    Ok(action) => return Ok(action),
                    Err(e) => {
                        warn!(
                            message = "Failed to parse cached action schema",
                            action = action_name,
                            error = %e
                        );
                    }
                }
            }
        }

        let (sql, params) = action_select()
            .filter(Cond::eq_text("w.table_name", type_name))
            .filter(Cond::eq_text("a.action_name", action_name))
            .limit(1)
            .to_sql();
        trace_query!(sql, params, "action_by_name");

        let rows = fetch_rows(conn, &sql, &params)?;
        let row = rows.first().ok_or_else(|| {
            CoreError::NotFound(format!(
                "no such action [{}] on [{}]",
                action_name, type_name
            ))
        })?;
        let action_row = scan_action_row(row)?;
        let action = action_row.parse()?;

        self.cache()
            .put_if_absent(&cache_key, CacheValue::Action(action_row), ACTION_TTL);
        Ok(action)
    }

    /// All actions defined on `type_name`. Rows without a label are skipped,
    /// as are rows whose schema fails to parse.
    pub fn actions_by_type(
        &self,
        conn: &Connection,
        type_name: &str,
    ) -> Result<Vec<Action>, CoreError> {
        let (sql, params) = action_select()
            .filter(Cond::eq_text("w.table_name", type_name))
            .to_sql();
        trace_query!(sql, params, "actions_by_type");

        let mut actions = Vec::new();
        for row in fetch_rows(conn, &sql, &params)? {
            let action_row = match scan_action_row(&row) {
                Ok(action_row) => action_row,
                Err(e) => {
                    warn!(message = "Failed to scan action row", error = %e);
                    continue;
                }
            };
            if action_row.label.is_empty() {
                continue;
            }
            match action_row.parse() {
                Ok(action) => actions.push(action),
                Err(e) => {
                    warn!(
                        message = "Failed to parse action schema",
                        action = %action_row.name,
                        error = %e
                    );
                }
            }
        }
        Ok(actions)
    }
}

fn action_select() -> Select {
    Select::from_alias("action", "a")
        .columns(&[
            "a.action_name AS name",
            "w.table_name AS ontype",
            "a.label AS label",
            "a.action_schema AS action_schema",
            "a.instance_optional AS instance_optional",
            "a.reference_id AS referenceid",
        ])
        .join(WORLD_TABLE, "w", "w.id", "a.world_id")
}

fn scan_action_row(row: &Row) -> Result<ActionRow, CoreError> {
    let text = |key: &str| {
        row.get(key)
            .and_then(CellValue::as_text)
            .map(str::to_string)
            .unwrap_or_default()
    };
    let reference_id = row
        .get("referenceid")
        .and_then(CellValue::as_reference_id)
        .unwrap_or_else(ReferenceId::null);
    let instance_optional = row
        .get("instance_optional")
        .and_then(CellValue::as_i64)
        .unwrap_or(0)
        != 0;

    let action_schema = text("action_schema");
    if action_schema.is_empty() {
        return Err(CoreError::DecodeError(
            "action row has no schema".to_string(),
        ));
    }

    Ok(ActionRow {
        name: text("name"),
        label: text("label"),
        on_type: text("ontype"),
        reference_id,
        action_schema,
        instance_optional,
    })
}
