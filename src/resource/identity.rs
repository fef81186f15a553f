use std::collections::HashMap;
use std::time::Duration;

use rusqlite::types::Value;
use rusqlite::Connection;
use tracing::debug;

use crate::cache::CacheValue;
use crate::db::fetch_rows;
use crate::errors::CoreError;
use crate::models::{CellValue, ReferenceId};
use crate::query::{Cond, Select};
use crate::resource::DataResource;
use crate::trace_query;

const ID_TO_REFERENCE_TTL: Duration = Duration::from_secs(60);
const REFERENCE_TO_ID_TTL: Duration = Duration::from_secs(5 * 60);

impl DataResource {
    /// Looks up the integer id of a `type_name` row and returns its stable
    /// reference id.
    pub fn id_to_reference_id(
        &self,
        conn: &Connection,
        type_name: &str,
        id: i64,
    ) -> Result<ReferenceId, CoreError> {
        let cache_key = format!("itr-{}-{}", type_name, id);
        if let Some(hit) = self.cache().get(&cache_key) {
            if let Some(text) = hit.into_text(&cache_key) {
                if let Ok(reference) = ReferenceId::parse(&text) {
                    return Ok(reference);
                }
            }
        }

        let (sql, params) = Select::from(type_name)
            .column("reference_id")
            .filter(Cond::eq("id", id))
            .to_sql();
        trace_query!(sql, params, "id_to_reference_id");

        let rows = fetch_rows(conn, &sql, &params)?;
        let reference = rows
            .first()
            .and_then(|row| row.get("reference_id"))
            .and_then(|cell| cell.as_reference_id())
            .ok_or_else(|| CoreError::not_found(type_name, id))?;

        self.cache().put_if_absent(
            &cache_key,
            CacheValue::Text(reference.to_string()),
            ID_TO_REFERENCE_TTL,
        );
        Ok(reference)
    }

    /// Looks up a reference id and returns the internal integer id.
    pub fn reference_id_to_id(
        &self,
        conn: &Connection,
        type_name: &str,
        reference: &ReferenceId,
    ) -> Result<i64, CoreError> {
        let cache_key = format!("riti-{}-{}", type_name, reference);
        if let Some(hit) = self.cache().get(&cache_key) {
            if let Some(id) = hit.into_integer(&cache_key) {
                return Ok(id);
            }
        }

        let (sql, params) = Select::from(type_name)
            .column("id")
            .filter(Cond::eq_text("reference_id", reference))
            .to_sql();
        trace_query!(sql, params, "reference_id_to_id");

        let rows = fetch_rows(conn, &sql, &params)?;
        let id = rows
            .first()
            .and_then(|row| row.get("id"))
            .and_then(|cell| cell.as_i64())
            .ok_or_else(|| CoreError::not_found(type_name, reference))?;

        self.cache()
            .put_if_absent(&cache_key, CacheValue::Integer(id), REFERENCE_TO_ID_TTL);
        Ok(id)
    }

    /// Batched id to reference id lookup in a single query. Results are
    /// merged into the per-entry cache opportunistically.
    pub fn id_list_to_reference_ids(
        &self,
        conn: &Connection,
        type_name: &str,
        ids: &[i64],
    ) -> Result<HashMap<i64, ReferenceId>, CoreError> {
        let (sql, params) = Select::from(type_name)
            .columns(&["reference_id", "id"])
            .filter(Cond::in_list(
                "id",
                ids.iter().map(|id| Value::Integer(*id)).collect(),
            ))
            .to_sql();
        trace_query!(sql, params, "id_list_to_reference_ids");

        let mut map = HashMap::new();
        for row in fetch_rows(conn, &sql, &params)? {
            let id = row.get("id").and_then(|c| c.as_i64());
            let reference = row.get("reference_id").and_then(|c| c.as_reference_id());
            if let (Some(id), Some(reference)) = (id, reference) {
                self.cache().put_if_absent(
                    &format!("itr-{}-{}", type_name, id),
                    CacheValue::Text(reference.to_string()),
                    ID_TO_REFERENCE_TTL,
                );
                map.insert(id, reference);
            } else {
                debug!(
                    message = "Skipping unscannable id pair",
                    type_name = type_name
                );
            }
        }
        Ok(map)
    }

    /// Batched reference id to id lookup in a single query.
    pub fn reference_id_list_to_ids(
        &self,
        conn: &Connection,
        type_name: &str,
        references: &[ReferenceId],
    ) -> Result<HashMap<ReferenceId, i64>, CoreError> {
        let (sql, params) = Select::from(type_name)
            .columns(&["id", "reference_id"])
            .filter(Cond::in_list(
                "reference_id",
                references
                    .iter()
                    .map(|r| Value::Text(r.to_string()))
                    .collect(),
            ))
            .to_sql();
        trace_query!(sql, params, "reference_id_list_to_ids");

        let mut map = HashMap::new();
        for row in fetch_rows(conn, &sql, &params)? {
            let id = row.get("id").and_then(|c| c.as_i64());
            let reference = row.get("reference_id").and_then(|c| c.as_reference_id());
            if let (Some(id), Some(reference)) = (id, reference) {
                self.cache().put_if_absent(
                    &format!("riti-{}-{}", type_name, reference),
                    CacheValue::Integer(id),
                    REFERENCE_TO_ID_TTL,
                );
                map.insert(reference, id);
            }
        }
        Ok(map)
    }

    /// Reference ids of every row matching the conjunction.
    pub fn reference_ids_by_where(
        &self,
        conn: &Connection,
        type_name: &str,
        conditions: &[Cond],
    ) -> Result<Vec<ReferenceId>, CoreError> {
        let mut select = Select::from(type_name).column("reference_id");
        for condition in conditions {
            select = select.filter(condition.clone());
        }
        let (sql, params) = select.to_sql();
        trace_query!(sql, params, "reference_ids_by_where");

        let rows = fetch_rows(conn, &sql, &params)?;
        Ok(rows
            .iter()
            .filter_map(|row| row.get("reference_id"))
            .filter_map(CellValue::as_reference_id)
            .collect())
    }

    /// Integer ids of every row matching the conjunction.
    pub fn ids_by_where(
        &self,
        conn: &Connection,
        type_name: &str,
        conditions: &[Cond],
    ) -> Result<Vec<i64>, CoreError> {
        let mut select = Select::from(type_name).column("id");
        for condition in conditions {
            select = select.filter(condition.clone());
        }
        let (sql, params) = select.to_sql();
        trace_query!(sql, params, "ids_by_where");

        let rows = fetch_rows(conn, &sql, &params)?;
        Ok(rows
            .iter()
            .filter_map(|row| row.get("id"))
            .filter_map(CellValue::as_i64)
            .collect())
    }
}
