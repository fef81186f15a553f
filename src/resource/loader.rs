use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rusqlite::types::Value;
use rusqlite::Connection;
use tracing::{error, info, warn};

use crate::cache::CacheValue;
use crate::db::{execute, fetch_rows};
use crate::errors::CoreError;
use crate::models::{
    parse_temporal, CellValue, ColumnType, DataSource, FileEntry, ReferenceId, Row, RowExt,
    TableInfo, TableRelation, TYPE_KEY,
};
use crate::query::{Cond, Delete, Insert, Select};
use crate::resource::{DataResource, IncludeSet};
use crate::trace_query;

const ID_TO_OBJECT_TTL: Duration = Duration::from_secs(60);
const REFERENCE_TO_OBJECT_TTL: Duration = Duration::from_secs(5);

impl DataResource {
    /// Loads rows of `type_name` matching the conjunction, with foreign keys
    /// resolved and requested relations embedded. Returns the rows plus a
    /// parallel list of embedded objects per row.
    pub fn rows_by_where(
        &self,
        conn: &Connection,
        type_name: &str,
        include: &IncludeSet,
        conditions: &[Cond],
    ) -> Result<(Vec<Row>, Vec<Vec<Row>>), CoreError> {
        let table = self.table_info(type_name)?;

        let mut select = Select::from(type_name);
        for condition in conditions {
            select = select.filter(condition.clone());
        }
        let (sql, params) = select.to_sql();
        trace_query!(sql, params, "rows_by_where");

        let raw = fetch_rows(conn, &sql, &params)?;
        self.result_to_array_of_map(conn, raw, table, include)
    }

    /// Equivalent to [`Self::rows_by_where`] on `reference_id`, failing with
    /// `NotFound` when the row is absent.
    pub fn single_row_by_reference_id(
        &self,
        conn: &Connection,
        type_name: &str,
        reference: &ReferenceId,
        include: &IncludeSet,
    ) -> Result<(Row, Vec<Row>), CoreError> {
        let (mut rows, mut includes) = self.rows_by_where(
            conn,
            type_name,
            include,
            &[Cond::eq_text("reference_id", reference)],
        )?;
        if rows.is_empty() {
            return Err(CoreError::not_found(type_name, reference));
        }
        Ok((rows.remove(0), includes.remove(0)))
    }

    pub fn single_row_by_id(
        &self,
        conn: &Connection,
        type_name: &str,
        id: i64,
        include: &IncludeSet,
    ) -> Result<(Row, Vec<Row>), CoreError> {
        let (mut rows, mut includes) =
            self.rows_by_where(conn, type_name, include, &[Cond::eq("id", id)])?;
        if rows.is_empty() {
            return Err(CoreError::not_found(type_name, id));
        }
        Ok((rows.remove(0), includes.remove(0)))
    }

    /// The single object where `column = value`, without relation expansion.
    pub fn object_by_where(
        &self,
        conn: &Connection,
        type_name: &str,
        column_name: &str,
        value: Value,
    ) -> Result<Row, CoreError> {
        let (mut rows, _) = self.rows_by_where(
            conn,
            type_name,
            &IncludeSet::none(),
            &[Cond::Eq(column_name.to_string(), value.clone())],
        )?;
        if rows.is_empty() {
            return Err(CoreError::NotFound(format!(
                "no [{}={:?}] object found in [{}]",
                column_name, value, type_name
            )));
        }
        Ok(rows.remove(0))
    }

    /// Object snapshot by internal id, cached briefly.
    pub fn id_to_object(
        &self,
        conn: &Connection,
        type_name: &str,
        id: i64,
    ) -> Result<Row, CoreError> {
        let cache_key = format!("ito-{}-{}", type_name, id);
        if let Some(hit) = self.cache().get(&cache_key) {
            if let Some(row) = hit.into_row(&cache_key) {
                return Ok(row);
            }
        }

        let (mut rows, _) =
            self.rows_by_where(conn, type_name, &IncludeSet::none(), &[Cond::eq("id", id)])?;
        if rows.is_empty() {
            return Err(CoreError::not_found(type_name, id));
        }
        let row = rows.remove(0);

        self.cache()
            .put_if_absent(&cache_key, CacheValue::Row(row.clone()), ID_TO_OBJECT_TTL);
        Ok(row)
    }

    /// Object snapshot by reference id. Cached for a very short window since
    /// these rows churn with every write.
    pub fn reference_id_to_object(
        &self,
        conn: &Connection,
        type_name: &str,
        reference: &ReferenceId,
    ) -> Result<Row, CoreError> {
        let cache_key = format!("rio-{}-{}", type_name, reference);
        if let Some(hit) = self.cache().get(&cache_key) {
            if let Some(row) = hit.into_row(&cache_key) {
                return Ok(row);
            }
        }

        let (mut rows, _) = self.rows_by_where(
            conn,
            type_name,
            &IncludeSet::none(),
            &[Cond::eq_text("reference_id", reference)],
        )?;
        if rows.is_empty() {
            return Err(CoreError::not_found(type_name, reference));
        }
        let row = rows.remove(0);

        self.cache().put_if_absent(
            &cache_key,
            CacheValue::Row(row.clone()),
            REFERENCE_TO_OBJECT_TTL,
        );
        Ok(row)
    }

    /// A single cell of the row identified by reference id.
    pub fn reference_id_to_object_column(
        &self,
        conn: &Connection,
        type_name: &str,
        reference: &ReferenceId,
        column_name: &str,
    ) -> Result<CellValue, CoreError> {
        let (sql, params) = Select::from(type_name)
            .column(column_name)
            .filter(Cond::eq_text("reference_id", reference))
            .to_sql();
        trace_query!(sql, params, "reference_id_to_object_column");

        let rows = fetch_rows(conn, &sql, &params)?;
        rows.first()
            .and_then(|row| row.get(column_name))
            .cloned()
            .ok_or_else(|| CoreError::not_found(type_name, reference))
    }

    /// All rows of `type_name`. Utility for low-count tables.
    pub fn all_objects(&self, conn: &Connection, type_name: &str) -> Result<Vec<Row>, CoreError> {
        self.all_objects_with_where(conn, type_name, &[])
    }

    pub fn all_objects_with_where(
        &self,
        conn: &Connection,
        type_name: &str,
        conditions: &[Cond],
    ) -> Result<Vec<Row>, CoreError> {
        let (rows, _) = self.rows_by_where(conn, type_name, &IncludeSet::none(), conditions)?;
        Ok(rows)
    }

    /// All rows without any post-processing of cell values.
    pub fn all_raw_objects(
        &self,
        conn: &Connection,
        type_name: &str,
    ) -> Result<Vec<Row>, CoreError> {
        let (sql, params) = Select::from(type_name).to_sql();
        trace_query!(sql, params, "all_raw_objects");
        let raw = fetch_rows(conn, &sql, &params)?;
        Ok(rows_to_map(raw, type_name))
    }

    /// Up to `count` rows picked by `id >= RANDOM() * MAX(id)`. Not uniform
    /// over sparse id spaces.
    pub fn random_rows(
        &self,
        conn: &Connection,
        type_name: &str,
        count: u32,
    ) -> Result<Vec<Row>, CoreError> {
        let table = self.table_info(type_name)?;
        let (sql, params) = Select::from(type_name)
            .filter(self.dialect().random_row_predicate(type_name))
            .limit(count)
            .to_sql();
        trace_query!(sql, params, "random_rows");

        let raw = fetch_rows(conn, &sql, &params)?;
        let (rows, _) = self.result_to_array_of_map(conn, raw, table, &IncludeSet::none())?;
        Ok(rows)
    }

    /// `SELECT <select_column> FROM <type_name> WHERE <match_column> IN (values)`.
    pub fn single_column_values_by_match(
        &self,
        conn: &Connection,
        type_name: &str,
        select_column: &str,
        match_column: &str,
        values: Vec<Value>,
    ) -> Result<Vec<CellValue>, CoreError> {
        let (sql, params) = Select::from(type_name)
            .column(select_column)
            .filter(Cond::in_list(match_column, values))
            .to_sql();
        trace_query!(sql, params, "single_column_values_by_match");

        let rows = fetch_rows(conn, &sql, &params)?;
        Ok(rows
            .iter()
            .filter_map(|row| row.get(select_column))
            .cloned()
            .collect())
    }

    /// DELETE-based truncate. Unless `skip_relations` is set, link tables and
    /// dependent subject rows are cleared first.
    pub fn truncate_table(
        &self,
        conn: &Connection,
        type_name: &str,
        skip_relations: bool,
    ) -> Result<(), CoreError> {
        info!(message = "Truncate table", type_name = type_name);

        if !skip_relations {
            let relations = self.table_info(type_name)?.relations.clone();
            for relation in relations {
                let result = if relation.relation.uses_join_table() {
                    self.truncate_table(conn, &relation.join_table_name(), true)
                } else if relation.object == type_name && relation.subject != type_name {
                    self.truncate_table(conn, &relation.subject, true)
                } else {
                    Ok(())
                };
                if let Err(e) = result {
                    error!(
                        message = "Failed to truncate related table",
                        type_name = type_name,
                        error = %e
                    );
                }
            }
        }

        let (sql, params) = Delete::from(type_name).to_sql();
        execute(conn, &sql, &params)?;
        Ok(())
    }

    /// Insert a data map without validation or transformation, used by data
    /// import. Datetime cells are parsed; `permission` is forced to the
    /// table default.
    pub fn direct_insert(
        &self,
        conn: &Connection,
        type_name: &str,
        data: &HashMap<String, CellValue>,
    ) -> Result<(), CoreError> {
        let table = self.table_info(type_name)?;

        let mut insert = Insert::into_table(type_name);
        for column in &table.columns {
            let mut value = data
                .get(&column.column_name)
                .cloned()
                .unwrap_or(CellValue::Null);

            if column.column_type == ColumnType::DateTime {
                if let CellValue::Text(text) = &value {
                    match parse_temporal(text) {
                        Some(parsed) => value = CellValue::DateTime(parsed),
                        None => {
                            error!(
                                message = "Failed to parse value as time, skipping column",
                                column = %column.column_name,
                                value = %text
                            );
                            continue;
                        }
                    }
                }
            }

            if column.column_name == "permission" {
                value = CellValue::Integer(table.default_permission.0);
            }

            insert = insert.value(&column.column_name, Value::from(value));
        }

        let (sql, params) = insert.to_sql();
        trace_query!(sql, params, "direct_insert");
        execute(conn, &sql, &params)?;
        Ok(())
    }

    /// The two post-processing passes over scanned rows: per-column datetime
    /// decoding and foreign-key resolution, then relation inclusion.
    fn result_to_array_of_map(
        &self,
        conn: &Connection,
        raw: Vec<Row>,
        table: &TableInfo,
        include: &IncludeSet,
    ) -> Result<(Vec<Row>, Vec<Vec<Row>>), CoreError> {
        let mut rows = rows_to_map(raw, &table.table_name);
        let mut includes = Vec::with_capacity(rows.len());
        let mut reference_memo: HashMap<(String, i64), ReferenceId> = HashMap::new();

        for row in &mut rows {
            let mut local_include: Vec<Row> = Vec::new();

            for column in &table.columns {
                let cell = match row.get(&column.column_name) {
                    Some(cell) => cell.clone(),
                    None => continue,
                };

                if column.column_type == ColumnType::DateTime {
                    if let CellValue::Text(text) = &cell {
                        match parse_temporal(text) {
                            Some(parsed) => {
                                row.insert(
                                    column.column_name.clone(),
                                    CellValue::DateTime(parsed),
                                );
                            }
                            None => {
                                info!(
                                    message = "Failed to parse date time, nulling cell",
                                    column = %column.column_name,
                                    value = %text
                                );
                                row.insert(column.column_name.clone(), CellValue::Null);
                            }
                        }
                    }
                }

                let foreign_key = match &column.foreign_key {
                    Some(foreign_key) => foreign_key,
                    None => continue,
                };
                if cell.is_null() || matches!(&cell, CellValue::Text(t) if t.is_empty()) {
                    continue;
                }

                match foreign_key.data_source {
                    DataSource::Table => {
                        self.resolve_table_foreign_key(
                            conn,
                            row,
                            &mut local_include,
                            &mut reference_memo,
                            &column.column_name,
                            &foreign_key.namespace,
                            &cell,
                            include,
                        );
                    }
                    DataSource::CloudStore => {
                        self.resolve_file_column(
                            row,
                            &mut local_include,
                            &table.table_name,
                            &column.column_name,
                            &cell,
                            include,
                        );
                    }
                }
            }

            if self.include_depth() >= 1 {
                for relation in &table.relations {
                    self.include_relation(conn, row, &mut local_include, table, relation, include);
                }
            }

            includes.push(local_include);
        }

        Ok((rows, includes))
    }

    #[allow(clippy::too_many_arguments)]
    fn resolve_table_foreign_key(
        &self,
        conn: &Connection,
        row: &mut Row,
        local_include: &mut Vec<Row>,
        reference_memo: &mut HashMap<(String, i64), ReferenceId>,
        column_name: &str,
        namespace: &str,
        cell: &CellValue,
        include: &IncludeSet,
    ) {
        let foreign_id = match cell.as_i64() {
            Some(id) => id,
            None => {
                error!(
                    message = "Failed to convert foreign key to integer id",
                    column = column_name,
                    value = ?cell
                );
                return;
            }
        };

        let memo_key = (namespace.to_string(), foreign_id);
        let reference = match reference_memo.get(&memo_key) {
            Some(reference) => *reference,
            None => match self.id_to_reference_id(conn, namespace, foreign_id) {
                Ok(reference) => {
                    reference_memo.insert(memo_key, reference);
                    reference
                }
                Err(e) => {
                    error!(
                        message = "Failed to get reference id for foreign key",
                        namespace = namespace,
                        foreign_id = foreign_id,
                        error = %e
                    );
                    return;
                }
            },
        };
        row.insert(
            column_name.to_string(),
            CellValue::Text(reference.to_string()),
        );

        if self.include_depth() >= 1 && include.requests_any([namespace, column_name]) {
            match self.id_to_object(conn, namespace, foreign_id) {
                Ok(mut object) => {
                    object.insert(
                        TYPE_KEY.to_string(),
                        CellValue::Text(namespace.to_string()),
                    );
                    local_include.push(object);
                }
                Err(e) => {
                    warn!(
                        message = "Failed to load related object, omitting",
                        namespace = namespace,
                        foreign_id = foreign_id,
                        error = %e
                    );
                }
            }
        }
    }

    fn resolve_file_column(
        &self,
        row: &mut Row,
        local_include: &mut Vec<Row>,
        table_name: &str,
        column_name: &str,
        cell: &CellValue,
        include: &IncludeSet,
    ) {
        let manifest = match cell {
            CellValue::Text(text) => text,
            _ => return,
        };
        let mut files: Vec<FileEntry> = match serde_json::from_str(manifest) {
            Ok(files) => files,
            Err(e) => {
                error!(
                    message = "Failed to obtain list of file information",
                    table_name = table_name,
                    column = column_name,
                    error = %e
                );
                return;
            }
        };

        files.retain(|file| {
            file.file_type.as_deref() != Some("x-crdt/yjs") || include.requests("x-crdt/yjs")
        });

        for file in &mut files {
            match (&file.path, &file.name) {
                (Some(path), Some(name)) if !path.is_empty() => {
                    file.src = Some(format!("{}/{}", path, name));
                }
                (_, Some(name)) => file.src = Some(name.clone()),
                _ => {
                    error!(
                        message = "File entry is missing name and path",
                        table_name = table_name,
                        column = column_name
                    );
                }
            }
        }
        row.insert(column_name.to_string(), CellValue::Files(files.clone()));

        if include.requests(column_name) {
            match self.file_from_local_store(table_name, column_name, &files) {
                Ok(resolved) => {
                    row.insert(column_name.to_string(), CellValue::Files(resolved.clone()));
                    for file in resolved {
                        let type_name = file
                            .file_type
                            .clone()
                            .unwrap_or_else(|| "file".to_string());
                        let mut entry = file_entry_row(&file);
                        entry.insert(TYPE_KEY.to_string(), CellValue::Text(type_name));
                        local_include.push(entry);
                    }
                }
                Err(e) => {
                    warn!(
                        message = "Failed to resolve file from cloud store",
                        table_name = table_name,
                        column = column_name,
                        error = %e
                    );
                }
            }
        }
    }

    /// One relation edge of one row. Failures are logged and the relation is
    /// omitted; the parent load never fails here.
    fn include_relation(
        &self,
        conn: &Connection,
        row: &mut Row,
        local_include: &mut Vec<Row>,
        table: &TableInfo,
        relation: &TableRelation,
        include: &IncludeSet,
    ) {
        let requested = include.requests_any([
            relation.object_name.as_str(),
            relation.subject_name.as_str(),
            relation.object.as_str(),
            relation.subject.as_str(),
        ]);
        if !requested {
            return;
        }
        let row_reference = match row.reference_key() {
            Some(reference) => reference,
            None => return,
        };

        if relation.subject == table.table_name {
            // This row is the subject; has_one and belongs_to are already
            // covered by the foreign-key pass.
            if !relation.relation.uses_join_table() {
                return;
            }
            let join_table = relation.join_table_name();
            let (sql, params) = Select::from_alias(&relation.subject, &relation.subject_name)
                .column(&format!("{}.id", relation.object_name))
                .join(
                    &join_table,
                    &join_table,
                    &format!("{}.{}", join_table, relation.subject_name),
                    &format!("{}.id", relation.subject_name),
                )
                .join(
                    &relation.object,
                    &relation.object_name,
                    &format!("{}.{}", join_table, relation.object_name),
                    &format!("{}.id", relation.object_name),
                )
                .filter(Cond::eq_text(
                    &format!("{}.reference_id", relation.subject_name),
                    &row_reference,
                ))
                .order_by_desc(&format!("{}.created_at", join_table))
                .limit(self.include_fanout())
                .to_sql();

            let Some(ids) = self.related_ids(conn, &sql, &params) else {
                return;
            };
            self.embed_related(conn, row, local_include, &relation.object, &relation.object_name, ids);
        } else {
            // This row is the object; collect the subjects pointing at it.
            let (sql, params) = if relation.relation.uses_join_table() {
                let join_table = relation.join_table_name();
                Select::from_alias(&relation.object, &relation.object_name)
                    .column(&format!("{}.id", relation.subject_name))
                    .join(
                        &join_table,
                        &join_table,
                        &format!("{}.{}", join_table, relation.object_name),
                        &format!("{}.id", relation.object_name),
                    )
                    .join(
                        &relation.subject,
                        &relation.subject_name,
                        &format!("{}.{}", join_table, relation.subject_name),
                        &format!("{}.id", relation.subject_name),
                    )
                    .filter(Cond::eq_text(
                        &format!("{}.reference_id", relation.object_name),
                        &row_reference,
                    ))
                    .order_by_desc(&format!("{}.created_at", join_table))
                    .limit(self.include_fanout())
                    .to_sql()
            } else {
                Select::from_alias(&relation.object, &relation.object_name)
                    .column(&format!("{}.id", relation.subject_name))
                    .join(
                        &relation.subject,
                        &relation.subject_name,
                        &format!("{}.{}", relation.subject_name, relation.object_name),
                        &format!("{}.id", relation.object_name),
                    )
                    .filter(Cond::eq_text(
                        &format!("{}.reference_id", relation.object_name),
                        &row_reference,
                    ))
                    .order_by_desc(&format!("{}.created_at", relation.subject_name))
                    .limit(self.include_fanout())
                    .to_sql()
            };

            let Some(ids) = self.related_ids(conn, &sql, &params) else {
                return;
            };
            self.embed_related(
                conn,
                row,
                local_include,
                &relation.subject,
                &relation.subject_name,
                ids,
            );
        }
    }

    /// The id-collection half of a relation query; `None` means the relation
    /// is omitted.
    fn related_ids(&self, conn: &Connection, sql: &str, params: &[Value]) -> Option<Vec<i64>> {
        trace_query!(sql, params, "related_ids");
        match fetch_rows(conn, sql, params) {
            Ok(rows) => {
                let ids: Vec<i64> = rows
                    .iter()
                    .filter_map(|row| row.get("id"))
                    .filter_map(CellValue::as_i64)
                    .collect();
                if ids.is_empty() {
                    None
                } else {
                    Some(ids)
                }
            }
            Err(e) => {
                warn!(message = "Relation include query failed, omitting", error = %e);
                None
            }
        }
    }

    fn embed_related(
        &self,
        conn: &Connection,
        row: &mut Row,
        local_include: &mut Vec<Row>,
        related_type: &str,
        list_key: &str,
        ids: Vec<i64>,
    ) {
        let values = ids.iter().map(|id| Value::Integer(*id)).collect();
        let related = match self.all_objects_with_where(
            conn,
            related_type,
            &[Cond::in_list("id", values)],
        ) {
            Ok(related) => related,
            Err(e) => {
                warn!(
                    message = "Failed to load related rows, omitting",
                    related_type = related_type,
                    error = %e
                );
                return;
            }
        };

        // The link query orders by created_at DESC; keep that order in the
        // reference list and the embedded objects.
        let mut by_id: HashMap<i64, Row> = related
            .into_iter()
            .filter_map(|object| object.row_id().map(|id| (id, object)))
            .collect();

        let mut list = match row.remove(list_key) {
            Some(CellValue::RefList(list)) => list,
            _ => Vec::new(),
        };
        for id in &ids {
            if let Some(object) = by_id.remove(id) {
                if let Some(reference) = object.reference_key() {
                    list.push(reference);
                }
                local_include.push(object);
            }
        }
        row.insert(list_key.to_string(), CellValue::RefList(list));
    }

    /// Resolve a file column against its local sync folder: returns the
    /// entries with base64 `contents` attached. Entries whose file cannot be
    /// read are skipped.
    pub fn file_from_local_store(
        &self,
        table_name: &str,
        column_name: &str,
        files: &[FileEntry],
    ) -> Result<Vec<FileEntry>, CoreError> {
        let folder = self
            .asset_folder(table_name, column_name)
            .ok_or_else(|| CoreError::BadRequest("not a synced folder".to_string()))?;

        let mut resolved = Vec::new();
        for file in files {
            let src = match &file.src {
                Some(src) => src,
                None => {
                    warn!(
                        message = "File has no source",
                        table_name = table_name,
                        column = column_name
                    );
                    continue;
                }
            };

            let relative: PathBuf = src.split('/').collect();
            let path = folder.local_sync_path.join(relative);
            match std::fs::read(&path) {
                Ok(bytes) => {
                    let mut item = file.clone();
                    item.reference_id = file.name.clone();
                    item.contents = Some(BASE64.encode(bytes));
                    resolved.push(item);
                }
                Err(e) => {
                    warn!(
                        message = "Failed to read file on storage",
                        path = ?path,
                        error = %e
                    );
                }
            }
        }
        Ok(resolved)
    }
}

/// Raw scanned rows to the row map contract: every row gets the synthetic
/// `__type` key, and a binary `reference_id` cell is rendered to uuid text.
pub(crate) fn rows_to_map(raw: Vec<Row>, type_name: &str) -> Vec<Row> {
    raw.into_iter()
        .map(|mut row| {
            let binary_reference = match row.get("reference_id") {
                Some(CellValue::Blob(bytes)) => ReferenceId::from_slice(bytes).ok(),
                _ => None,
            };
            if let Some(reference) = binary_reference {
                row.insert(
                    "reference_id".to_string(),
                    CellValue::Text(reference.to_string()),
                );
            }
            row.insert(
                TYPE_KEY.to_string(),
                CellValue::Text(type_name.to_string()),
            );
            row
        })
        .collect()
}

fn file_entry_row(file: &FileEntry) -> Row {
    let mut row = Row::new();
    if let Some(name) = &file.name {
        row.insert("name".to_string(), CellValue::Text(name.clone()));
    }
    if let Some(path) = &file.path {
        row.insert("path".to_string(), CellValue::Text(path.clone()));
    }
    if let Some(file_type) = &file.file_type {
        row.insert("type".to_string(), CellValue::Text(file_type.clone()));
    }
    if let Some(src) = &file.src {
        row.insert("src".to_string(), CellValue::Text(src.clone()));
    }
    if let Some(reference_id) = &file.reference_id {
        row.insert(
            "reference_id".to_string(),
            CellValue::Text(reference_id.clone()),
        );
    }
    if let Some(contents) = &file.contents {
        row.insert("contents".to_string(), CellValue::Text(contents.clone()));
    }
    for (key, value) in &file.extra {
        row.insert(key.clone(), json_to_cell(value));
    }
    row
}

fn json_to_cell(value: &serde_json::Value) -> CellValue {
    match value {
        serde_json::Value::Null => CellValue::Null,
        serde_json::Value::Bool(b) => CellValue::Integer(*b as i64),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else {
                CellValue::Real(n.as_f64().unwrap_or_default())
            }
        }
        serde_json::Value::String(s) => CellValue::Text(s.clone()),
        other => CellValue::Text(other.to_string()),
    }
}
