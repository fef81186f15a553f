use rusqlite::types::Value;

/// One WHERE conjunct. Column identifiers always come from table metadata,
/// values are always bound parameters.
#[derive(Debug, Clone)]
pub enum Cond {
    Eq(String, Value),
    In(String, Vec<Value>),
    Like(String, String),
    NotLike(String, String),
    Raw(String),
}

impl Cond {
    pub fn eq(column: &str, value: impl Into<Value>) -> Cond {
        Cond::Eq(column.to_string(), value.into())
    }

    pub fn eq_text(column: &str, value: impl ToString) -> Cond {
        Cond::Eq(column.to_string(), Value::Text(value.to_string()))
    }

    pub fn in_list(column: &str, values: Vec<Value>) -> Cond {
        Cond::In(column.to_string(), values)
    }

    pub fn like(column: &str, pattern: &str) -> Cond {
        Cond::Like(column.to_string(), pattern.to_string())
    }

    pub fn not_like(column: &str, pattern: &str) -> Cond {
        Cond::NotLike(column.to_string(), pattern.to_string())
    }

    /// Only for predicates assembled from metadata, never caller input.
    pub fn raw(sql: String) -> Cond {
        Cond::Raw(sql)
    }

    pub(crate) fn render(&self, sql: &mut String, params: &mut Vec<Value>) {
        match self {
            Cond::Eq(column, value) => {
                sql.push_str(column);
                sql.push_str(" = ?");
                params.push(value.clone());
            }
            Cond::In(column, values) => {
                if values.is_empty() {
                    // An empty id list must match nothing, not everything.
                    sql.push_str("1 = 0");
                    return;
                }
                sql.push_str(column);
                sql.push_str(" IN (");
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        sql.push_str(", ");
                    }
                    sql.push('?');
                    params.push(value.clone());
                }
                sql.push(')');
            }
            Cond::Like(column, pattern) => {
                sql.push_str(column);
                sql.push_str(" LIKE ?");
                params.push(Value::Text(pattern.clone()));
            }
            Cond::NotLike(column, pattern) => {
                sql.push_str(column);
                sql.push_str(" NOT LIKE ?");
                params.push(Value::Text(pattern.clone()));
            }
            Cond::Raw(fragment) => sql.push_str(fragment),
        }
    }
}

pub(crate) fn render_where(conditions: &[Cond], sql: &mut String, params: &mut Vec<Value>) {
    for (i, condition) in conditions.iter().enumerate() {
        sql.push_str(if i == 0 { " WHERE " } else { " AND " });
        condition.render(sql, params);
    }
}
