use rusqlite::types::Value;

use crate::query::condition::{render_where, Cond};

#[derive(Debug, Clone)]
pub struct Insert {
    table: String,
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Insert {
    pub fn into_table(table: &str) -> Insert {
        Insert {
            table: table.to_string(),
            columns: vec![],
            values: vec![],
        }
    }

    pub fn value(mut self, column: &str, value: impl Into<Value>) -> Insert {
        self.columns.push(column.to_string());
        self.values.push(value.into());
        self
    }

    pub fn to_sql(&self) -> (String, Vec<Value>) {
        let placeholders = vec!["?"; self.columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table,
            self.columns.join(", "),
            placeholders
        );
        (sql, self.values.clone())
    }
}

#[derive(Debug, Clone)]
pub struct Update {
    table: String,
    sets: Vec<(String, Value)>,
    conditions: Vec<Cond>,
}

impl Update {
    pub fn table(table: &str) -> Update {
        Update {
            table: table.to_string(),
            sets: vec![],
            conditions: vec![],
        }
    }

    pub fn set(mut self, column: &str, value: impl Into<Value>) -> Update {
        self.sets.push((column.to_string(), value.into()));
        self
    }

    pub fn filter(mut self, condition: Cond) -> Update {
        self.conditions.push(condition);
        self
    }

    pub fn to_sql(&self) -> (String, Vec<Value>) {
        let mut sql = format!("UPDATE {} SET ", self.table);
        let mut params = Vec::new();
        for (i, (column, value)) in self.sets.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push_str(column);
            sql.push_str(" = ?");
            params.push(value.clone());
        }
        render_where(&self.conditions, &mut sql, &mut params);
        (sql, params)
    }
}

#[derive(Debug, Clone)]
pub struct Delete {
    table: String,
    conditions: Vec<Cond>,
}

impl Delete {
    pub fn from(table: &str) -> Delete {
        Delete {
            table: table.to_string(),
            conditions: vec![],
        }
    }

    pub fn filter(mut self, condition: Cond) -> Delete {
        self.conditions.push(condition);
        self
    }

    pub fn to_sql(&self) -> (String, Vec<Value>) {
        let mut sql = format!("DELETE FROM {}", self.table);
        let mut params = Vec::new();
        render_where(&self.conditions, &mut sql, &mut params);
        (sql, params)
    }
}
