use rusqlite::types::Value;

use crate::query::condition::{render_where, Cond};

#[derive(Debug, Clone)]
struct Join {
    table: String,
    alias: String,
    left: String,
    right: String,
}

/// Parameterised SELECT over metadata-derived identifiers.
#[derive(Debug, Clone)]
pub struct Select {
    table: String,
    alias: Option<String>,
    columns: Vec<String>,
    joins: Vec<Join>,
    conditions: Vec<Cond>,
    order_by: Option<String>,
    limit: Option<u32>,
}

impl Select {
    pub fn from(table: &str) -> Select {
        Select {
            table: table.to_string(),
            alias: None,
            columns: vec![],
            joins: vec![],
            conditions: vec![],
            order_by: None,
            limit: None,
        }
    }

    pub fn from_alias(table: &str, alias: &str) -> Select {
        let mut select = Select::from(table);
        select.alias = Some(alias.to_string());
        select
    }

    /// A select expression, optionally qualified or aliased
    /// (`ug.reference_id AS groupreferenceid`). Empty list renders as `*`.
    pub fn column(mut self, expression: &str) -> Select {
        self.columns.push(expression.to_string());
        self
    }

    pub fn columns(mut self, expressions: &[&str]) -> Select {
        for expression in expressions {
            self.columns.push(expression.to_string());
        }
        self
    }

    pub fn join(mut self, table: &str, alias: &str, left: &str, right: &str) -> Select {
        self.joins.push(Join {
            table: table.to_string(),
            alias: alias.to_string(),
            left: left.to_string(),
            right: right.to_string(),
        });
        self
    }

    pub fn filter(mut self, condition: Cond) -> Select {
        self.conditions.push(condition);
        self
    }

    pub fn order_by_asc(mut self, column: &str) -> Select {
        self.order_by = Some(format!("{} ASC", column));
        self
    }

    pub fn order_by_desc(mut self, column: &str) -> Select {
        self.order_by = Some(format!("{} DESC", column));
        self
    }

    pub fn limit(mut self, count: u32) -> Select {
        self.limit = Some(count);
        self
    }

    pub fn to_sql(&self) -> (String, Vec<Value>) {
        let mut sql = String::from("SELECT ");
        if self.columns.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&self.columns.join(", "));
        }
        sql.push_str(" FROM ");
        sql.push_str(&self.table);
        if let Some(alias) = &self.alias {
            sql.push_str(" AS ");
            sql.push_str(alias);
        }
        for join in &self.joins {
            sql.push_str(" JOIN ");
            sql.push_str(&join.table);
            sql.push_str(" AS ");
            sql.push_str(&join.alias);
            sql.push_str(" ON ");
            sql.push_str(&join.left);
            sql.push_str(" = ");
            sql.push_str(&join.right);
        }

        let mut params = Vec::new();
        render_where(&self.conditions, &mut sql, &mut params);

        if let Some(order_by) = &self.order_by {
            sql.push_str(" ORDER BY ");
            sql.push_str(order_by);
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        (sql, params)
    }
}
