//! WHERE-clause assembly for the optional filters accepted by the read
//! operations. Filter values always travel as bound parameters, never
//! inline in the SQL text; column names are literals supplied by callers.

use rusqlite::types::ToSql;

#[derive(Default)]
pub struct Condition {
    clauses: Vec<String>,
    params: Vec<Box<dyn ToSql>>,
}

impl Condition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality clause when the filter value is present.
    pub fn eq<T>(mut self, column: &str, value: Option<T>) -> Self
    where
        T: ToSql + 'static,
    {
        if let Some(value) = value {
            self.params.push(Box::new(value));
            self.clauses
                .push(format!("{} = ?{}", column, self.params.len()));
        }
        self
    }

    /// The assembled fragment with a leading space, e.g.
    /// ` WHERE a = ?1 AND b = ?2` — empty when no filter was supplied.
    pub fn where_clause(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    pub fn params(&self) -> Vec<&dyn ToSql> {
        self.params.iter().map(AsRef::as_ref).collect()
    }
}
