//! Incremental WHERE-clause builder for the list and report queries.

use rusqlite::types::ToSql;

#[derive(Default)]
pub struct QueryFilter {
    clauses: Vec<String>,
    values: Vec<Box<dyn ToSql>>,
}

impl QueryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a clause with a single `?` placeholder.
    pub fn push<T: ToSql + 'static>(&mut self, clause: &str, value: T) -> &mut Self {
        self.clauses.push(clause.to_string());
        self.values.push(Box::new(value));
        self
    }

    pub fn push_opt<T: ToSql + 'static>(&mut self, clause: &str, value: Option<T>) -> &mut Self {
        if let Some(value) = value {
            self.push(clause, value);
        }
        self
    }

    /// Add a clause whose every `?` receives `%term%`. Blank terms are ignored.
    pub fn push_like(&mut self, clause: &str, term: Option<&str>) -> &mut Self {
        let Some(term) = term.map(str::trim).filter(|t| !t.is_empty()) else {
            return self;
        };
        let pattern = format!("%{}%", term);
        self.clauses.push(clause.to_string());
        for _ in 0..clause.matches('?').count() {
            self.values.push(Box::new(pattern.clone()));
        }
        self
    }

    /// Add a clause without bound values.
    pub fn push_raw(&mut self, clause: &str) -> &mut Self {
        self.clauses.push(clause.to_string());
        self
    }

    pub fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    pub fn params(&self) -> Vec<&dyn ToSql> {
        self.values.iter().map(|v| &**v as &dyn ToSql).collect()
    }
}
