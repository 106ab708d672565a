use serde_json::Value;

use super::error::QueryError;
use super::spec::{CmpOp, Predicate, QuerySpec, SortKey};
use super::validate_ident;

/// A rendered statement: SQL text with `$n` placeholders plus the values to
/// bind, in order.
#[derive(Debug, Clone)]
pub struct SqlQuery {
    pub sql: String,
    pub binds: Vec<Value>,
}

/// Builds a parameterized SELECT for one table by chaining
/// filter -> sort -> project -> paginate, the same shape the HTTP layer
/// consumes a `QuerySpec` in. Methods take and return the builder; callers
/// are responsible for invoking them in that order (filter narrows before
/// pagination is computed).
#[derive(Debug, Clone)]
pub struct SelectBuilder {
    table: String,
    projection: Vec<String>,
    predicates: Vec<Predicate>,
    sort: Vec<SortKey>,
    limit: Option<i64>,
    offset: i64,
    guard_active: bool,
    columns: Option<&'static [&'static str]>,
}

impl SelectBuilder {
    pub fn new(table: &str) -> Result<Self, QueryError> {
        validate_ident(table)?;
        Ok(Self {
            table: table.to_string(),
            projection: Vec::new(),
            predicates: Vec::new(),
            sort: Vec::new(),
            limit: None,
            offset: 0,
            guard_active: false,
            columns: None,
        })
    }

    /// Restrict client-supplied field names to a known column set. Without
    /// this, a well-formed but nonexistent column would pass the syntax check
    /// and only fail inside Postgres, masked as a 500.
    pub fn restrict_columns(mut self, columns: &'static [&'static str]) -> Self {
        self.columns = Some(columns);
        self
    }

    fn check_column(&self, field: &str) -> Result<(), QueryError> {
        validate_ident(field)?;
        match self.columns {
            Some(cols) if !cols.contains(&field) => {
                Err(QueryError::UnknownField(field.to_string()))
            }
            _ => Ok(()),
        }
    }

    /// Append `"active" = TRUE` to every rendered WHERE clause. Used for the
    /// users table so soft-deleted principals never appear in default reads.
    pub fn only_active(mut self) -> Self {
        self.guard_active = true;
        self
    }

    /// Apply a whole spec in the canonical order.
    pub fn apply(self, spec: &QuerySpec) -> Result<Self, QueryError> {
        Ok(self
            .filter(spec)?
            .sort(spec)?
            .project(spec)?
            .paginate(spec))
    }

    pub fn filter(mut self, spec: &QuerySpec) -> Result<Self, QueryError> {
        for p in &spec.predicates {
            self.check_column(&p.field)?;
        }
        self.predicates.extend(spec.predicates.iter().cloned());
        Ok(self)
    }

    /// Defaults to newest-first when the client sends no sort keys.
    pub fn sort(mut self, spec: &QuerySpec) -> Result<Self, QueryError> {
        if spec.sort.is_empty() {
            self.sort = vec![SortKey {
                field: "created_at".to_string(),
                descending: true,
            }];
        } else {
            for k in &spec.sort {
                self.check_column(&k.field)?;
            }
            self.sort = spec.sort.clone();
        }
        Ok(self)
    }

    pub fn project(mut self, spec: &QuerySpec) -> Result<Self, QueryError> {
        for f in &spec.fields {
            self.check_column(f)?;
        }
        self.projection = spec.fields.clone();
        Ok(self)
    }

    pub fn paginate(mut self, spec: &QuerySpec) -> Self {
        self.limit = Some(spec.limit);
        self.offset = spec.offset();
        self
    }

    /// Fixed equality constraint added outside the client-supplied spec.
    pub fn and_eq(mut self, field: &str, value: Value) -> Result<Self, QueryError> {
        self.check_column(field)?;
        self.predicates.push(Predicate {
            field: field.to_string(),
            op: CmpOp::Eq,
            value,
        });
        Ok(self)
    }

    pub fn to_sql(&self) -> SqlQuery {
        let projection = if self.projection.is_empty() {
            "*".to_string()
        } else {
            self.projection
                .iter()
                .map(|f| format!("\"{}\"", f))
                .collect::<Vec<_>>()
                .join(", ")
        };

        let (where_clause, binds) = self.where_clause();

        let mut sql = format!("SELECT {} FROM \"{}\"", projection, self.table);
        if !where_clause.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_clause);
        }
        if !self.sort.is_empty() {
            let order = self
                .sort
                .iter()
                .map(|k| {
                    format!(
                        "\"{}\" {}",
                        k.field,
                        if k.descending { "DESC" } else { "ASC" }
                    )
                })
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(" ORDER BY ");
            sql.push_str(&order);
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, self.offset));
        }

        SqlQuery { sql, binds }
    }

    pub fn to_count_sql(&self) -> SqlQuery {
        let (where_clause, binds) = self.where_clause();
        let mut sql = format!("SELECT COUNT(*) FROM \"{}\"", self.table);
        if !where_clause.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_clause);
        }
        SqlQuery { sql, binds }
    }

    fn where_clause(&self) -> (String, Vec<Value>) {
        let mut conditions = Vec::new();
        let mut binds = Vec::new();

        if self.guard_active {
            conditions.push("\"active\" = TRUE".to_string());
        }
        for p in &self.predicates {
            binds.push(p.value.clone());
            conditions.push(format!(
                "\"{}\" {} ${}",
                p.field,
                p.op.to_sql(),
                binds.len()
            ));
        }

        (conditions.join(" AND "), binds)
    }
}
