use serde::Serialize;
use serde_json::Value;
use sqlx::{postgres::PgArguments, postgres::PgRow, FromRow, PgPool, Row};
use uuid::Uuid;

use crate::error::ApiError;
use crate::query::{QueryError, QuerySpec, SelectBuilder, SqlQuery};

/// Generic read/delete access for one table, parameterized by the row type.
/// Inserts and updates stay model-specific; listing goes through the query
/// builder so every resource gets the same filter/sort/project/paginate
/// surface.
pub struct Repository<T> {
    table: &'static str,
    pool: PgPool,
    only_active: bool,
    columns: Option<&'static [&'static str]>,
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Repository<T>
where
    T: for<'r> FromRow<'r, PgRow> + Serialize + Send + Unpin,
{
    pub fn new(table: &'static str, pool: PgPool) -> Self {
        Self {
            table,
            pool,
            only_active: false,
            columns: None,
            _phantom: std::marker::PhantomData,
        }
    }

    /// Exclude soft-deleted rows from every read. Used for the users table.
    pub fn with_active_guard(mut self) -> Self {
        self.only_active = true;
        self
    }

    /// Columns that client filter/sort/projection keys may name. A key
    /// naming anything else is rejected as a 400 before it reaches Postgres.
    pub fn with_columns(mut self, columns: &'static [&'static str]) -> Self {
        self.columns = Some(columns);
        self
    }

    fn builder(&self) -> Result<SelectBuilder, ApiError> {
        let mut builder = SelectBuilder::new(self.table)?;
        if self.only_active {
            builder = builder.only_active();
        }
        if let Some(columns) = self.columns {
            builder = builder.restrict_columns(columns);
        }
        Ok(builder)
    }

    /// Rows are always fetched with their full column set and decoded into
    /// the typed struct, whose serializer is what hides credential fields.
    /// A `fields=` projection is then applied to the serialized output; a
    /// SQL-level projection would leave the row short of columns the typed
    /// decode requires.
    pub async fn list(&self, spec: &QuerySpec) -> Result<Vec<Value>, ApiError> {
        self.check_fields(spec)?;
        let query = self
            .builder()?
            .filter(spec)?
            .sort(spec)?
            .paginate(spec)
            .to_sql();
        let rows: Vec<T> = self.fetch_all(&query).await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let mut value = serde_json::to_value(row).map_err(|e| {
                tracing::error!("row serialization failed: {}", e);
                ApiError::internal("An error occurred while processing your request")
            })?;
            apply_projection(&mut value, &spec.fields);
            out.push(value);
        }
        Ok(out)
    }

    pub async fn count(&self, spec: &QuerySpec) -> Result<i64, ApiError> {
        let query = self.builder()?.filter(spec)?.to_count_sql();
        let mut q = sqlx::query(&query.sql);
        for value in &query.binds {
            q = bind_value(q, value);
        }
        let row = q.fetch_one(&self.pool).await.map_err(ApiError::from)?;
        let count: i64 = row.try_get(0).map_err(ApiError::from)?;
        Ok(count)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<T, ApiError> {
        let guard = if self.only_active {
            " AND \"active\" = TRUE"
        } else {
            ""
        };
        let sql = format!(
            "SELECT * FROM \"{}\" WHERE \"id\" = $1{}",
            self.table, guard
        );
        sqlx::query_as::<_, T>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(ApiError::from)?
            .ok_or_else(|| ApiError::not_found("No record found with that ID"))
    }

    pub async fn delete_by_id(&self, id: Uuid) -> Result<(), ApiError> {
        let sql = format!("DELETE FROM \"{}\" WHERE \"id\" = $1", self.table);
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(ApiError::from)?;
        if result.rows_affected() == 0 {
            return Err(ApiError::not_found("No record found with that ID"));
        }
        Ok(())
    }

    fn check_fields(&self, spec: &QuerySpec) -> Result<(), ApiError> {
        if let Some(columns) = self.columns {
            for field in &spec.fields {
                if !columns.contains(&field.as_str()) {
                    return Err(QueryError::UnknownField(field.clone()).into());
                }
            }
        }
        Ok(())
    }

    async fn fetch_all(&self, query: &SqlQuery) -> Result<Vec<T>, ApiError> {
        let mut q = sqlx::query_as::<_, T>(&query.sql);
        for value in &query.binds {
            q = bind_value_as(q, value);
        }
        q.fetch_all(&self.pool).await.map_err(ApiError::from)
    }
}

/// Keep only the requested fields of a serialized row. An empty field list
/// means no projection. Fields the serializer already dropped (credential
/// and reset columns) simply stay absent.
fn apply_projection(value: &mut Value, fields: &[String]) {
    if fields.is_empty() {
        return;
    }
    if let Value::Object(obj) = value {
        obj.retain(|key, _| fields.iter().any(|f| f == key));
    }
}

// Bind a JSON value onto a query using the closest Postgres type. UUID-shaped
// strings bind as UUID so dynamic predicates work against id columns.
fn bind_value<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &'q Value,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match v {
        Value::Null => q.bind(Option::<String>::None),
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => match Uuid::parse_str(s) {
            Ok(uuid) => q.bind(uuid),
            Err(_) => q.bind(s),
        },
        other => q.bind(other.clone()),
    }
}

fn bind_value_as<'q, O>(
    q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>,
    v: &'q Value,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, PgRow>,
{
    match v {
        Value::Null => q.bind(Option::<String>::None),
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => match Uuid::parse_str(s) {
            Ok(uuid) => q.bind(uuid),
            Err(_) => q.bind(s),
        },
        other => q.bind(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn projection_keeps_only_requested_fields() {
        let mut row = json!({
            "id": "abc",
            "name": "The Forest Hiker",
            "price": 397.0,
            "created_at": "2026-01-01T00:00:00Z",
        });
        apply_projection(&mut row, &["name".to_string(), "price".to_string()]);

        let obj = row.as_object().expect("object");
        assert_eq!(obj.len(), 2);
        assert!(obj.contains_key("name"));
        assert!(obj.contains_key("price"));
        assert!(!obj.contains_key("id"));
    }

    #[test]
    fn empty_projection_leaves_the_row_untouched() {
        let mut row = json!({ "id": "abc", "name": "The Forest Hiker" });
        apply_projection(&mut row, &[]);
        assert_eq!(row.as_object().expect("object").len(), 2);
    }

    #[test]
    fn projecting_an_absent_field_yields_no_phantom_key() {
        // Serializer-hidden columns stay hidden even when named explicitly
        let mut row = json!({ "id": "abc", "name": "Ada" });
        apply_projection(&mut row, &["name".to_string(), "password_hash".to_string()]);

        let obj = row.as_object().expect("object");
        assert_eq!(obj.len(), 1);
        assert!(!obj.contains_key("password_hash"));
    }
}
