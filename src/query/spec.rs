use std::collections::HashMap;

use serde_json::Value;

use crate::config::QueryConfig;

use super::error::QueryError;
use super::validate_ident;

/// Reserved keys that control the shape of the result rather than filter it.
const CONTROL_KEYS: &[&str] = &["page", "sort", "limit", "fields"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CmpOp {
    pub fn to_sql(self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Gt => ">",
            CmpOp::Gte => ">=",
            CmpOp::Lt => "<",
            CmpOp::Lte => "<=",
        }
    }

    fn parse(op: &str) -> Result<Self, QueryError> {
        match op {
            "gt" => Ok(CmpOp::Gt),
            "gte" => Ok(CmpOp::Gte),
            "lt" => Ok(CmpOp::Lt),
            "lte" => Ok(CmpOp::Lte),
            other => Err(QueryError::UnsupportedOperator(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Predicate {
    pub field: String,
    pub op: CmpOp,
    pub value: Value,
}

#[derive(Debug, Clone)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

/// Ephemeral description of one request's filter / sort / projection /
/// pagination, parsed from the raw query-string map. Consumed once by a
/// `SelectBuilder`, never persisted.
#[derive(Debug, Clone, Default)]
pub struct QuerySpec {
    pub predicates: Vec<Predicate>,
    pub sort: Vec<SortKey>,
    pub fields: Vec<String>,
    pub page: i64,
    pub limit: i64,
}

impl QuerySpec {
    /// Parse request parameters. Filter keys are either `field` (equality) or
    /// `field[op]` with op one of gte/gt/lte/lt; everything else about the
    /// key is rejected rather than interpolated. Page and limit coerce
    /// silently to their defaults on non-numeric input, mirroring the lax
    /// upstream behavior, but limit is capped at `config.max_page_size`.
    pub fn from_params(
        params: &HashMap<String, String>,
        config: &QueryConfig,
    ) -> Result<Self, QueryError> {
        let mut predicates = Vec::new();
        for (key, value) in params {
            if CONTROL_KEYS.contains(&key.as_str()) {
                continue;
            }
            predicates.push(parse_predicate(key, value)?);
        }
        // HashMap iteration order is arbitrary; keep output deterministic
        predicates.sort_by(|a, b| a.field.cmp(&b.field));

        let sort = match params.get("sort") {
            Some(raw) => parse_sort(raw)?,
            None => Vec::new(),
        };

        let fields = match params.get("fields") {
            Some(raw) => parse_fields(raw)?,
            None => Vec::new(),
        };

        let page = params
            .get("page")
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(1);

        let limit = params
            .get("limit")
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|l| *l >= 1)
            .unwrap_or(config.default_page_size)
            .min(config.max_page_size);

        Ok(Self {
            predicates,
            sort,
            fields,
            page,
            limit,
        })
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }

    /// Add a fixed equality predicate, e.g. scoping reviews to a tour.
    pub fn with_eq(mut self, field: &str, value: Value) -> Result<Self, QueryError> {
        validate_ident(field)?;
        self.predicates.push(Predicate {
            field: field.to_string(),
            op: CmpOp::Eq,
            value,
        });
        Ok(self)
    }
}

fn parse_predicate(key: &str, value: &str) -> Result<Predicate, QueryError> {
    let (field, op) = match key.find('[') {
        Some(open) if key.ends_with(']') => {
            let field = &key[..open];
            let op = CmpOp::parse(&key[open + 1..key.len() - 1])?;
            (field, op)
        }
        Some(_) => return Err(QueryError::InvalidIdentifier(key.to_string())),
        None => (key, CmpOp::Eq),
    };
    validate_ident(field)?;

    Ok(Predicate {
        field: field.to_string(),
        op,
        value: coerce_value(value),
    })
}

fn parse_sort(raw: &str) -> Result<Vec<SortKey>, QueryError> {
    let mut keys = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (field, descending) = match part.strip_prefix('-') {
            Some(stripped) => (stripped, true),
            None => (part, false),
        };
        validate_ident(field)?;
        keys.push(SortKey {
            field: field.to_string(),
            descending,
        });
    }
    Ok(keys)
}

fn parse_fields(raw: &str) -> Result<Vec<String>, QueryError> {
    let mut fields = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        validate_ident(part)?;
        fields.push(part.to_string());
    }
    Ok(fields)
}

/// Query-string values are untyped text; numeric-looking values bind as
/// numbers so range predicates compare numerically, booleans as booleans.
fn coerce_value(raw: &str) -> Value {
    if let Ok(i) = raw.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return Value::from(f);
    }
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(raw.to_string()),
    }
}
