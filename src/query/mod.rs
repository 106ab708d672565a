pub mod error;
pub mod select;
pub mod spec;

pub use error::QueryError;
pub use select::{SelectBuilder, SqlQuery};
pub use spec::{CmpOp, Predicate, QuerySpec, SortKey};

/// Identifiers (tables, columns) are interpolated into SQL text, so they are
/// validated here; values never are, they always go through bind parameters.
pub(crate) fn validate_ident(name: &str) -> Result<(), QueryError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(QueryError::InvalidIdentifier(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_identifiers() {
        assert!(validate_ident("price").is_ok());
        assert!(validate_ident("ratings_average").is_ok());
        assert!(validate_ident("_hidden").is_ok());
    }

    #[test]
    fn rejects_injection_shaped_identifiers() {
        assert!(validate_ident("").is_err());
        assert!(validate_ident("1price").is_err());
        assert!(validate_ident("price; DROP TABLE tours").is_err());
        assert!(validate_ident("\"price\"").is_err());
    }
}
