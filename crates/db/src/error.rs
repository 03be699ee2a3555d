//! Mapping from `SeaORM` errors to the core storage error.

use sea_orm::DbErr;
use tally_core::StoreError;

/// Converts a database error into the storage error the core understands.
pub(crate) fn store_error(err: DbErr) -> StoreError {
    match err {
        DbErr::RecordNotFound(msg) => StoreError::NotFound(msg),
        DbErr::RecordNotUpdated => StoreError::Conflict("record was modified concurrently".to_string()),
        other => StoreError::Database(other.to_string()),
    }
}

/// Converts a stored token count back into the in-memory width.
pub(crate) fn token_count(column: &str, value: i64) -> Result<u32, StoreError> {
    u32::try_from(value)
        .map_err(|_| StoreError::Database(format!("{column} out of range: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_not_found() {
        let err = store_error(DbErr::RecordNotFound("expense".to_string()));
        assert!(matches!(err, StoreError::NotFound(msg) if msg == "expense"));
    }

    #[test]
    fn test_not_updated_maps_to_conflict() {
        assert!(matches!(store_error(DbErr::RecordNotUpdated), StoreError::Conflict(_)));
    }

    #[test]
    fn test_other_errors_map_to_database() {
        let err = store_error(DbErr::Custom("boom".to_string()));
        assert!(matches!(err, StoreError::Database(msg) if msg.contains("boom")));
    }

    #[test]
    fn test_token_count_rejects_negative() {
        assert_eq!(token_count("input_tokens", 42).unwrap(), 42);
        assert!(token_count("input_tokens", -1).is_err());
        assert!(token_count("input_tokens", i64::from(u32::MAX) + 1).is_err());
    }
}
