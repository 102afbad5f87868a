use sea_orm::error::DbErr;
use serde::Serialize;

/// Error type shared by every service in the crate.
///
/// Stock-integrity failures (`InsufficientStock`,
/// `InsufficientAvailableStock`) abort the whole operation with no partial
/// ledger or inventory mutation; callers surface them as rejected actions.
/// Nothing here is retried automatically.
#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        DbErr,
    ),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Part {0} not found")]
    PartNotFound(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("Insufficient available stock: {0}")]
    InsufficientAvailableStock(String),

    #[error("Rollback unsupported: {0}")]
    RollbackUnsupported(String),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(
        #[from]
        #[serde(skip)]
        anyhow::Error,
    ),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

pub trait IntoDbErr {
    fn into_db_err(self) -> DbErr;
}

impl IntoDbErr for DbErr {
    fn into_db_err(self) -> DbErr {
        self
    }
}

impl IntoDbErr for String {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self)
    }
}

impl IntoDbErr for &str {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self.to_string())
    }
}

impl ServiceError {
    /// Generic constructor that normalizes any supported database error input.
    pub fn db_error<E: IntoDbErr>(error: E) -> Self {
        ServiceError::DatabaseError(error.into_db_err())
    }

    /// True for errors that indicate a stock-integrity violation rather than
    /// an infrastructure failure.
    pub fn is_stock_integrity(&self) -> bool {
        matches!(
            self,
            Self::InsufficientStock(_) | Self::InsufficientAvailableStock(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_error_normalization() {
        let from_str = ServiceError::db_error("boom");
        assert!(matches!(
            from_str,
            ServiceError::DatabaseError(DbErr::Custom(_))
        ));
    }

    #[test]
    fn test_stock_integrity_classification() {
        assert!(ServiceError::InsufficientStock("x".into()).is_stock_integrity());
        assert!(ServiceError::InsufficientAvailableStock("x".into()).is_stock_integrity());
        assert!(!ServiceError::NotFound("x".into()).is_stock_integrity());
    }
}
