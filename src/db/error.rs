use thiserror::Error;

/// Failures raised at the record store boundary.
///
/// Every SQL failure is logged where it happens and surfaced through this type
/// so callers can tell a failed query apart from an empty result.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to open the database connection pool: {0}")]
    Connect(sqlx::Error),

    #[error("database statement failed: {0}")]
    Query(#[from] sqlx::Error),
}
