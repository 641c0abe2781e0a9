use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open or configure the database: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("failed to run migrations: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("database query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("stored row at {table} was malformed: {reason}")]
    MalformedRow { table: &'static str, reason: String },
}

impl From<StoreError> for guard_protocol::ErrorKind {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Query(sqlx::Error::PoolTimedOut) => {
                guard_protocol::ErrorKind::ExternalTransient(err.to_string())
            }
            other => guard_protocol::ErrorKind::Fatal(other.to_string()),
        }
    }
}
