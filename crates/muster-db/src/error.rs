use thiserror::Error;

/// Database layer errors
#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] diesel::result::Error),

    #[error("Pool error: {0}")]
    PoolError(#[from] diesel_async::pooled_connection::bb8::RunError),

    #[error("Version conflict on instance {id}: expected version {expected}")]
    VersionConflict { id: uuid::Uuid, expected: i32 },

    #[error(transparent)]
    CoreError(#[from] muster_core::error::CoreError),
}

pub type DbResult<T> = std::result::Result<T, DbError>;
