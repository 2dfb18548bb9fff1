//! Conversions from adapter-level failures into the domain error type.

use dealsync_domain::DealSyncError;

/// Newtype wrapper enabling `From` conversions without orphan-rule issues.
pub struct InfraError(pub DealSyncError);

impl From<InfraError> for DealSyncError {
    fn from(err: InfraError) -> Self {
        err.0
    }
}

impl From<rusqlite::Error> for InfraError {
    fn from(err: rusqlite::Error) -> Self {
        Self(DealSyncError::Database(err.to_string()))
    }
}

impl From<r2d2::Error> for InfraError {
    fn from(err: r2d2::Error) -> Self {
        Self(DealSyncError::Database(format!("connection pool: {err}")))
    }
}

impl From<reqwest::Error> for InfraError {
    fn from(err: reqwest::Error) -> Self {
        Self(DealSyncError::Network(err.to_string()))
    }
}

impl From<tokio::task::JoinError> for InfraError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_cancelled() {
            Self(DealSyncError::Internal("blocking task cancelled".into()))
        } else {
            Self(DealSyncError::Internal(format!("blocking task failed: {err}")))
        }
    }
}

/// Map a rusqlite error into the domain error type. Repositories handle
/// `QueryReturnedNoRows` themselves before reaching for this.
pub fn map_db_error(err: rusqlite::Error) -> DealSyncError {
    DealSyncError::from(InfraError::from(err))
}

/// Map a blocking-task join failure.
pub fn map_join_error(err: tokio::task::JoinError) -> DealSyncError {
    DealSyncError::from(InfraError::from(err))
}
