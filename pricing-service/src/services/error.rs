use crate::models::RuleEntityType;
use service_core::error::AppError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum PricingError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Rule store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("{entity} {id} was modified concurrently (expected version {expected}, found {actual})")]
    ConcurrentModification {
        entity: RuleEntityType,
        id: Uuid,
        expected: i64,
        actual: i64,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: RuleEntityType, id: Uuid },

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl PricingError {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            PricingError::Validation(_) => "validation",
            PricingError::StoreUnavailable(_) => "store_unavailable",
            PricingError::ConcurrentModification { .. } => "concurrent_modification",
            PricingError::Conflict(_) => "conflict",
            PricingError::NotFound { .. } => "not_found",
            PricingError::Internal(_) => "internal",
        }
    }
}

impl From<sqlx::Error> for PricingError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::WorkerCrashed => PricingError::StoreUnavailable(err.to_string()),
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                PricingError::Conflict(db_err.message().to_string())
            }
            other => PricingError::Internal(anyhow::Error::new(other)),
        }
    }
}

impl From<serde_json::Error> for PricingError {
    fn from(err: serde_json::Error) -> Self {
        PricingError::Internal(anyhow::Error::new(err))
    }
}

impl From<PricingError> for AppError {
    fn from(err: PricingError) -> Self {
        match err {
            PricingError::Validation(msg) => AppError::BadRequest(anyhow::anyhow!(msg)),
            PricingError::StoreUnavailable(msg) => {
                tracing::warn!(error = %msg, "Rule store unavailable");
                AppError::ServiceUnavailable
            }
            e @ PricingError::ConcurrentModification { .. } => {
                AppError::Conflict(anyhow::anyhow!(e.to_string()))
            }
            PricingError::Conflict(msg) => AppError::Conflict(anyhow::anyhow!(msg)),
            e @ PricingError::NotFound { .. } => AppError::NotFound(anyhow::anyhow!(e.to_string())),
            PricingError::Internal(e) => AppError::InternalError(e),
        }
    }
}
