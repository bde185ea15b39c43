use thiserror::Error;

/// Policy-layer failures. The operation boundary flattens every error into
/// the coarse failure envelope; the classes below exist so refusals,
/// integrity violations, and store trouble stay distinguishable in logs.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// Authentication or authorization refused: wrong credentials, frozen
    /// account, not a leader, missing or invalid authority.
    #[error("invalid member: {0}")]
    InvalidMember(String),

    /// A referential-integrity expectation did not hold: a required row is
    /// absent, or a row that must be unique already exists.
    #[error("invalid row count: {0}")]
    InvalidRowCount(String),

    /// Underlying store failure.
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub type PolicyResult<T> = Result<T, PolicyError>;
