pub mod error;
pub mod member;
pub mod ops;
pub mod project;
pub mod record;

pub use error::PolicyError;
pub use ops::Ledger;

use chrono::{DateTime, Utc};

use crate::error::PolicyResult;

/// Request timestamps arrive as unix seconds.
pub(crate) fn from_unix(seconds: i64) -> PolicyResult<DateTime<Utc>> {
    DateTime::from_timestamp(seconds, 0)
        .ok_or_else(|| PolicyError::Store(anyhow::anyhow!("timestamp {seconds} out of range")))
}
