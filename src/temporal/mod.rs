//! Time values shared by every other module.

mod date_range;
mod duration;

pub use date_range::DateRange;
pub use duration::{Duration, TimeUnit};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemporalError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unsupported operation: {0}")]
    Unsupported(String),
}
