use std::io;

/// Failure modes surfaced by [`crate::NamedSemaphore`] and [`crate::SharedSegment`].
///
/// Construction failures leave no artifacts: any partially-mapped segment is
/// unmapped and any semaphore acquired during construction is released
/// before the error is returned.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("name '{name}' is empty or exceeds the host's name length limit")]
    InvalidName { name: String },

    #[error("requested size {requested} is out of range (must be 1..={max})")]
    InvalidSize { requested: usize, max: usize },

    #[error(
        "existing segment '{name}' has size {actual}, expected {expected}"
    )]
    SizeMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("system call failed: {source}")]
    SystemError {
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
