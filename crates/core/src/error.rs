use std::path::PathBuf;

/// Why a marker line could not be turned into a [`crate::MarkerLine`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum MarkerFault {
    #[error("expected at least {expected} fields, found {found}")]
    TooFewFields { expected: usize, found: usize },
    #[error("invalid timestamp: {0}")]
    BadTimestamp(String),
    #[error("connection descriptor has {found} parts, expected 4: {descriptor}")]
    DescriptorParts { descriptor: String, found: usize },
    #[error("connection descriptor not found")]
    MissingDescriptor,
    #[error("expected key=value pair, found `{0}`")]
    InvalidPair(String),
    #[error("connection descriptor lacks `{0}`")]
    MissingKey(&'static str),
    #[error("duration not found")]
    MissingDuration,
}

/// A marker line that did not parse. Recoverable: the plan is skipped and
/// extraction continues with the next line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed plan marker at line {line_number}: {fault}")]
pub struct MalformedMarkerError {
    pub line_number: usize,
    pub fault: MarkerFault,
}

/// Persistence failure. Always fatal for the run.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SinkError {
    #[error("io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("database error: {0}")]
    Database(String),
    #[error("invalid connection string: {0}")]
    Connection(String),
}
