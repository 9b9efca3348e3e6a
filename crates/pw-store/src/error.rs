use std::fmt;

#[derive(Debug)]
pub enum StoreError {
    /// Opening the connection, binding functions or creating the schema failed.
    Init(rusqlite::Error),
    /// A refresh, search or stats request failed.
    Query(rusqlite::Error),
    /// The worker thread could not be started.
    Spawn(std::io::Error),
    /// The worker stopped before answering.
    WorkerGone,
}

impl StoreError {
    pub(crate) fn into_init(self) -> Self {
        match self {
            StoreError::Query(e) => StoreError::Init(e),
            other => other,
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Init(e) => write!(f, "failed to initialize word store: {e}"),
            StoreError::Query(e) => write!(f, "word store query failed: {e}"),
            StoreError::Spawn(e) => write!(f, "failed to start word store worker: {e}"),
            StoreError::WorkerGone => write!(f, "word store worker is gone"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Init(e) | StoreError::Query(e) => Some(e),
            StoreError::Spawn(e) => Some(e),
            StoreError::WorkerGone => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Query(e)
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
