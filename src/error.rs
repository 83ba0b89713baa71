use thiserror::Error;

/// Failure reading or writing an entry of an [`ArtifactStore`](crate::storage::ArtifactStore)
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no such file in storage: {0}")]
    NotFound(String),
    #[error("cannot access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum AsperityError {
    /// The topography cannot be analyzed at all. Raised before any solver call.
    #[error("Incompatible topography: {0}")]
    IncompatibleTopography(String),
    /// The solver could not produce a field solution for a step.
    #[error("Solver error: {0}")]
    Solver(String),
    #[error("Input error: {0}")]
    Input(String),
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
    #[error("Archive error: {0}")]
    Archive(String),
}

impl From<argmin::core::Error> for AsperityError {
    fn from(err: argmin::core::Error) -> Self {
        AsperityError::Solver(err.to_string())
    }
}

impl From<zip::result::ZipError> for AsperityError {
    fn from(err: zip::result::ZipError) -> Self {
        AsperityError::Archive(err.to_string())
    }
}
