use thiserror::Error;

/// Library error type for gallery setup operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A configured asset or catalog directory is missing or unreadable.
    #[error("invalid poster directory: {0}")]
    BadDir(String),

    /// The catalog loaded or discovered no posters.
    #[error("poster catalog is empty")]
    EmptyCatalog,

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Poster metadata (JSON) could not be parsed.
    #[error(transparent)]
    Catalog(#[from] serde_json::Error),
}

/// Why the asset resolver could not produce an image for a poster.
///
/// These never reach loader callers; the loader swaps in a placeholder.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("asset not found: {0}")]
    Missing(String),

    #[error("failed to decode {filename}: {source}")]
    Decode {
        filename: String,
        #[source]
        source: image::ImageError,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by [`crate::tasks::loader::LoaderHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LoaderError {
    /// The loader task is no longer running.
    #[error("texture loader is not running")]
    Closed,
}
