use thiserror::Error;

/// Error surfaced by a storage backend adapter. `NotFound` is kept as its
/// own variant so callers can tell an absent object apart from a service
/// failure; everything else is carried as the provider's own message.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Service(String),
}

/// Public error taxonomy of the storage client. Validation errors are
/// returned before any network call; everything else wraps an
/// [`AdapterError`] together with the resolved object key.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("bucket name missing")]
    MissingBucketName,

    #[error("file path missing")]
    MissingFilePath,

    #[error("file name missing")]
    MissingFileName,

    #[error("storage client is closed")]
    ClientClosed,

    #[error("error creating storage client: {source}")]
    CreateClient { source: AdapterError },

    #[error("cloud file inaccessible: {key}, {source}")]
    Inaccessible { key: String, source: AdapterError },

    #[error("error uploading file: {key}, {source}")]
    Upload { key: String, source: AdapterError },

    #[error("error downloading file: {key}, {source}")]
    Download { key: String, source: AdapterError },

    #[error("error reading file: {key}, {source}")]
    Read { key: String, source: AdapterError },

    /// Iteration failed partway; `collected` holds the names gathered
    /// before the failing page or delete.
    #[error("error listing storage bucket objects: {source}")]
    List {
        collected: Vec<String>,
        source: AdapterError,
    },

    #[error("error deleting storage bucket object: {key}, {source}")]
    Delete { key: String, source: AdapterError },

    #[error("error closing storage client: {source}")]
    Close { source: AdapterError },
}
