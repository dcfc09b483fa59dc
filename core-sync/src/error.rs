use core_library::LibraryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    /// Another pass holds the busy flag; the trigger should be skipped.
    #[error("Synchronization already in progress")]
    SyncInProgress,

    /// The status store could not be reached. Never recovered locally.
    #[error("Status store unavailable: {0}")]
    StoreUnavailable(#[source] LibraryError),
}

impl SyncError {
    pub fn is_in_progress(&self) -> bool {
        matches!(self, SyncError::SyncInProgress)
    }
}

impl From<LibraryError> for SyncError {
    fn from(err: LibraryError) -> Self {
        SyncError::StoreUnavailable(err)
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
