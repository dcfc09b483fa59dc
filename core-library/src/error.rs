use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    /// A row for this `(filename, category)` pair already exists.
    #[error("Record already exists: {filename} ({category})")]
    Conflict { filename: String, category: String },

    #[error("Invalid input: {field} - {message}")]
    InvalidInput { field: String, message: String },

    /// A stored row could not be mapped back into a model.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Migration failed: {0}")]
    Migration(String),
}

impl LibraryError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, LibraryError::Conflict { .. })
    }
}

pub type Result<T> = std::result::Result<T, LibraryError>;
