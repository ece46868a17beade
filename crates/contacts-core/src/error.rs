use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, ContactsError>;

#[derive(Debug, Error)]
pub enum ContactsError {
    #[error("Storage error: {0}")]
    Storage(#[from] redb::Error),

    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Storage operation error: {0}")]
    StorageOperation(#[from] redb::StorageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Node not found: {0}")]
    NodeNotFound(Uuid),

    #[error("Link not found: {0}")]
    LinkNotFound(Uuid),

    #[error("Invalid link: {reason}")]
    InvalidLink { reason: String },

    #[error("Link restriction violated: {from} already holds {max} '{link_type}' link(s)")]
    LinkRestriction {
        from: Uuid,
        link_type: String,
        max: usize,
    },

    #[error("Wrong node kind for {id}: expected {expected}, found {found}")]
    WrongKind {
        id: Uuid,
        expected: String,
        found: String,
    },

    /// Bad arguments. Raised before any mutation happens.
    #[error("{0}")]
    Precondition(String),

    /// Pre-existing data corruption the engine refuses to repair.
    #[error("Internal consistency violation: {0}")]
    Consistency(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Owner thread is gone: {0}")]
    OwnerGone(String),
}

impl ContactsError {
    pub fn precondition(msg: impl Into<String>) -> Self {
        ContactsError::Precondition(msg.into())
    }

    pub fn consistency(msg: impl Into<String>) -> Self {
        ContactsError::Consistency(msg.into())
    }

    /// True for the argument-checking class of errors.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            ContactsError::Precondition(_) | ContactsError::WrongKind { .. }
        )
    }
}
