//! Abstract storage traits for the contact store.
//!
//! These traits define the contract that storage backends must implement.
//! By using traits, we enable:
//! - In-memory backends for testing and embedded use
//! - Durable backends (SQL, KV) for production
//!
//! Every reconcile call runs inside one transaction: [`ContactStore::begin`]
//! opens the scope and returns a [`ContactTx`] carrying the full query and
//! write surface. The transaction must provide isolation equivalent to
//! serializability across the contacts it touches, and must roll back on
//! every non-commit path, including drop.

use thiserror::Error;

use crate::contact::{Contact, ContactId, LinkPrecedence, NewContact};

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Contact not found.
    #[error("contact not found: {0}")]
    ContactNotFound(ContactId),

    /// The backend could not be reached or is temporarily down. Retriable.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// A concurrent transaction conflicted with this one. Retriable.
    #[error("transaction conflict: {0}")]
    TransactionConflict(String),

    /// Backend-specific failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Transaction factory for contact storage.
pub trait ContactStore: Send + Sync {
    /// Opens a transaction scoping one reconcile call.
    ///
    /// # Errors
    ///
    /// `Unavailable` if the backend cannot open a scope.
    fn begin(&self) -> Result<Box<dyn ContactTx + '_>, StorageError>;
}

/// Query and write surface of one open transaction.
///
/// Multi-result queries return contacts ordered by `created_at` ascending
/// with id ascending as tie-break; single-result lookups return the match
/// with the lowest id. Callers rely on these orders being stable.
pub trait ContactTx {
    /// Point lookup by id.
    fn get(&self, id: ContactId) -> Result<Option<Contact>, StorageError>;

    /// First contact whose email OR phone number equals the given values.
    ///
    /// Absent arguments do not constrain the match. Ties are broken by
    /// ascending id.
    fn find_one_matching(
        &self,
        email: Option<&str>,
        phone_number: Option<&str>,
    ) -> Result<Option<Contact>, StorageError>;

    /// Exact-existence check for a single email value.
    fn find_by_email(&self, email: &str) -> Result<Option<Contact>, StorageError>;

    /// Exact-existence check for a single phone value.
    fn find_by_phone(&self, phone_number: &str) -> Result<Option<Contact>, StorageError>;

    /// Every PRIMARY contact whose email or phone matches the given values,
    /// ordered oldest first (`created_at` asc, id asc).
    fn find_primaries_matching(
        &self,
        email: Option<&str>,
        phone_number: Option<&str>,
    ) -> Result<Vec<Contact>, StorageError>;

    /// Every contact linked to the given primary, ordered oldest first.
    fn find_linked(&self, primary: ContactId) -> Result<Vec<Contact>, StorageError>;

    /// Inserts a new contact, assigning its id and lifecycle timestamps.
    ///
    /// # Errors
    ///
    /// `ContactNotFound` if the payload links to a missing contact,
    /// `Backend` if the payload's precedence and link disagree.
    fn insert(&mut self, contact: NewContact) -> Result<Contact, StorageError>;

    /// Sets precedence and link target on every listed contact in one write.
    ///
    /// Returns the number of records updated.
    ///
    /// # Errors
    ///
    /// `ContactNotFound` on the first missing id; no partial application
    /// is observable after the transaction aborts.
    fn bulk_update_precedence(
        &mut self,
        ids: &[ContactId],
        precedence: LinkPrecedence,
        linked_to: Option<ContactId>,
    ) -> Result<usize, StorageError>;

    /// Makes every write in this transaction visible to later transactions.
    fn commit(self: Box<Self>) -> Result<(), StorageError>;

    /// Discards every write in this transaction.
    fn rollback(self: Box<Self>) -> Result<(), StorageError>;
}
