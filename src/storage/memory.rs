//! In-memory storage backend.
//!
//! A thread-safe reference implementation of the contact store, intended
//! for embedded usage and tests. Transactions hold the state lock for
//! their whole lifetime, which serializes reconcile calls completely, and
//! keep an entry snapshot so that rollback (explicit or by drop) restores
//! the exact pre-transaction state.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use crate::contact::{Contact, ContactId, LinkPrecedence, NewContact, RecordMeta};
use crate::storage::traits::{ContactStore, ContactTx, StorageError};

fn lock_err(context: &'static str) -> StorageError {
    StorageError::Unavailable(format!("poisoned lock: {context}"))
}

#[derive(Debug, Clone, Default)]
struct ContactState {
    next_id: i64,
    by_id: BTreeMap<ContactId, Contact>,
    by_email: HashMap<String, BTreeSet<ContactId>>,
    by_phone: HashMap<String, BTreeSet<ContactId>>,
}

impl ContactState {
    fn index(&mut self, contact: &Contact) {
        if let Some(email) = contact.email() {
            self.by_email
                .entry(email.to_string())
                .or_default()
                .insert(contact.id);
        }
        if let Some(phone) = contact.phone_number() {
            self.by_phone
                .entry(phone.to_string())
                .or_default()
                .insert(contact.id);
        }
    }

    fn candidates(&self, email: Option<&str>, phone_number: Option<&str>) -> BTreeSet<ContactId> {
        let mut ids = BTreeSet::new();
        if let Some(email) = email {
            if let Some(matched) = self.by_email.get(email) {
                ids.extend(matched.iter().copied());
            }
        }
        if let Some(phone) = phone_number {
            if let Some(matched) = self.by_phone.get(phone) {
                ids.extend(matched.iter().copied());
            }
        }
        ids
    }
}

fn oldest_first(contacts: &mut [Contact]) {
    contacts.sort_by(|a, b| {
        a.meta
            .created_at
            .cmp(&b.meta.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Thread-safe in-memory contact store.
#[derive(Debug, Default)]
pub struct InMemoryContactStore {
    state: Mutex<ContactState>,
}

impl InMemoryContactStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored contact ordered by id, outside any transaction.
    ///
    /// Diagnostic surface for tests and inspection; blocks until no
    /// transaction is open.
    ///
    /// # Errors
    ///
    /// `Unavailable` if the state lock is poisoned.
    pub fn contacts(&self) -> Result<Vec<Contact>, StorageError> {
        let state = self.state.lock().map_err(|_| lock_err("contacts"))?;
        Ok(state.by_id.values().cloned().collect())
    }
}

impl ContactStore for InMemoryContactStore {
    fn begin(&self) -> Result<Box<dyn ContactTx + '_>, StorageError> {
        let state = self.state.lock().map_err(|_| lock_err("begin"))?;
        let snapshot = state.clone();
        Ok(Box::new(InMemoryTx {
            state,
            snapshot: Some(snapshot),
        }))
    }
}

struct InMemoryTx<'a> {
    state: MutexGuard<'a, ContactState>,
    // Present until commit; restored on rollback or drop.
    snapshot: Option<ContactState>,
}

impl ContactTx for InMemoryTx<'_> {
    fn get(&self, id: ContactId) -> Result<Option<Contact>, StorageError> {
        Ok(self.state.by_id.get(&id).cloned())
    }

    fn find_one_matching(
        &self,
        email: Option<&str>,
        phone_number: Option<&str>,
    ) -> Result<Option<Contact>, StorageError> {
        let first = self
            .state
            .candidates(email, phone_number)
            .into_iter()
            .next();
        Ok(first.and_then(|id| self.state.by_id.get(&id).cloned()))
    }

    fn find_by_email(&self, email: &str) -> Result<Option<Contact>, StorageError> {
        self.find_one_matching(Some(email), None)
    }

    fn find_by_phone(&self, phone_number: &str) -> Result<Option<Contact>, StorageError> {
        self.find_one_matching(None, Some(phone_number))
    }

    fn find_primaries_matching(
        &self,
        email: Option<&str>,
        phone_number: Option<&str>,
    ) -> Result<Vec<Contact>, StorageError> {
        let mut primaries: Vec<Contact> = self
            .state
            .candidates(email, phone_number)
            .into_iter()
            .filter_map(|id| self.state.by_id.get(&id))
            .filter(|contact| contact.is_primary())
            .cloned()
            .collect();
        oldest_first(&mut primaries);
        Ok(primaries)
    }

    fn find_linked(&self, primary: ContactId) -> Result<Vec<Contact>, StorageError> {
        let mut linked: Vec<Contact> = self
            .state
            .by_id
            .values()
            .filter(|contact| contact.linked_to == Some(primary))
            .cloned()
            .collect();
        oldest_first(&mut linked);
        Ok(linked)
    }

    fn insert(&mut self, contact: NewContact) -> Result<Contact, StorageError> {
        match (contact.link_precedence, contact.linked_to) {
            (LinkPrecedence::Secondary, None) => {
                return Err(StorageError::Backend(
                    "secondary contact requires a link target".to_string(),
                ));
            }
            (LinkPrecedence::Primary, Some(_)) => {
                return Err(StorageError::Backend(
                    "primary contact cannot carry a link target".to_string(),
                ));
            }
            _ => {}
        }

        if let Some(target) = contact.linked_to {
            if !self.state.by_id.contains_key(&target) {
                return Err(StorageError::ContactNotFound(target));
            }
        }

        self.state.next_id += 1;
        let record = Contact {
            id: ContactId::from_i64(self.state.next_id),
            email: contact.email,
            phone_number: contact.phone_number,
            link_precedence: contact.link_precedence,
            linked_to: contact.linked_to,
            meta: RecordMeta::at(Utc::now()),
        };

        self.state.index(&record);
        self.state.by_id.insert(record.id, record.clone());
        Ok(record)
    }

    fn bulk_update_precedence(
        &mut self,
        ids: &[ContactId],
        precedence: LinkPrecedence,
        linked_to: Option<ContactId>,
    ) -> Result<usize, StorageError> {
        match (precedence, linked_to) {
            (LinkPrecedence::Secondary, None) => {
                return Err(StorageError::Backend(
                    "secondary precedence requires a link target".to_string(),
                ));
            }
            (LinkPrecedence::Primary, Some(_)) => {
                return Err(StorageError::Backend(
                    "primary precedence cannot carry a link target".to_string(),
                ));
            }
            _ => {}
        }

        if let Some(target) = linked_to {
            if ids.contains(&target) {
                return Err(StorageError::Backend(
                    "cannot link a contact to itself".to_string(),
                ));
            }
            if !self.state.by_id.contains_key(&target) {
                return Err(StorageError::ContactNotFound(target));
            }
        }

        let now = Utc::now();
        let mut updated = 0;
        for id in ids {
            let contact = self
                .state
                .by_id
                .get_mut(id)
                .ok_or(StorageError::ContactNotFound(*id))?;
            contact.link_precedence = precedence;
            contact.linked_to = linked_to;
            contact.meta.touch(now);
            updated += 1;
        }
        Ok(updated)
    }

    fn commit(mut self: Box<Self>) -> Result<(), StorageError> {
        self.snapshot = None;
        Ok(())
    }

    fn rollback(mut self: Box<Self>) -> Result<(), StorageError> {
        if let Some(snapshot) = self.snapshot.take() {
            *self.state = snapshot;
        }
        Ok(())
    }
}

impl Drop for InMemoryTx<'_> {
    fn drop(&mut self) {
        // An abandoned transaction rolls back.
        if let Some(snapshot) = self.snapshot.take() {
            *self.state = snapshot;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert_primary(
        tx: &mut dyn ContactTx,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Contact {
        tx.insert(NewContact::primary(
            email.map(str::to_string),
            phone.map(str::to_string),
        ))
        .unwrap()
    }

    #[test]
    fn test_insert_assigns_monotonic_ids() {
        let store = InMemoryContactStore::new();
        let mut tx = store.begin().unwrap();

        let a = insert_primary(tx.as_mut(), Some("a@x.com"), None);
        let b = insert_primary(tx.as_mut(), Some("b@y.com"), None);
        assert!(a.id < b.id);
        assert!(a.meta.created_at <= b.meta.created_at);
        tx.commit().unwrap();

        assert_eq!(store.contacts().unwrap().len(), 2);
    }

    #[test]
    fn test_insert_rejects_malformed_links() {
        let store = InMemoryContactStore::new();
        let mut tx = store.begin().unwrap();

        let err = tx
            .insert(NewContact {
                email: None,
                phone_number: Some("123".to_string()),
                link_precedence: LinkPrecedence::Secondary,
                linked_to: None,
            })
            .unwrap_err();
        assert!(matches!(err, StorageError::Backend(_)));

        let err = tx
            .insert(NewContact::secondary(
                None,
                Some("123".to_string()),
                ContactId::from_i64(99),
            ))
            .unwrap_err();
        assert!(matches!(err, StorageError::ContactNotFound(_)));
    }

    #[test]
    fn test_find_one_matching_prefers_lowest_id() {
        let store = InMemoryContactStore::new();
        let mut tx = store.begin().unwrap();

        let first = insert_primary(tx.as_mut(), Some("a@x.com"), None);
        let _second = insert_primary(tx.as_mut(), None, Some("123"));

        // Phone matches a later record, email an earlier one; OR semantics
        // with id tie-break returns the earlier.
        let matched = tx
            .find_one_matching(Some("a@x.com"), Some("123"))
            .unwrap()
            .unwrap();
        assert_eq!(matched.id, first.id);

        let by_phone = tx.find_by_phone("123").unwrap().unwrap();
        assert_ne!(by_phone.id, first.id);

        assert!(tx.find_one_matching(Some("nope"), None).unwrap().is_none());
        assert!(tx.find_one_matching(None, None).unwrap().is_none());
    }

    #[test]
    fn test_find_primaries_matching_skips_secondaries() {
        let store = InMemoryContactStore::new();
        let mut tx = store.begin().unwrap();

        let primary = insert_primary(tx.as_mut(), Some("a@x.com"), None);
        let secondary = tx
            .insert(NewContact::secondary(
                Some("a@x.com".to_string()),
                Some("123".to_string()),
                primary.id,
            ))
            .unwrap();

        let primaries = tx
            .find_primaries_matching(Some("a@x.com"), Some("123"))
            .unwrap();
        assert_eq!(primaries.len(), 1);
        assert_eq!(primaries[0].id, primary.id);

        let linked = tx.find_linked(primary.id).unwrap();
        assert_eq!(linked.len(), 1);
        assert_eq!(linked[0].id, secondary.id);
    }

    #[test]
    fn test_bulk_update_demotes_and_relinks() {
        let store = InMemoryContactStore::new();
        let mut tx = store.begin().unwrap();

        let oldest = insert_primary(tx.as_mut(), Some("a@x.com"), None);
        let younger = insert_primary(tx.as_mut(), None, Some("123"));

        let updated = tx
            .bulk_update_precedence(&[younger.id], LinkPrecedence::Secondary, Some(oldest.id))
            .unwrap();
        assert_eq!(updated, 1);

        let demoted = tx.get(younger.id).unwrap().unwrap();
        assert_eq!(demoted.link_precedence, LinkPrecedence::Secondary);
        assert_eq!(demoted.linked_to, Some(oldest.id));
        assert!(demoted.meta.updated_at >= demoted.meta.created_at);
    }

    #[test]
    fn test_bulk_update_guards() {
        let store = InMemoryContactStore::new();
        let mut tx = store.begin().unwrap();
        let contact = insert_primary(tx.as_mut(), Some("a@x.com"), None);

        let err = tx
            .bulk_update_precedence(&[contact.id], LinkPrecedence::Secondary, Some(contact.id))
            .unwrap_err();
        assert!(matches!(err, StorageError::Backend(_)));

        let err = tx
            .bulk_update_precedence(&[contact.id], LinkPrecedence::Secondary, None)
            .unwrap_err();
        assert!(matches!(err, StorageError::Backend(_)));

        let err = tx
            .bulk_update_precedence(
                &[ContactId::from_i64(99)],
                LinkPrecedence::Secondary,
                Some(contact.id),
            )
            .unwrap_err();
        assert!(matches!(err, StorageError::ContactNotFound(_)));
    }

    #[test]
    fn test_rollback_discards_writes() {
        let store = InMemoryContactStore::new();

        let mut tx = store.begin().unwrap();
        insert_primary(tx.as_mut(), Some("a@x.com"), None);
        tx.rollback().unwrap();

        assert!(store.contacts().unwrap().is_empty());
    }

    #[test]
    fn test_dropped_transaction_rolls_back() {
        let store = InMemoryContactStore::new();

        {
            let mut tx = store.begin().unwrap();
            insert_primary(tx.as_mut(), Some("a@x.com"), None);
            // Dropped without commit: caller aborted mid-reconcile.
        }

        assert!(store.contacts().unwrap().is_empty());
    }

    #[test]
    fn test_commit_is_visible_to_later_transactions() {
        let store = InMemoryContactStore::new();

        let mut tx = store.begin().unwrap();
        let inserted = insert_primary(tx.as_mut(), Some("a@x.com"), Some("123"));
        tx.commit().unwrap();

        let tx = store.begin().unwrap();
        let found = tx.find_by_email("a@x.com").unwrap().unwrap();
        assert_eq!(found.id, inserted.id);
        tx.commit().unwrap();
    }
}
