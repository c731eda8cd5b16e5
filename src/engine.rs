//! The contact identity reconciliation engine.
//!
//! Pure decision logic over a pluggable contact store: resolve an
//! observation to a cluster, decide whether a new record must be
//! materialized, flatten multi-primary collisions, and project the
//! consolidated view. The whole of a [`IdentityEngine::reconcile`] call
//! runs inside one store transaction, acquired at entry and released on
//! every exit path; the engine performs no observable mutation unless the
//! entire sequence commits.

use std::sync::Arc;

use crate::contact::{Contact, ContactId, LinkPrecedence, NewContact};
use crate::error::{IdlinkError, IdlinkResult};
use crate::identity::ConsolidatedIdentity;
use crate::observation::Observation;
use crate::storage::{ContactStore, ContactTx};

/// Contact identity reconciliation engine.
#[derive(Clone)]
pub struct IdentityEngine {
    store: Arc<dyn ContactStore>,
}

impl IdentityEngine {
    /// Create a new engine over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn ContactStore>) -> Self {
        Self { store }
    }

    /// Get a reference to the contact store.
    pub fn contact_store(&self) -> &Arc<dyn ContactStore> {
        &self.store
    }

    /// Resolves one observation into its consolidated identity.
    ///
    /// Safe to retry: a fully-committed call is a no-op when repeated,
    /// because a fully-redundant observation creates no records.
    ///
    /// # Errors
    ///
    /// - [`IdlinkError::Validation`] when the observation carries no usable
    ///   field.
    /// - [`IdlinkError::Storage`] when the store fails; retriable variants
    ///   are classified by [`IdlinkError::is_retriable`].
    /// - [`IdlinkError::InvariantViolation`] when cluster state is
    ///   inconsistent; never expected in correct operation.
    pub fn reconcile(&self, observation: &Observation) -> IdlinkResult<ConsolidatedIdentity> {
        observation.validate()?;

        let mut tx = self.store.begin()?;
        let outcome = reconcile_in_tx(tx.as_mut(), observation);
        match outcome {
            Ok(identity) => {
                tx.commit()?;
                tracing::debug!(
                    primary = identity.primary_contact_id.get(),
                    secondaries = identity.secondary_contact_ids.len(),
                    "reconcile committed"
                );
                Ok(identity)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    tracing::warn!(error = %rollback_err, "rollback failed after reconcile error");
                }
                Err(err)
            }
        }
    }
}

fn reconcile_in_tx(
    tx: &mut dyn ContactTx,
    observation: &Observation,
) -> IdlinkResult<ConsolidatedIdentity> {
    let email = observation.email();
    let phone = observation.phone_number();

    let Some(anchor) = tx.find_one_matching(email, phone)? else {
        tracing::debug!("no existing cluster, creating a new primary contact");
        let created = tx.insert(NewContact::primary(
            email.map(str::to_string),
            phone.map(str::to_string),
        ))?;
        return Ok(ConsolidatedIdentity::assemble(&created, &[]));
    };

    let primary = resolve_primary(tx, anchor)?;
    tracing::debug!(primary = primary.id.get(), "anchored observation to cluster");

    materialize_secondary(tx, email, phone, primary.id)?;
    let primary = flatten_primaries(tx, email, phone, primary)?;

    // Re-read: the surviving primary may have just been updated.
    let primary = tx
        .get(primary.id)?
        .ok_or_else(|| IdlinkError::invariant(format!("primary contact {} vanished", primary.id)))?;
    let secondaries = tx.find_linked(primary.id)?;
    Ok(ConsolidatedIdentity::assemble(&primary, &secondaries))
}

/// A secondary anchor always resolves to its primary before any further
/// reasoning; the engine never treats a secondary as a merge anchor.
fn resolve_primary(tx: &dyn ContactTx, anchor: Contact) -> IdlinkResult<Contact> {
    if anchor.is_primary() {
        return Ok(anchor);
    }

    let target = anchor.linked_to.ok_or_else(|| {
        IdlinkError::invariant(format!("secondary contact {} carries no link", anchor.id))
    })?;
    let primary = tx.get(target)?.ok_or_else(|| {
        IdlinkError::invariant(format!(
            "secondary contact {} links to missing contact {target}",
            anchor.id
        ))
    })?;
    if !primary.is_primary() {
        return Err(IdlinkError::invariant(format!(
            "secondary contact {} links to non-primary contact {target}",
            anchor.id
        )));
    }
    Ok(primary)
}

/// Creates one secondary iff the observation introduces at least one
/// previously-unseen field value. A fully-redundant observation creates
/// nothing, even when its two matches belong to different contacts.
fn materialize_secondary(
    tx: &mut dyn ContactTx,
    email: Option<&str>,
    phone: Option<&str>,
    primary: ContactId,
) -> IdlinkResult<()> {
    let email_seen = match email {
        Some(value) => tx.find_by_email(value)?.is_some(),
        None => true,
    };
    let phone_seen = match phone {
        Some(value) => tx.find_by_phone(value)?.is_some(),
        None => true,
    };

    if email_seen && phone_seen {
        return Ok(());
    }

    tracing::debug!(primary = primary.get(), "observation carries a new field value, creating a secondary contact");
    tx.insert(NewContact::secondary(
        email.map(str::to_string),
        phone.map(str::to_string),
        primary,
    ))?;
    Ok(())
}

/// Detects an observation bridging two clusters and restores the
/// one-primary invariant: the oldest primary survives, every other
/// matching primary is demoted under it, and the demoted primaries'
/// secondaries are reparented to the survivor in the same bulk write so
/// links keep resolving in a single hop.
fn flatten_primaries(
    tx: &mut dyn ContactTx,
    email: Option<&str>,
    phone: Option<&str>,
    current: Contact,
) -> IdlinkResult<Contact> {
    let primaries = tx.find_primaries_matching(email, phone)?;
    let Some((oldest, demoted)) = primaries.split_first() else {
        return Ok(current);
    };
    if demoted.is_empty() {
        return Ok(current);
    }

    let mut ids: Vec<ContactId> = demoted.iter().map(|contact| contact.id).collect();
    for former in demoted {
        for child in tx.find_linked(former.id)? {
            ids.push(child.id);
        }
    }

    tracing::debug!(
        surviving = oldest.id.get(),
        demoted = ids.len(),
        "flattening multi-primary collision"
    );
    tx.bulk_update_precedence(&ids, LinkPrecedence::Secondary, Some(oldest.id))?;

    let remaining = tx.find_primaries_matching(email, phone)?;
    if remaining.len() != 1 {
        return Err(IdlinkError::invariant(format!(
            "expected exactly one primary after demotion, found {}",
            remaining.len()
        )));
    }

    Ok(oldest.clone())
}
