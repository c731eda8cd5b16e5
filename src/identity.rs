//! Consolidated identity views.
//!
//! The assembler is a deterministic projection of a resolved cluster
//! (one primary plus its secondaries, in store order) into the externally
//! visible identity shape. No field is ever `null` in the output: absent
//! values are simply omitted from the respective list.

use serde::{Deserialize, Serialize};

use crate::contact::{Contact, ContactId};

/// The externally visible merged view of a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidatedIdentity {
    /// Id of the cluster's primary record.
    pub primary_contact_id: ContactId,

    /// Distinct non-empty emails, first-seen order, primary's first.
    pub emails: Vec<String>,

    /// Distinct non-empty phone numbers, first-seen order, primary's first.
    pub phone_numbers: Vec<String>,

    /// Distinct secondary ids in the given cluster order.
    pub secondary_contact_ids: Vec<ContactId>,
}

impl ConsolidatedIdentity {
    /// Projects an ordered cluster into its consolidated view.
    ///
    /// `secondaries` must already carry the store's ordering (creation
    /// order); the projection preserves it. Given a fixed input ordering
    /// the output is identical on every call.
    #[must_use]
    pub fn assemble(primary: &Contact, secondaries: &[Contact]) -> Self {
        let mut emails = Vec::new();
        let mut phone_numbers = Vec::new();

        for contact in std::iter::once(primary).chain(secondaries) {
            push_distinct(&mut emails, contact.email());
            push_distinct(&mut phone_numbers, contact.phone_number());
        }

        let mut secondary_contact_ids = Vec::with_capacity(secondaries.len());
        for secondary in secondaries {
            if !secondary_contact_ids.contains(&secondary.id) {
                secondary_contact_ids.push(secondary.id);
            }
        }

        Self {
            primary_contact_id: primary.id,
            emails,
            phone_numbers,
            secondary_contact_ids,
        }
    }
}

fn push_distinct(values: &mut Vec<String>, value: Option<&str>) {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return;
    };
    if !values.iter().any(|existing| existing == value) {
        values.push(value.to_string());
    }
}

/// Wire envelope for a consolidated identity: `{"contact": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityEnvelope {
    /// The consolidated view.
    pub contact: ConsolidatedIdentity,
}

impl From<ConsolidatedIdentity> for IdentityEnvelope {
    fn from(contact: ConsolidatedIdentity) -> Self {
        Self { contact }
    }
}
