//! Contact records and link precedence.
//!
//! The contact record is the only stored entity. Clusters are not stored:
//! they are derived by following `linked_to` references from secondaries to
//! the single primary record that anchors an identity.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned contact identifier.
///
/// Ids are unique and monotonically increasing in creation order, which
/// makes them usable both as a tie-break and as a recency surrogate.
///
/// # Examples
///
/// ```
/// use idlink::ContactId;
///
/// let id = ContactId::from_i64(7);
/// assert_eq!(id.get(), 7);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContactId(i64);

impl ContactId {
    /// Creates a contact id from a raw integer.
    ///
    /// Ids are normally assigned by the store on insert; this is useful for
    /// tests and for rehydrating references from external data.
    #[must_use]
    pub const fn from_i64(id: i64) -> Self {
        Self(id)
    }

    /// Returns the underlying integer.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ContactId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<ContactId> for i64 {
    fn from(id: ContactId) -> Self {
        id.0
    }
}

/// Position of a contact within its identity cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkPrecedence {
    /// The canonical, oldest-surviving record anchoring a cluster.
    Primary,
    /// A record created or demoted subordinate to a primary.
    Secondary,
}

impl fmt::Display for LinkPrecedence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Secondary => write!(f, "secondary"),
        }
    }
}

/// Shared lifecycle fields carried by every stored record.
///
/// Composed into [`Contact`] rather than inherited. The reconciliation
/// engine never acts on `is_archived` or `deleted_at`; both are preserved
/// across writes for compatibility with the store's soft-delete convention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMeta {
    /// Soft-archival flag. Carried, never interpreted.
    #[serde(default)]
    pub is_archived: bool,

    /// Set once at creation; determines seniority when primaries are ranked.
    pub created_at: DateTime<Utc>,

    /// Updated on every mutation.
    pub updated_at: DateTime<Utc>,

    /// Soft-delete timestamp. Carried, never interpreted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl RecordMeta {
    /// Creates lifecycle metadata stamped at the given instant.
    #[must_use]
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            is_archived: false,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Advances `updated_at` to the given instant.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

/// A stored contact record.
///
/// Exactly one of two shapes at rest:
/// - `link_precedence == Primary` and `linked_to == None`
/// - `link_precedence == Secondary` and `linked_to == Some(primary id)`
///
/// A secondary always points directly at its cluster's primary, never at
/// another secondary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    /// Store-assigned identifier.
    pub id: ContactId,

    /// Observed email, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Observed phone number, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,

    /// Cluster position.
    pub link_precedence: LinkPrecedence,

    /// The cluster's primary, present iff this record is a secondary.
    #[serde(rename = "linkedId", skip_serializing_if = "Option::is_none")]
    pub linked_to: Option<ContactId>,

    /// Lifecycle fields.
    #[serde(flatten)]
    pub meta: RecordMeta,
}

impl Contact {
    /// Returns true if this record anchors its cluster.
    #[must_use]
    pub fn is_primary(&self) -> bool {
        self.link_precedence == LinkPrecedence::Primary
    }

    /// The email as a borrowed value, if present.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// The phone number as a borrowed value, if present.
    #[must_use]
    pub fn phone_number(&self) -> Option<&str> {
        self.phone_number.as_deref()
    }
}

impl PartialEq for Contact {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Contact {}

impl std::hash::Hash for Contact {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Insert payload for a contact.
///
/// The store assigns `id` and lifecycle timestamps on insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContact {
    /// Observed email, if any.
    pub email: Option<String>,

    /// Observed phone number, if any.
    pub phone_number: Option<String>,

    /// Cluster position for the new record.
    pub link_precedence: LinkPrecedence,

    /// The cluster's primary, required for secondaries.
    pub linked_to: Option<ContactId>,
}

impl NewContact {
    /// A new cluster anchor carrying the observed fields.
    #[must_use]
    pub fn primary(email: Option<String>, phone_number: Option<String>) -> Self {
        Self {
            email,
            phone_number,
            link_precedence: LinkPrecedence::Primary,
            linked_to: None,
        }
    }

    /// A new subordinate record linked to an existing primary.
    #[must_use]
    pub fn secondary(
        email: Option<String>,
        phone_number: Option<String>,
        primary: ContactId,
    ) -> Self {
        Self {
            email,
            phone_number,
            link_precedence: LinkPrecedence::Secondary,
            linked_to: Some(primary),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_contact(id: i64) -> Contact {
        Contact {
            id: ContactId::from_i64(id),
            email: Some("a@x.com".to_string()),
            phone_number: None,
            link_precedence: LinkPrecedence::Primary,
            linked_to: None,
            meta: RecordMeta::at(Utc::now()),
        }
    }

    #[test]
    fn test_contact_id_roundtrip() {
        let id = ContactId::from_i64(42);
        assert_eq!(i64::from(id), 42);
        assert_eq!(format!("{id}"), "42");
    }

    #[test]
    fn test_link_precedence_serializes_lowercase() {
        let json = serde_json::to_value(LinkPrecedence::Primary).unwrap();
        assert_eq!(json, serde_json::Value::String("primary".to_string()));

        let parsed: LinkPrecedence = serde_json::from_str("\"secondary\"").unwrap();
        assert_eq!(parsed, LinkPrecedence::Secondary);
    }

    #[test]
    fn test_contact_equality_is_by_id() {
        let a = sample_contact(1);
        let mut b = sample_contact(1);
        b.email = Some("b@y.com".to_string());
        assert_eq!(a, b);

        let c = sample_contact(2);
        assert_ne!(a, c);
    }

    #[test]
    fn test_contact_serialization_shape() {
        let contact = sample_contact(3);
        let json = serde_json::to_value(&contact).unwrap();

        assert_eq!(json["id"], 3);
        assert_eq!(json["email"], "a@x.com");
        assert_eq!(json["linkPrecedence"], "primary");
        // Absent optionals are omitted, not null.
        assert!(json.get("phoneNumber").is_none());
        assert!(json.get("linkedId").is_none());
        assert!(json.get("deletedAt").is_none());
        // Lifecycle fields are flattened into the record.
        assert!(json.get("createdAt").is_some());
        assert_eq!(json["isArchived"], false);
    }

    #[test]
    fn test_new_contact_constructors() {
        let p = NewContact::primary(Some("a@x.com".to_string()), None);
        assert_eq!(p.link_precedence, LinkPrecedence::Primary);
        assert!(p.linked_to.is_none());

        let s = NewContact::secondary(None, Some("123".to_string()), ContactId::from_i64(1));
        assert_eq!(s.link_precedence, LinkPrecedence::Secondary);
        assert_eq!(s.linked_to, Some(ContactId::from_i64(1)));
    }

    #[test]
    fn test_record_meta_touch() {
        let t0 = Utc::now();
        let mut meta = RecordMeta::at(t0);
        let t1 = t0 + chrono::Duration::seconds(5);
        meta.touch(t1);
        assert_eq!(meta.created_at, t0);
        assert_eq!(meta.updated_at, t1);
    }
}
