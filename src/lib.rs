//! # idlink - Contact Identity Reconciliation
//!
//! idlink resolves customer identity across partial contact observations.
//! An email and/or phone number submitted independently over time is
//! matched against stored contact records, clustered under a single
//! primary contact, and projected into one consolidated identity view.
//!
//! ## Core Concepts
//!
//! - **Observation**: one inbound email/phone sighting, possibly partial
//! - **Contact**: the stored record; either the primary anchoring a
//!   cluster or a secondary linked directly to it
//! - **Cluster**: the derived set of contacts reachable from one primary
//! - **Consolidated Identity**: the externally visible merged view
//!
//! ## Usage
//!
//! ```
//! use std::sync::Arc;
//!
//! use idlink::{IdentityEngine, InMemoryContactStore, Observation};
//!
//! let store = Arc::new(InMemoryContactStore::new());
//! let engine = IdentityEngine::new(store);
//!
//! let identity = engine
//!     .reconcile(&Observation::from_pair("a@x.com", "123456"))
//!     .unwrap();
//! assert_eq!(identity.emails, vec!["a@x.com"]);
//! assert_eq!(identity.phone_numbers, vec!["123456"]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod contact;
pub mod engine;
pub mod error;
pub mod identity;
pub mod observation;
pub mod storage;

#[cfg(feature = "transport-http")]
pub mod transport;

// Re-export primary types at crate root for convenience
pub use contact::{Contact, ContactId, LinkPrecedence, NewContact, RecordMeta};
pub use engine::IdentityEngine;
pub use error::{IdlinkError, IdlinkResult, ValidationError};
pub use identity::{ConsolidatedIdentity, IdentityEnvelope};
pub use observation::{Observation, MAX_FIELD_LEN};
pub use storage::{ContactStore, ContactTx, InMemoryContactStore, StorageError};
