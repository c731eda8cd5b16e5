//! Inbound identity observations.
//!
//! An observation is one identity sighting: an email and/or phone number
//! submitted independently over time, possibly partial. Validation here
//! defends the engine against blank and oversized input; the engine itself
//! only ever sees either `None` or a trimmed, non-blank value.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Conservative upper bound for observation field values.
///
/// A safety limit against memory abuse via unbounded strings; real emails
/// and phone numbers sit far below it.
pub const MAX_FIELD_LEN: usize = 512;

/// One inbound email/phone sighting.
///
/// # Examples
///
/// ```
/// use idlink::Observation;
///
/// let obs = Observation::from_email("a@x.com");
/// assert_eq!(obs.email(), Some("a@x.com"));
/// assert!(obs.phone_number().is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    /// Observed email, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Observed phone number, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

impl Observation {
    /// Creates an observation from raw optional fields.
    #[must_use]
    pub fn new(email: Option<String>, phone_number: Option<String>) -> Self {
        Self {
            email,
            phone_number,
        }
    }

    /// An email-only sighting.
    #[must_use]
    pub fn from_email(email: impl Into<String>) -> Self {
        Self::new(Some(email.into()), None)
    }

    /// A phone-only sighting.
    #[must_use]
    pub fn from_phone(phone_number: impl Into<String>) -> Self {
        Self::new(None, Some(phone_number.into()))
    }

    /// A sighting carrying both fields.
    #[must_use]
    pub fn from_pair(email: impl Into<String>, phone_number: impl Into<String>) -> Self {
        Self::new(Some(email.into()), Some(phone_number.into()))
    }

    /// The email, trimmed; blank values read as absent.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        normalized(&self.email)
    }

    /// The phone number, trimmed; blank values read as absent.
    #[must_use]
    pub fn phone_number(&self) -> Option<&str> {
        normalized(&self.phone_number)
    }

    /// Rejects observations the engine must never see.
    ///
    /// # Errors
    ///
    /// `EmptyObservation` when both fields are missing or blank,
    /// `FieldTooLong` when a supplied value exceeds [`MAX_FIELD_LEN`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_len("email", &self.email)?;
        check_len("phoneNumber", &self.phone_number)?;

        if self.email().is_none() && self.phone_number().is_none() {
            return Err(ValidationError::EmptyObservation);
        }
        Ok(())
    }
}

fn normalized(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn check_len(field: &'static str, value: &Option<String>) -> Result<(), ValidationError> {
    if value.as_ref().is_some_and(|v| v.len() > MAX_FIELD_LEN) {
        return Err(ValidationError::FieldTooLong {
            field,
            max_length: MAX_FIELD_LEN,
        });
    }
    Ok(())
}
