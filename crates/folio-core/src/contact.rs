#![forbid(unsafe_code)]

//! Contact form validation and simulated submission.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::surface::{Owner, SurfaceId, SurfaceTree};

pub const MISSING_FIELDS_MESSAGE: &str = "Please fill in all fields";
pub const THANK_YOU_MESSAGE: &str = "Thank you for your message! I'll get back to you soon.";

/// Values read from the form at submit time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactFields {
    pub name: String,
    pub email: String,
    pub message: String,
}

impl ContactFields {
    #[must_use]
    pub fn new(name: impl Into<String>, email: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            message: message.into(),
        }
    }

    /// First empty field wins. Whitespace counts as content.
    pub fn validate(&self) -> Result<(), ContactError> {
        for (field, value) in [("name", &self.name), ("email", &self.email), ("message", &self.message)] {
            if value.is_empty() {
                return Err(ContactError::MissingField(field));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactError {
    MissingField(&'static str),
}

impl fmt::Display for ContactError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "contact field {field:?} is empty"),
        }
    }
}

impl std::error::Error for ContactError {}

/// What a submission did. The caller turns this into a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactOutcome {
    /// Fields left as they were.
    Rejected(ContactError),
    /// Form reset.
    Accepted,
}

impl ContactOutcome {
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::Rejected(_) => MISSING_FIELDS_MESSAGE,
            Self::Accepted => THANK_YOU_MESSAGE,
        }
    }
}

#[derive(Debug, Default)]
pub struct ContactForm {
    form: Option<SurfaceId>,
    accepted: u32,
}

impl ContactForm {
    #[must_use]
    pub fn new(form: Option<SurfaceId>) -> Self {
        Self { form, accepted: 0 }
    }

    /// Handle a submit. `None` when the page has no form hook.
    pub fn submit(&mut self, surfaces: &mut SurfaceTree, fields: &ContactFields) -> Option<ContactOutcome> {
        let form = self.form?;
        if let Err(err) = fields.validate() {
            tracing::debug!(%err, "contact submission rejected");
            return Some(ContactOutcome::Rejected(err));
        }
        if let Err(err) = surfaces.reset_form(Owner::Contact, form) {
            tracing::warn!(%err, "contact form could not be reset");
        }
        self.accepted += 1;
        tracing::debug!(accepted = self.accepted, "contact submission accepted");
        Some(ContactOutcome::Accepted)
    }

    #[must_use]
    pub fn accepted_count(&self) -> u32 {
        self.accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::SurfacePatch;
    use pretty_assertions::assert_eq;

    fn form() -> (SurfaceTree, ContactForm) {
        let mut surfaces = SurfaceTree::new();
        let hook = surfaces.register_hook("contact-form", "#contact-form", Owner::Contact).unwrap();
        (surfaces, ContactForm::new(Some(hook)))
    }

    #[test]
    fn empty_field_rejects_without_reset() {
        let (mut surfaces, mut contact) = form();
        let outcome = contact.submit(&mut surfaces, &ContactFields::new("Ada", "", "hi"));
        assert_eq!(outcome, Some(ContactOutcome::Rejected(ContactError::MissingField("email"))));
        assert_eq!(outcome.unwrap().message(), "Please fill in all fields");
        assert!(surfaces.pending_patches().is_empty());
    }

    #[test]
    fn complete_fields_reset_the_form() {
        let (mut surfaces, mut contact) = form();
        let outcome = contact.submit(&mut surfaces, &ContactFields::new("Ada", "ada@x.io", "hi"));
        assert_eq!(outcome, Some(ContactOutcome::Accepted));
        assert_eq!(
            surfaces.take_patches(),
            vec![SurfacePatch::ResetForm {
                target: "#contact-form".into()
            }]
        );
        assert_eq!(contact.accepted_count(), 1);
    }

    #[test]
    fn whitespace_is_content() {
        assert_eq!(ContactFields::new(" ", "\t", "\n").validate(), Ok(()));
    }

    #[test]
    fn missing_form_ignores_submissions() {
        let mut surfaces = SurfaceTree::new();
        let mut contact = ContactForm::new(None);
        assert_eq!(contact.submit(&mut surfaces, &ContactFields::default()), None);
    }
}
