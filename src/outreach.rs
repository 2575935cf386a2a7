//! Contact form and newsletter signup.

use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::config::BaseKind;
use crate::error::{Error, ValidationErrors};
use crate::gateway::Gateway;
use crate::validation;

/// A message from the public contact form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub message: String,
}

impl ContactMessage {
    /// # Errors
    ///
    /// Returns [`Error::Validation`] listing each failing field.
    pub fn validate(&self) -> Result<(), Error> {
        let mut errors = ValidationErrors::new();
        validation::require(&mut errors, "name", &self.name);
        if validation::require(&mut errors, "email", &self.email) {
            errors.check(
                validation::is_valid_email(self.email.trim()),
                "email",
                "Please enter a valid email address",
            );
        }
        validation::require(&mut errors, "message", &self.message);
        errors.into_result()
    }
}

#[derive(Serialize)]
struct Stamped<'a, T> {
    #[serde(flatten)]
    inner: &'a T,
    timestamp: String,
}

#[derive(Serialize)]
struct NewsletterBody<'a> {
    email: &'a str,
}

impl Gateway {
    /// `POST contact`, stamped with the current time in RFC 3339.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] before any request
    /// - any gateway error
    pub async fn submit_contact(&self, message: &ContactMessage) -> Result<Option<String>, Error> {
        message.validate()?;
        let timestamp = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .map_err(|e| Error::Encode(e.to_string()))?;
        let body = Stamped {
            inner: message,
            timestamp,
        };
        let envelope = self.post("contact", &body, BaseKind::Default).await?;
        Ok(envelope.message().map(str::to_string))
    }

    /// `POST newsletter`.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] for a malformed email, before any request
    /// - any gateway error
    pub async fn subscribe_newsletter(&self, email: &str) -> Result<Option<String>, Error> {
        let email = email.trim();
        let mut errors = ValidationErrors::new();
        errors.check(
            validation::is_valid_email(email),
            "email",
            "Please enter a valid email address",
        );
        errors.into_result()?;

        let envelope = self
            .post("newsletter", &NewsletterBody { email }, BaseKind::Default)
            .await?;
        Ok(envelope.message().map(str::to_string))
    }
}
