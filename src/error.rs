use std::fmt;

use serde_json::Value as JsonValue;

use crate::types::WizardStep;

/// Message shown when the backend gave no usable text.
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";

const TIMEOUT_MESSAGE: &str = "Request timeout. Please check your connection.";
const NETWORK_MESSAGE: &str = "Network error. Please check your connection.";

/// Errors produced by the Daana client.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// No response arrived within the request's time budget.
    #[error("Request timeout. Please check your connection.")]
    Timeout,

    /// Transport-level failure (DNS, refused connection, reset).
    #[error("Network error. Please check your connection. ({detail})")]
    NetworkUnavailable { detail: String },

    /// HTTP non-2xx, or a 2xx envelope carrying `success: false`.
    #[error("request failed with status {status}: {}", message.as_deref().unwrap_or("no message"))]
    RequestFailed {
        status: u16,
        message: Option<String>,
        body: JsonValue,
    },

    /// Client-side field checks failed; nothing was sent.
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    /// The operation needs a valid session and none is present.
    #[error("Authentication required")]
    NotAuthenticated,

    /// A registration step needs the charity id produced by step 1.
    #[error("charity registration has not completed step 1")]
    MissingCharityId,

    /// A wizard operation was invoked from the wrong step.
    #[error("registration is at step {current}, expected step {expected}")]
    WrongStep {
        expected: WizardStep,
        current: WizardStep,
    },

    /// The request path would leave its configured base.
    #[error("invalid request path: {0}")]
    InvalidPath(String),

    /// A response body did not have the expected shape.
    #[error("could not decode response: {0}")]
    Decode(String),

    /// A request payload could not be encoded.
    #[error("could not encode request: {0}")]
    Encode(String),

    /// Session storage could not be read or written.
    #[error("session storage error: {0}")]
    Storage(String),

    /// Missing or invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// HTTP status associated with this error.
    ///
    /// Timeouts and transport failures report `0`, matching what the
    /// pages expect when no response was received at all.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RequestFailed { status, .. } => Some(*status),
            Self::Timeout | Self::NetworkUnavailable { .. } => Some(0),
            _ => None,
        }
    }

    /// Backend message text, when the backend sent one.
    #[must_use]
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            Self::RequestFailed { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// Text suitable for showing to the user.
    ///
    /// Prefers the backend's own message, then the client-side reason,
    /// then [`GENERIC_FAILURE_MESSAGE`].
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::RequestFailed { message, .. } => message
                .as_deref()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or(GENERIC_FAILURE_MESSAGE)
                .to_string(),
            Self::Timeout => TIMEOUT_MESSAGE.to_string(),
            Self::NetworkUnavailable { .. } => NETWORK_MESSAGE.to_string(),
            Self::Validation(errors) => errors.to_string(),
            Self::NotAuthenticated => "Please log in to continue.".to_string(),
            Self::MissingCharityId | Self::WrongStep { .. } => {
                "Please complete the previous registration step first.".to_string()
            }
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }

    /// Whether this error came from client-side validation.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<ValidationErrors> for Error {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

/// A single failed field check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// All failed field checks from one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    /// Records `message` against `field` when `ok` is false.
    pub fn check(&mut self, ok: bool, field: &'static str, message: impl Into<String>) {
        if !ok {
            self.push(field, message);
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// First message recorded for `field`.
    #[must_use]
    pub fn for_field(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    /// `Ok(())` when nothing failed, otherwise the collected errors.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when at least one check failed.
    pub fn into_result(self) -> Result<(), Error> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for e in &self.errors {
            if !first {
                f.write_str("; ")?;
            }
            f.write_str(&e.message)?;
            first = false;
        }
        Ok(())
    }
}
