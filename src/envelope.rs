//! The `{ success, message, body }` wrapper every backend response uses.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::Error;

/// A successfully normalized backend response.
///
/// Only produced for HTTP 2xx responses whose `success` flag is not
/// `false`. Some endpoints (login, token refresh) put their payload at
/// the top level instead of under `body`; use [`Envelope::flat`] for those.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    status: u16,
    raw: JsonValue,
}

impl Envelope {
    /// Normalizes a raw HTTP response.
    ///
    /// # Errors
    ///
    /// - [`Error::RequestFailed`] for non-2xx statuses (whatever the body
    ///   looks like) and for `success: false`
    /// - [`Error::Decode`] for a 2xx response whose body is not JSON
    pub fn from_response(status: u16, bytes: &[u8]) -> Result<Self, Error> {
        let parsed = parse_body(bytes);

        if !(200..300).contains(&status) {
            let body = parsed.unwrap_or_else(|| {
                JsonValue::String(String::from_utf8_lossy(bytes).into_owned())
            });
            return Err(Error::RequestFailed {
                status,
                message: message_of(&body)
                    .or_else(|| Some(format!("HTTP error! status: {status}"))),
                body,
            });
        }

        let raw = match parsed {
            Some(v) => v,
            None if bytes.iter().all(u8::is_ascii_whitespace) => JsonValue::Null,
            None => {
                return Err(Error::Decode(format!(
                    "status {status} with a non-JSON body"
                )));
            }
        };

        if raw.get("success").and_then(JsonValue::as_bool) == Some(false) {
            return Err(Error::RequestFailed {
                status,
                message: message_of(&raw).or_else(|| Some("API request failed".into())),
                body: raw,
            });
        }

        Ok(Self { status, raw })
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// The backend's `success` flag, when present.
    #[must_use]
    pub fn success(&self) -> Option<bool> {
        self.raw.get("success").and_then(JsonValue::as_bool)
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.raw.get("message").and_then(JsonValue::as_str)
    }

    /// The whole parsed response.
    #[must_use]
    pub fn raw(&self) -> &JsonValue {
        &self.raw
    }

    /// Decodes `body`, treating an absent or `null` body as `None`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if `body` does not match `T`.
    pub fn body<T: DeserializeOwned>(&self) -> Result<Option<T>, Error> {
        match self.raw.get("body") {
            None | Some(JsonValue::Null) => Ok(None),
            Some(v) => T::deserialize(v)
                .map(Some)
                .map_err(|e| Error::Decode(e.to_string())),
        }
    }

    /// Decodes `body`, failing when it is absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if `body` is absent or does not match `T`.
    pub fn require_body<T: DeserializeOwned>(&self) -> Result<T, Error> {
        self.body()?
            .ok_or_else(|| Error::Decode("response has no body".into()))
    }

    /// Decodes the whole response as `T`, for endpoints without a `body` wrapper.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the response does not match `T`.
    pub fn flat<T: DeserializeOwned>(&self) -> Result<T, Error> {
        T::deserialize(&self.raw).map_err(|e| Error::Decode(e.to_string()))
    }
}

fn parse_body(bytes: &[u8]) -> Option<JsonValue> {
    serde_json::from_slice(bytes).ok()
}

fn message_of(v: &JsonValue) -> Option<String> {
    v.get("message")
        .and_then(JsonValue::as_str)
        .map(str::to_string)
}

/// Spring-style page of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub content: Vec<T>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_elements: u64,
    /// Zero-based index of this page.
    #[serde(default)]
    pub number: u32,
    #[serde(default = "default_true")]
    pub first: bool,
    #[serde(default = "default_true")]
    pub last: bool,
}

fn default_true() -> bool {
    true
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            content: Vec::new(),
            total_pages: 0,
            total_elements: 0,
            number: 0,
            first: true,
            last: true,
        }
    }
}

impl<T> Page<T> {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}
