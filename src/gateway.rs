use std::time::Duration;

use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use serde_json::Value as JsonValue;
use url::Url;

use crate::config::{BaseKind, ClientConfig};
use crate::envelope::Envelope;
use crate::error::Error;

/// A file to upload in a multipart request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    /// Content type is derived from the file extension.
    #[must_use]
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = content_type_for(&file_name).to_string();
        Self {
            file_name,
            content_type,
            bytes,
        }
    }

    /// Reads an attachment from disk.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the file cannot be read.
    pub fn from_path(path: impl AsRef<std::path::Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let bytes =
            std::fs::read(path).map_err(|e| Error::Storage(format!("{}: {e}", path.display())))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(file_name, bytes))
    }

    #[must_use]
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

fn content_type_for(file_name: &str) -> &'static str {
    match crate::validation::file_extension(file_name).as_deref() {
        Some(".pdf") => "application/pdf",
        Some(".jpg" | ".jpeg") => "image/jpeg",
        Some(".png") => "image/png",
        Some(".webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Ordered text fields and files for a `multipart/form-data` body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartPayload {
    fields: Vec<(String, String)>,
    files: Vec<(String, Attachment)>,
}

impl MultipartPayload {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn file(mut self, name: impl Into<String>, attachment: Attachment) -> Self {
        self.files.push((name.into(), attachment));
        self
    }

    #[must_use]
    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    #[must_use]
    pub fn files(&self) -> &[(String, Attachment)] {
        &self.files
    }

    fn into_form(self) -> Result<reqwest::multipart::Form, Error> {
        let mut form = reqwest::multipart::Form::new();
        for (name, value) in self.fields {
            form = form.text(name, value);
        }
        for (name, attachment) in self.files {
            let part = reqwest::multipart::Part::bytes(attachment.bytes)
                .file_name(attachment.file_name)
                .mime_str(&attachment.content_type)
                .map_err(|e| Error::Encode(format!("{name}: {e}")))?;
            form = form.part(name, part);
        }
        Ok(form)
    }
}

/// Request body variants.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(JsonValue),
    Multipart(MultipartPayload),
}

/// Per-request options for [`Gateway::request`].
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
    /// Overrides the configured timeout for this request only.
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    #[must_use]
    pub fn new(method: Method) -> Self {
        Self {
            method,
            headers: HeaderMap::new(),
            query: Vec::new(),
            body: RequestBody::Empty,
            timeout: None,
        }
    }

    #[must_use]
    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    #[must_use]
    pub fn post() -> Self {
        Self::new(Method::POST)
    }

    #[must_use]
    pub fn put() -> Self {
        Self::new(Method::PUT)
    }

    #[must_use]
    pub fn delete() -> Self {
        Self::new(Method::DELETE)
    }

    /// Serializes `body` as the JSON payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Encode`] if `body` cannot be represented as JSON.
    pub fn json(mut self, body: &impl Serialize) -> Result<Self, Error> {
        let value = serde_json::to_value(body).map_err(|e| Error::Encode(e.to_string()))?;
        self.body = RequestBody::Json(value);
        Ok(self)
    }

    #[must_use]
    pub fn multipart(mut self, payload: MultipartPayload) -> Self {
        self.body = RequestBody::Multipart(payload);
        self
    }

    #[must_use]
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Adds `Authorization: Bearer <token>`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotAuthenticated`] if the token is not a valid header value.
    pub fn bearer(self, token: &str) -> Result<Self, Error> {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| Error::NotAuthenticated)?;
        value.set_sensitive(true);
        Ok(self.header(AUTHORIZATION, value))
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// The only component that talks to the backend.
///
/// Builds URLs against one of the three configured prefixes, applies
/// the timeout, and normalizes every response into an [`Envelope`] or
/// an [`Error`]. It never reads or writes the session; callers attach
/// bearer tokens themselves.
#[derive(Debug, Clone)]
pub struct Gateway {
    config: ClientConfig,
    http: reqwest::Client,
}

impl Gateway {
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Absolute URL for `path` under the `base` prefix.
    ///
    /// A leading `/` is accepted. Empty, `.` or `..` segments, schemes,
    /// and embedded query or fragment markers are rejected, and the result
    /// always stays under the prefix.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPath`] for paths that would leave the prefix.
    pub fn url_for(&self, path: &str, base: BaseKind) -> Result<Url, Error> {
        let invalid = || Error::InvalidPath(path.to_string());
        let relative = path.strip_prefix('/').unwrap_or(path);

        if relative.is_empty()
            || relative.contains("://")
            || relative.contains(['?', '#', '\\'])
            || relative.split('/').any(|seg| {
                let seg = seg.to_ascii_lowercase();
                seg.is_empty() || matches!(seg.as_str(), "." | ".." | "%2e" | "%2e%2e" | ".%2e" | "%2e.")
            })
        {
            return Err(invalid());
        }

        let prefix = self.config.bases.get(base);
        let url = Url::parse(&format!(
            "{}/{relative}",
            prefix.as_str().trim_end_matches('/')
        ))
        .map_err(|_| invalid())?;

        let prefix_path = prefix.path().trim_end_matches('/');
        if url.origin() != prefix.origin() || !url.path().starts_with(&format!("{prefix_path}/")) {
            return Err(invalid());
        }
        Ok(url)
    }

    /// Sends one request and normalizes the response.
    ///
    /// `Content-Type: application/json` is sent by default; headers in
    /// `options` override it, except that multipart bodies never carry a
    /// caller-supplied content type so the transport can set the boundary.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidPath`] before any network activity
    /// - [`Error::Timeout`] when no response arrives in time
    /// - [`Error::NetworkUnavailable`] on transport failure
    /// - [`Error::RequestFailed`] on non-2xx or `success: false`
    /// - [`Error::Decode`] on a 2xx response that is not JSON
    pub async fn request(
        &self,
        path: &str,
        options: RequestOptions,
        base: BaseKind,
    ) -> Result<Envelope, Error> {
        let url = self.url_for(path, base)?;
        let RequestOptions {
            method,
            headers: overrides,
            query,
            body,
            timeout,
        } = options;

        let multipart = matches!(body, RequestBody::Multipart(_));
        let mut headers = HeaderMap::new();
        if !multipart {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        for (name, value) in &overrides {
            if multipart && *name == CONTENT_TYPE {
                continue;
            }
            headers.insert(name.clone(), value.clone());
        }

        let mut builder = self
            .http
            .request(method.clone(), url.clone())
            .timeout(timeout.unwrap_or(self.config.timeout))
            .headers(headers);
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        builder = match body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.body(
                serde_json::to_vec(&value).map_err(|e| Error::Encode(e.to_string()))?,
            ),
            RequestBody::Multipart(payload) => builder.multipart(payload.into_form()?),
        };

        tracing::debug!(method = %method, path = %url.path(), "API request");

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(transport_error)?;

        Envelope::from_response(status, &bytes).inspect_err(|e| {
            tracing::debug!(method = %method, path = %url.path(), error = %e, "API request failed");
        })
    }

    /// `GET` with query parameters.
    ///
    /// # Errors
    ///
    /// See [`Gateway::request`].
    pub async fn get(
        &self,
        path: &str,
        query: &[(&str, String)],
        base: BaseKind,
    ) -> Result<Envelope, Error> {
        let options = query
            .iter()
            .fold(RequestOptions::get(), |opts, (k, v)| opts.query(*k, v.clone()));
        self.request(path, options, base).await
    }

    /// `POST` with a JSON body.
    ///
    /// # Errors
    ///
    /// See [`Gateway::request`].
    pub async fn post(
        &self,
        path: &str,
        body: &impl Serialize,
        base: BaseKind,
    ) -> Result<Envelope, Error> {
        self.request(path, RequestOptions::post().json(body)?, base)
            .await
    }

    /// `PUT` with a JSON body.
    ///
    /// # Errors
    ///
    /// See [`Gateway::request`].
    pub async fn put(
        &self,
        path: &str,
        body: &impl Serialize,
        base: BaseKind,
    ) -> Result<Envelope, Error> {
        self.request(path, RequestOptions::put().json(body)?, base)
            .await
    }

    /// # Errors
    ///
    /// See [`Gateway::request`].
    pub async fn delete(&self, path: &str, base: BaseKind) -> Result<Envelope, Error> {
        self.request(path, RequestOptions::delete(), base).await
    }
}

fn transport_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout
    } else {
        Error::NetworkUnavailable {
            detail: e.to_string(),
        }
    }
}

/// Percent-encodes one path segment (e.g. a program slug).
pub(crate) fn segment(s: &str) -> std::borrow::Cow<'_, str> {
    urlencoding::encode(s)
}
