//! Donor authentication: login, logout, signup and email OTP.

use serde::{Deserialize, Serialize};

use crate::config::BaseKind;
use crate::error::{Error, ValidationErrors};
use crate::gateway::{Gateway, RequestOptions};
use crate::session::{Session, SessionStore, Storage, UserProfile, now_epoch_seconds};
use crate::types::OtpCode;
use crate::validation;

/// Credentials for `POST auth/login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Response of `POST auth/login` and `POST auth/refresh`.
///
/// The backend sends these fields at the top level, not under `body`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Token lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub user_type: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub profile_image_url: Option<String>,
    #[serde(default)]
    pub jti: Option<String>,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub domain: Option<String>,
}

impl LoginResponse {
    fn profile(&self) -> UserProfile {
        UserProfile {
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            user_type: self.user_type.clone(),
            user_id: self.user_id,
            jti: self.jti.clone(),
            domain: self.domain.clone(),
        }
    }
}

/// Donor signup form, including the confirmation field.
#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl SignupForm {
    /// Checks every field, reporting all failures together.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] listing each failing field.
    pub fn validate(&self) -> Result<(), Error> {
        let mut errors = ValidationErrors::new();

        for (field, label, value) in [
            ("firstName", "First Name", self.first_name.trim()),
            ("lastName", "Last Name", self.last_name.trim()),
        ] {
            if value.is_empty() {
                errors.push(field, format!("{label} is required"));
            } else if value.chars().count() < 2 {
                errors.push(field, format!("{label} must be at least 2 characters"));
            } else if !validation::is_valid_person_name(value) {
                errors.push(field, format!("{label} can only contain letters and spaces"));
            }
        }

        let email = self.email.trim();
        if email.is_empty() {
            errors.push("email", "Email Address is required");
        } else if !validation::is_valid_email(email) {
            errors.push("email", "Please enter a valid email address");
        }

        if self.password.is_empty() {
            errors.push("password", "Password is required");
        } else if self.password.len() < 8 {
            errors.push("password", "Password must be at least 8 characters long");
        } else if !validation::is_strong_password(&self.password) {
            errors.push(
                "password",
                "Password must contain at least one letter and one number",
            );
        }

        if self.confirm_password.is_empty() {
            errors.push("confirmPassword", "Confirm Password is required");
        } else if self.confirm_password != self.password {
            errors.push("confirmPassword", "Passwords do not match");
        }

        errors.into_result()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterBody<'a> {
    first_name: &'a str,
    last_name: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshBody<'a> {
    refresh_token: &'a str,
}

impl Gateway {
    /// `POST auth/login`.
    ///
    /// # Errors
    ///
    /// Propagates every gateway error; [`Error::Decode`] if the response
    /// lacks an access token.
    pub async fn login(&self, credentials: &LoginRequest<'_>) -> Result<LoginResponse, Error> {
        self.post("login", credentials, BaseKind::Auth)
            .await?
            .flat()
    }

    /// `POST auth/register`. Returns the backend's confirmation message.
    ///
    /// # Errors
    ///
    /// Propagates every gateway error.
    pub async fn register(&self, form: &SignupForm) -> Result<Option<String>, Error> {
        let body = RegisterBody {
            first_name: form.first_name.trim(),
            last_name: form.last_name.trim(),
            email: form.email.trim(),
            password: &form.password,
        };
        let envelope = self.post("register", &body, BaseKind::Auth).await?;
        Ok(envelope.message().map(str::to_string))
    }

    /// `POST auth/verify-otp?email=…&otpCode=…`.
    ///
    /// # Errors
    ///
    /// Propagates every gateway error.
    pub async fn verify_otp(&self, email: &str, code: &OtpCode) -> Result<Option<String>, Error> {
        let options = RequestOptions::post()
            .query("email", email)
            .query("otpCode", code.as_str());
        let envelope = self.request("verify-otp", options, BaseKind::Auth).await?;
        Ok(envelope.message().map(str::to_string))
    }

    /// `POST auth/resend-otp?email=…`.
    ///
    /// # Errors
    ///
    /// Propagates every gateway error.
    pub async fn resend_otp(&self, email: &str) -> Result<Option<String>, Error> {
        let options = RequestOptions::post().query("email", email);
        let envelope = self.request("resend-otp", options, BaseKind::Auth).await?;
        Ok(envelope.message().map(str::to_string))
    }

    /// `POST auth/refresh`.
    ///
    /// # Errors
    ///
    /// Propagates every gateway error.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<LoginResponse, Error> {
        self.post("refresh", &RefreshBody { refresh_token }, BaseKind::Auth)
            .await?
            .flat()
    }

    /// `POST auth/logout` with the access token as bearer.
    ///
    /// # Errors
    ///
    /// Propagates every gateway error.
    pub async fn logout(&self, access_token: &str) -> Result<(), Error> {
        let options = RequestOptions::post().bearer(access_token)?;
        self.request("logout", options, BaseKind::Auth).await?;
        Ok(())
    }
}

/// Authentication state of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Anonymous,
    /// A login request is in flight.
    Authenticating,
    Authenticated,
}

/// Drives login/logout/signup against the gateway and keeps the
/// [`SessionStore`] in step with the result.
#[derive(Debug)]
pub struct AuthFlow<S> {
    gateway: Gateway,
    store: SessionStore<S>,
    state: AuthState,
}

impl<S: Storage> AuthFlow<S> {
    /// Starts in the state implied by whatever session is already stored.
    #[must_use]
    pub fn new(gateway: Gateway, store: SessionStore<S>) -> Self {
        let mut flow = Self {
            gateway,
            store,
            state: AuthState::Anonymous,
        };
        flow.restore();
        flow
    }

    /// Flow whose session store uses the storage keys configured on the
    /// gateway.
    #[must_use]
    pub fn with_storage(gateway: Gateway, storage: S) -> Self {
        let store = SessionStore::from_config(storage, gateway.config());
        Self::new(gateway, store)
    }

    /// Re-reads the store: authenticated iff a valid session is present.
    /// An expired session is cleared.
    pub fn restore(&mut self) -> AuthState {
        self.state = if self.store.is_valid() {
            AuthState::Authenticated
        } else {
            self.discard_session();
            AuthState::Anonymous
        };
        self.state
    }

    /// Current state. A stored session that has expired since the last
    /// transition reads as [`AuthState::Anonymous`].
    #[must_use]
    pub fn state(&self) -> AuthState {
        match self.state {
            AuthState::Authenticated if !self.store.is_valid() => AuthState::Anonymous,
            state => state,
        }
    }

    #[must_use]
    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    #[must_use]
    pub fn session_store(&self) -> &SessionStore<S> {
        &self.store
    }

    /// Logs in and stores the resulting session.
    ///
    /// On failure the previous state is kept and the backend's message is
    /// available through [`Error::user_message`].
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] for blank credentials (no request is sent)
    /// - any gateway error from `POST auth/login`
    /// - [`Error::Decode`] if the response carries an already expired session
    /// - [`Error::Storage`] if the session cannot be persisted
    pub async fn login(&mut self, email: &str, password: &str) -> Result<UserProfile, Error> {
        let email = email.trim();
        let mut errors = ValidationErrors::new();
        validation::require(&mut errors, "email", email);
        validation::require(&mut errors, "password", password);
        errors.into_result()?;

        let previous = self.state;
        self.state = AuthState::Authenticating;

        let response = match self.gateway.login(&LoginRequest { email, password }).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Login failed");
                self.state = previous;
                return Err(e);
            }
        };

        let user = response.profile();
        let session = Session::issued(
            response.access_token,
            response.refresh_token,
            response.token_type,
            response.expires_in,
            user.clone(),
            now_epoch_seconds(),
        );
        if !session.is_valid_at(now_epoch_seconds()) {
            tracing::warn!(expires_at = ?session.expires_at, "Login returned an expired session");
            self.discard_session();
            self.state = AuthState::Anonymous;
            return Err(Error::Decode("login response carries an expired session".into()));
        }
        if let Err(e) = self.store.save(&session) {
            tracing::error!(error = %e, "Could not persist session after login");
            self.discard_session();
            self.state = AuthState::Anonymous;
            return Err(e);
        }

        self.state = AuthState::Authenticated;
        tracing::info!(user_id = ?user.user_id, "Login successful");
        Ok(user)
    }

    /// Logs out locally, telling the backend when possible.
    ///
    /// The server call is best effort: failures are logged and never
    /// prevent the local session from being cleared.
    pub async fn logout(&mut self) {
        let token = match self.store.load() {
            Ok(session) => session.map(|s| s.access_token),
            Err(e) => {
                tracing::warn!(error = %e, "Could not read session during logout");
                None
            }
        };

        if let Some(token) = token {
            if let Err(e) = self.gateway.logout(&token).await {
                tracing::warn!(error = %e, "Server logout failed, clearing local session anyway");
            }
        }

        self.discard_session();
        self.state = AuthState::Anonymous;
        tracing::info!("Logged out");
    }

    /// Registers a donor account. Does not change the auth state.
    ///
    /// On success the email is remembered for [`verify_otp`](Self::verify_otp)
    /// and [`resend_otp`](Self::resend_otp); the caller routes the user
    /// into verification.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] when the form is invalid (no request is sent)
    /// - any gateway error from `POST auth/register`
    pub async fn signup(&self, form: &SignupForm) -> Result<Option<String>, Error> {
        form.validate()?;
        let message = self.gateway.register(form).await?;
        if let Err(e) = self.store.set_pending_email(form.email.trim()) {
            tracing::warn!(error = %e, "Could not remember pending verification email");
        }
        Ok(message)
    }

    /// Email waiting for OTP verification, if any.
    #[must_use]
    pub fn pending_email(&self) -> Option<String> {
        self.store.pending_email().ok().flatten()
    }

    /// Confirms a donor's email. Does not log the donor in.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] for a malformed email or code (no request is sent)
    /// - any gateway error from `POST auth/verify-otp`
    pub async fn verify_otp(&self, email: &str, code: &str) -> Result<Option<String>, Error> {
        let email = checked_email(email)?;
        let code: OtpCode = code.trim().parse()?;
        let message = self.gateway.verify_otp(email, &code).await?;
        if let Err(e) = self.store.clear_pending_email() {
            tracing::warn!(error = %e, "Could not clear pending verification email");
        }
        Ok(message)
    }

    /// Sends a new verification code.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] for a malformed email (no request is sent)
    /// - any gateway error from `POST auth/resend-otp`
    pub async fn resend_otp(&self, email: &str) -> Result<Option<String>, Error> {
        let email = checked_email(email)?;
        self.gateway.resend_otp(email).await
    }

    /// Exchanges the stored refresh token for a new access token.
    ///
    /// Only runs when asked; nothing schedules it.
    ///
    /// # Errors
    ///
    /// - [`Error::NotAuthenticated`] without a stored refresh token
    /// - any gateway error from `POST auth/refresh`
    pub async fn refresh(&mut self) -> Result<(), Error> {
        let Some(current) = self.store.load()? else {
            return Err(Error::NotAuthenticated);
        };
        let Some(refresh_token) = current.refresh_token.clone() else {
            return Err(Error::NotAuthenticated);
        };

        let response = self.gateway.refresh_token(&refresh_token).await?;
        let session = Session::issued(
            response.access_token,
            response.refresh_token.or(Some(refresh_token)),
            response.token_type.or(Some(current.token_type)),
            response.expires_in,
            current.user.unwrap_or_default(),
            now_epoch_seconds(),
        );
        if !session.is_valid_at(now_epoch_seconds()) {
            tracing::warn!(expires_at = ?session.expires_at, "Refresh returned an expired session");
            self.discard_session();
            self.state = AuthState::Anonymous;
            return Err(Error::NotAuthenticated);
        }
        self.store.save(&session)?;
        self.state = AuthState::Authenticated;
        Ok(())
    }

    /// Access token for an authenticated request.
    ///
    /// An absent or expired session is cleared and reported as
    /// [`Error::NotAuthenticated`]; nothing tries to refresh it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotAuthenticated`] without a valid session.
    pub fn bearer(&mut self) -> Result<String, Error> {
        self.valid_session()
            .map(|s| s.access_token)
            .ok_or(Error::NotAuthenticated)
    }

    /// Bearer token when a valid session exists, `None` otherwise.
    ///
    /// For endpoints that also accept anonymous callers.
    pub fn optional_bearer(&mut self) -> Option<String> {
        self.bearer().ok()
    }

    /// Cached profile of the logged-in user.
    ///
    /// An expired session is cleared and yields `None`.
    pub fn current_user(&mut self) -> Option<UserProfile> {
        if self.state != AuthState::Authenticated {
            return None;
        }
        self.valid_session().and_then(|s| s.user)
    }

    /// Full name, falling back to email.
    pub fn display_name(&mut self) -> Option<String> {
        let user = self.current_user()?;
        user.full_name
            .filter(|n| !n.trim().is_empty())
            .or(user.email)
    }

    /// Avatar initials for the current user.
    pub fn initials(&mut self) -> String {
        initials(self.display_name().as_deref())
    }

    /// Stored session if still valid; otherwise clears it and drops to
    /// [`AuthState::Anonymous`].
    fn valid_session(&mut self) -> Option<Session> {
        match self.store.load() {
            Ok(Some(session)) if session.is_valid_at(now_epoch_seconds()) => Some(session),
            Ok(_) | Err(_) => {
                if self.state != AuthState::Anonymous {
                    tracing::info!("Session expired, clearing auth state");
                }
                self.discard_session();
                self.state = AuthState::Anonymous;
                None
            }
        }
    }

    fn discard_session(&self) {
        if let Err(e) = self.store.clear() {
            tracing::error!(error = %e, "Could not clear stored session");
        }
    }
}

fn checked_email(email: &str) -> Result<&str, Error> {
    let email = email.trim();
    let mut errors = ValidationErrors::new();
    errors.check(
        validation::is_valid_email(email),
        "email",
        "Please enter a valid email address",
    );
    errors.into_result()?;
    Ok(email)
}

/// First letter of the first and last words, upper-cased; `U` when unknown.
#[must_use]
pub fn initials(name: Option<&str>) -> String {
    let words: Vec<&str> = name.unwrap_or_default().split_whitespace().collect();
    let first_char = |w: &str| w.chars().next().map(|c| c.to_uppercase().to_string());
    match words.as_slice() {
        [] => "U".to_string(),
        [only] => first_char(*only).unwrap_or_else(|| "U".to_string()),
        [first, .., last] => format!(
            "{}{}",
            first_char(*first).unwrap_or_default(),
            first_char(*last).unwrap_or_default()
        ),
    }
}
