use std::time::Duration;

use url::Url;

use crate::error::Error;
use crate::session::StorageKeys;

/// Backend origin used while developing against a local API.
pub const DEVELOPMENT_API_ORIGIN: &str = "http://localhost:8080";

/// Default per-request time budget.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const DEFAULT_PREFIX: &str = "/api/v1";
const PUBLIC_PREFIX: &str = "/api/v1/public";
const AUTH_PREFIX: &str = "/api/v1/auth";

/// Deployment environment, decided by the hostname the site is served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// `localhost`, `127.0.0.1` and any host containing `localhost` are development.
    #[must_use]
    pub fn from_hostname(host: &str) -> Self {
        if host == "127.0.0.1" || host.contains("localhost") {
            Self::Development
        } else {
            Self::Production
        }
    }
}

/// Which of the three API prefixes a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BaseKind {
    /// `/api/v1`: authenticated donor endpoints, contact, newsletter.
    #[default]
    Default,
    /// `/api/v1/public`: programs, donations, charity registration.
    Public,
    /// `/api/v1/auth`: login, registration, OTP, token refresh.
    Auth,
}

/// The three absolute URL prefixes requests are built against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiBases {
    default: Url,
    public: Url,
    auth: Url,
}

impl ApiBases {
    /// Resolves the relative production prefixes against `origin`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `origin` cannot carry a path (e.g. `mailto:`).
    pub fn for_origin(origin: &Url) -> Result<Self, Error> {
        if origin.cannot_be_a_base() {
            return Err(Error::Config(format!("{origin} cannot be used as an API origin")));
        }
        let join = |prefix: &str| {
            origin
                .join(prefix)
                .map_err(|e| Error::Config(format!("{origin}{prefix}: {e}")))
        };
        Ok(Self {
            default: join(DEFAULT_PREFIX)?,
            public: join(PUBLIC_PREFIX)?,
            auth: join(AUTH_PREFIX)?,
        })
    }

    /// Loopback prefixes used in development.
    #[must_use]
    pub fn development() -> Self {
        let origin: Url = DEVELOPMENT_API_ORIGIN
            .parse()
            .expect("valid development origin");
        Self::for_origin(&origin).expect("development origin is a base URL")
    }

    /// Prefix for `kind`.
    #[must_use]
    pub fn get(&self, kind: BaseKind) -> &Url {
        match kind {
            BaseKind::Default => &self.default,
            BaseKind::Public => &self.public,
            BaseKind::Auth => &self.auth,
        }
    }
}

/// Daana client configuration.
///
/// ```rust,ignore
/// use daana_client::ClientConfig;
///
/// let config = ClientConfig::for_site(&"https://daana.lk/index.html".parse()?)?
///     .with_timeout(std::time::Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ClientConfig {
    pub(crate) environment: Environment,
    pub(crate) bases: ApiBases,
    pub(crate) timeout: Duration,
    pub(crate) storage_keys: StorageKeys,
}

impl ClientConfig {
    /// Development configuration pointing at the local backend.
    #[must_use]
    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            bases: ApiBases::development(),
            timeout: DEFAULT_TIMEOUT,
            storage_keys: StorageKeys::default(),
        }
    }

    /// Production configuration: API prefixes relative to `origin`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `origin` cannot be a base URL.
    pub fn production(origin: &Url) -> Result<Self, Error> {
        Ok(Self {
            environment: Environment::Production,
            bases: ApiBases::for_origin(origin)?,
            timeout: DEFAULT_TIMEOUT,
            storage_keys: StorageKeys::default(),
        })
    }

    /// Picks the environment from the hostname of the page being served.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `site_url` has no host.
    pub fn for_site(site_url: &Url) -> Result<Self, Error> {
        let host = site_url
            .host_str()
            .ok_or_else(|| Error::Config(format!("{site_url} has no host")))?;
        match Environment::from_hostname(host) {
            Environment::Development => Ok(Self::development()),
            Environment::Production => Self::production(site_url),
        }
    }

    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `DAANA_SITE_URL`: URL the site is served from (drives environment detection)
    ///
    /// # Optional env vars
    /// - `DAANA_API_ORIGIN`: Override the backend origin for all three prefixes
    /// - `DAANA_TIMEOUT_MS`: Per-request timeout in milliseconds
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if required env vars are missing or values are invalid.
    pub fn from_env() -> Result<Self, Error> {
        let site_url: Url = std::env::var("DAANA_SITE_URL")
            .map_err(|_| Error::Config("DAANA_SITE_URL is required".into()))?
            .parse()
            .map_err(|e| Error::Config(format!("DAANA_SITE_URL: {e}")))?;

        let mut config = Self::for_site(&site_url)?;

        if let Ok(origin) = std::env::var("DAANA_API_ORIGIN") {
            let origin: Url = origin
                .parse()
                .map_err(|e| Error::Config(format!("DAANA_API_ORIGIN: {e}")))?;
            config = config.with_bases(ApiBases::for_origin(&origin)?);
        }
        if let Ok(ms) = std::env::var("DAANA_TIMEOUT_MS") {
            let ms: u64 = ms
                .parse()
                .map_err(|e| Error::Config(format!("DAANA_TIMEOUT_MS: {e}")))?;
            config = config.with_timeout(Duration::from_millis(ms));
        }

        Ok(config)
    }

    #[must_use]
    pub fn with_bases(mut self, bases: ApiBases) -> Self {
        self.bases = bases;
        self
    }

    /// Override the default per-request timeout (10 seconds).
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_storage_keys(mut self, keys: StorageKeys) -> Self {
        self.storage_keys = keys;
        self
    }

    #[must_use]
    pub fn environment(&self) -> Environment {
        self.environment
    }

    #[must_use]
    pub fn bases(&self) -> &ApiBases {
        &self.bases
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[must_use]
    pub fn storage_keys(&self) -> &StorageKeys {
        &self.storage_keys
    }
}
