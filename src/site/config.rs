use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use super::error::SiteError;

/// Port used when `PORT` is not set.
pub const DEFAULT_PORT: u16 = 3000;

/// Static site server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteConfig {
    port: u16,
    root: PathBuf,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            root: PathBuf::from("."),
        }
    }
}

impl SiteConfig {
    /// Create config from environment variables.
    ///
    /// # Optional env vars
    /// - `PORT`: Listen port (default 3000)
    /// - `SITE_ROOT`: Directory holding the page bundle (default `.`)
    ///
    /// # Errors
    ///
    /// Returns [`SiteError::Config`] if `PORT` is not a valid port number.
    pub fn from_env() -> Result<Self, SiteError> {
        let mut config = Self::default();

        match std::env::var("PORT") {
            Ok(port) => {
                let port = port
                    .trim()
                    .parse()
                    .map_err(|e| SiteError::Config(format!("PORT: {e}")))?;
                config = config.with_port(port);
            }
            Err(_) => tracing::info!("PORT not set, using default: {DEFAULT_PORT}"),
        }
        if let Ok(root) = std::env::var("SITE_ROOT") {
            config = config.with_root(root);
        }

        Ok(config)
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All interfaces on the configured port.
    #[must_use]
    pub fn address(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }
}
