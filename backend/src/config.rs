//! Application settings loaded via OrthoConfig.
//!
//! Values come from CLI flags, `INVENTO_*` environment variables and an
//! optional configuration file. Every field is optional; accessors apply
//! defaults and validate values so `main` fails fast on bad input.

use std::net::SocketAddr;
use std::num::{NonZeroU32, NonZeroUsize};
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use url::Url;

use crate::domain::Role;
use crate::domain::catalogue::DEFAULT_LOW_STOCK_THRESHOLD;
use crate::domain::import::DEFAULT_CHUNK_SIZE;
use crate::domain::session::{DEFAULT_BOOTSTRAP_TIMEOUT, ResolverPolicy};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:8080";
const DEFAULT_OAUTH_PROVIDER: &str = "google";
const DEFAULT_DEV_ACCOUNT_EMAIL: &str = "admin@invento.local";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const LOCAL_FRONTEND_ORIGIN: &str = "http://localhost:3000";

/// A configured value that could not be used.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid value for {name}='{value}': {reason}")]
pub struct ConfigError {
    name: &'static str,
    value: String,
    reason: String,
}

impl ConfigError {
    fn new(name: &'static str, value: impl Into<String>, reason: impl ToString) -> Self {
        Self {
            name,
            value: value.into(),
            reason: reason.to_string(),
        }
    }
}

/// Hosted store and identity provider coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    pub url: Url,
    pub anon_key: String,
    /// Key used for server-side table access; falls back to the anon key.
    pub service_key: String,
    pub oauth_provider: String,
}

/// Settings for the inventory server.
#[derive(Debug, Clone, Default, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "INVENTO")]
pub struct AppSettings {
    /// Socket address to listen on.
    pub bind_addr: Option<String>,
    /// Externally visible base URL, used for OAuth redirects.
    pub public_base_url: Option<String>,
    /// Hosted project URL serving `/rest/v1` and `/auth/v1`.
    pub provider_url: Option<String>,
    /// Public API key of the hosted project.
    pub provider_anon_key: Option<String>,
    /// Service key for table access from the server.
    pub provider_service_key: Option<String>,
    /// OAuth provider offered on sign-in.
    pub oauth_provider: Option<String>,
    /// Use process-local adapters instead of the hosted project.
    #[ortho_config(default = false)]
    pub in_memory: bool,
    /// Role given to newly created profiles.
    pub default_role: Option<String>,
    /// Rows committed per import batch.
    pub import_chunk_size: Option<usize>,
    /// Profile fetch attempts before falling back.
    pub profile_fetch_attempts: Option<u32>,
    /// Pause between profile fetch attempts, in milliseconds.
    pub profile_retry_delay_ms: Option<u64>,
    /// Session bootstrap safety-net timeout, in milliseconds.
    pub bootstrap_timeout_ms: Option<u64>,
    /// Outbound request timeout, in milliseconds.
    pub request_timeout_ms: Option<u64>,
    /// Stock level counted as low on the dashboard.
    pub low_stock_threshold: Option<u32>,
    /// Origins allowed to open the live channel. The environment form is a
    /// comma-separated list.
    pub ws_allowed_origins: Option<Vec<String>>,
    /// Account signed in by the in-memory identity gateway.
    pub dev_account_email: Option<String>,
}

impl AppSettings {
    /// Listen address, defaulting to `0.0.0.0:8080`.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        raw.parse()
            .map_err(|err| ConfigError::new("bind_addr", raw, err))
    }

    /// Public base URL, defaulting to `http://localhost:8080`.
    pub fn public_base_url(&self) -> Result<Url, ConfigError> {
        let raw = self
            .public_base_url
            .as_deref()
            .unwrap_or(DEFAULT_PUBLIC_BASE_URL);
        Url::parse(raw).map_err(|err| ConfigError::new("public_base_url", raw, err))
    }

    /// Hosted provider settings, or `None` when running in memory.
    pub fn provider(&self) -> Result<Option<ProviderSettings>, ConfigError> {
        if self.in_memory {
            return Ok(None);
        }
        let Some(raw_url) = self.provider_url.as_deref() else {
            return Ok(None);
        };
        let url = Url::parse(raw_url)
            .map_err(|err| ConfigError::new("provider_url", raw_url, err))?;
        let anon_key = self
            .provider_anon_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                ConfigError::new("provider_anon_key", "", "required with provider_url")
            })?;
        let service_key = self
            .provider_service_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .unwrap_or_else(|| anon_key.clone());
        Ok(Some(ProviderSettings {
            url,
            anon_key,
            service_key,
            oauth_provider: self
                .oauth_provider
                .clone()
                .unwrap_or_else(|| DEFAULT_OAUTH_PROVIDER.to_owned()),
        }))
    }

    /// Role for new profiles, defaulting to `pending`. Only `pending` and
    /// `readonly` are accepted.
    pub fn default_role(&self) -> Result<Role, ConfigError> {
        let Some(raw) = self.default_role.as_deref() else {
            return Ok(ResolverPolicy::default().default_role);
        };
        let role: Role = raw
            .parse()
            .map_err(|err| ConfigError::new("default_role", raw, err))?;
        if role == Role::Admin {
            return Err(ConfigError::new(
                "default_role",
                raw,
                "new profiles must start as pending or readonly",
            ));
        }
        Ok(role)
    }

    /// Profile resolution policy assembled from the individual settings.
    pub fn resolver_policy(&self) -> Result<ResolverPolicy, ConfigError> {
        let defaults = ResolverPolicy::default();
        let max_attempts = match self.profile_fetch_attempts {
            None => defaults.max_attempts,
            Some(raw) => NonZeroU32::new(raw).ok_or_else(|| {
                ConfigError::new("profile_fetch_attempts", raw.to_string(), "must be at least 1")
            })?,
        };
        Ok(ResolverPolicy {
            default_role: self.default_role()?,
            max_attempts,
            retry_delay: self
                .profile_retry_delay_ms
                .map_or(defaults.retry_delay, Duration::from_millis),
        })
    }

    /// Import batch size, defaulting to 50.
    pub fn import_chunk_size(&self) -> Result<NonZeroUsize, ConfigError> {
        match self.import_chunk_size {
            None => Ok(DEFAULT_CHUNK_SIZE),
            Some(raw) => NonZeroUsize::new(raw).ok_or_else(|| {
                ConfigError::new("import_chunk_size", raw.to_string(), "must be at least 1")
            }),
        }
    }

    /// Safety-net timeout for session bootstrap.
    pub fn bootstrap_timeout(&self) -> Duration {
        self.bootstrap_timeout_ms
            .map_or(DEFAULT_BOOTSTRAP_TIMEOUT, Duration::from_millis)
    }

    /// Timeout applied to outbound HTTP requests.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout_ms
            .map_or(DEFAULT_REQUEST_TIMEOUT, Duration::from_millis)
    }

    pub fn low_stock_threshold(&self) -> u32 {
        self.low_stock_threshold
            .unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD)
    }

    /// Origins allowed on the live channel. Defaults to the public base URL
    /// and the local frontend dev server.
    pub fn ws_allowed_origins(&self) -> Result<Vec<Url>, ConfigError> {
        match self.ws_allowed_origins.as_deref() {
            Some(raw) => raw
                .iter()
                .map(|origin| origin.trim())
                .filter(|origin| !origin.is_empty())
                .map(|origin| {
                    Url::parse(origin)
                        .map_err(|err| ConfigError::new("ws_allowed_origins", origin, err))
                })
                .collect(),
            None => {
                let local = Url::parse(LOCAL_FRONTEND_ORIGIN)
                    .map_err(|err| ConfigError::new("ws_allowed_origins", LOCAL_FRONTEND_ORIGIN, err))?;
                Ok(vec![self.public_base_url()?, local])
            }
        }
    }

    /// E-mail of the in-memory development account.
    pub fn dev_account_email(&self) -> &str {
        self.dev_account_email
            .as_deref()
            .unwrap_or(DEFAULT_DEV_ACCOUNT_EMAIL)
    }
}
