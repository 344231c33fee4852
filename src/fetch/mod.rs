//! Fetch strategies for retrieving raw record documents
//!
//! This module contains the transports that turn an ID into a raw document:
//! - Direct HTTP GET against the record view endpoint
//! - Authenticated HTTP GET, preceded by a login POST per call
//! - A headless-browser session (behind the `browser` feature)
//!
//! Every strategy races its work against a per-call timeout. Losing the race
//! yields [`FetchOutcome::TimedOut`], which the controller treats as an empty
//! document rather than an error.

mod authenticated;
#[cfg(feature = "browser")]
mod browser;
mod credentials;
mod direct;

pub use authenticated::AuthenticatedFetcher;
#[cfg(feature = "browser")]
pub use browser::BrowserFetcher;
pub use credentials::{Credential, CredentialProvider};
pub use direct::DirectFetcher;

use crate::config::{Config, FetchConfig, StrategyKind};
use crate::record::padded_id;
use crate::HarvestError;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Result of a single fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The raw document returned for the ID
    Document(String),

    /// The per-call timeout elapsed first
    TimedOut,
}

impl FetchOutcome {
    /// The document body; a timeout degrades to an empty document
    pub fn into_document(self) -> String {
        match self {
            Self::Document(body) => body,
            Self::TimedOut => String::new(),
        }
    }
}

/// Fetch failures that are not plain absence of data
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Connection to {url} failed: {source}")]
    Connect { url: String, source: reqwest::Error },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Request to {url} failed: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Login as {username} failed: {message}")]
    Login { username: String, message: String },

    #[error("No `{cookie}` session cookie in login response from {url}")]
    MissingSession { url: String, cookie: String },

    #[error("Browser error: {0}")]
    Browser(String),
}

/// Capability to retrieve the raw document behind an ID
#[async_trait]
pub trait FetchStrategy: Send + Sync {
    /// Fetches the document for `id`, giving up after `timeout`
    async fn fetch(&self, id: u64, timeout: Duration) -> Result<FetchOutcome, FetchError>;

    /// Short name used in log lines
    fn name(&self) -> &'static str;

    /// Whether several IDs may be fetched at once
    ///
    /// Strategies that share one interactive session return false and are
    /// driven one ID at a time.
    fn supports_concurrency(&self) -> bool {
        true
    }
}

#[async_trait]
impl FetchStrategy for Box<dyn FetchStrategy> {
    async fn fetch(&self, id: u64, timeout: Duration) -> Result<FetchOutcome, FetchError> {
        (**self).fetch(id, timeout).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn supports_concurrency(&self) -> bool {
        (**self).supports_concurrency()
    }
}

/// Builds the record view URL for an ID: `<base>?editid1=<7-digit id>`
///
/// # Example
///
/// ```
/// use seq_harvest::fetch::record_url;
/// use url::Url;
///
/// let base = Url::parse("http://localhost/view.php").unwrap();
/// assert_eq!(
///     record_url(&base, 42).as_str(),
///     "http://localhost/view.php?editid1=0000042"
/// );
/// ```
pub fn record_url(base: &Url, id: u64) -> Url {
    let mut url = base.clone();
    url.query_pairs_mut().append_pair("editid1", &padded_id(id));
    url
}

/// Builds an HTTP client for the fetch strategies
///
/// The client-level timeout is only a backstop; each call is raced against
/// its own, shorter timeout.
pub fn build_http_client(config: &FetchConfig, follow_redirects: bool) -> Result<Client, reqwest::Error> {
    let user_agent = config
        .user_agent
        .clone()
        .unwrap_or_else(|| format!("seq-harvest/{}", env!("CARGO_PKG_VERSION")));

    let redirect = if follow_redirects {
        Policy::limited(10)
    } else {
        Policy::none()
    };

    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .redirect(redirect)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Classifies a transport error for `url`
pub(crate) fn classify_error(url: &Url, error: reqwest::Error) -> ClassifiedError {
    if error.is_timeout() {
        ClassifiedError::TimedOut
    } else if error.is_connect() {
        ClassifiedError::Fatal(FetchError::Connect {
            url: url.to_string(),
            source: error,
        })
    } else if let Some(status) = error.status() {
        ClassifiedError::Fatal(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        })
    } else {
        ClassifiedError::Fatal(FetchError::Http {
            url: url.to_string(),
            source: error,
        })
    }
}

/// A transport error sorted into "counts as empty" or "is a failure"
pub(crate) enum ClassifiedError {
    TimedOut,
    Fatal(FetchError),
}

impl ClassifiedError {
    pub(crate) fn into_outcome(self) -> Result<FetchOutcome, FetchError> {
        match self {
            Self::TimedOut => Ok(FetchOutcome::TimedOut),
            Self::Fatal(e) => Err(e),
        }
    }
}

/// Builds the fetch strategy selected in the configuration
///
/// # Returns
///
/// * `Ok(Box<dyn FetchStrategy>)` - Ready-to-use strategy
/// * `Err(HarvestError::NoCredentials)` - An authenticated strategy has no usable account
/// * `Err(HarvestError)` - Client or browser setup failed
pub async fn build_strategy(config: &Config) -> Result<Box<dyn FetchStrategy>, HarvestError> {
    let base_url = Url::parse(&config.fetch.base_url).map_err(|e| {
        crate::ConfigError::InvalidUrl(format!("Invalid base_url '{}': {}", config.fetch.base_url, e))
    })?;

    match config.fetch.strategy {
        StrategyKind::Direct => {
            let client = build_http_client(&config.fetch, true)?;
            Ok(Box::new(DirectFetcher::new(client, base_url)))
        }
        StrategyKind::Authenticated => {
            let credentials =
                CredentialProvider::from_entries(&config.credentials, StrategyKind::Authenticated)?;
            let login_url = config.fetch.login_url.as_deref().unwrap_or_default();
            let login_url = Url::parse(login_url).map_err(|e| {
                crate::ConfigError::InvalidUrl(format!("Invalid login_url '{}': {}", login_url, e))
            })?;
            let client = build_http_client(&config.fetch, true)?;
            let login_client = build_http_client(&config.fetch, false)?;
            Ok(Box::new(AuthenticatedFetcher::new(
                client,
                login_client,
                base_url,
                login_url,
                config.fetch.session_cookie.clone(),
                config.login.clone(),
                credentials,
            )))
        }
        #[cfg(feature = "browser")]
        StrategyKind::Browser => {
            let credentials =
                CredentialProvider::from_entries(&config.credentials, StrategyKind::Browser)?;
            let fetcher = BrowserFetcher::launch(
                base_url,
                config.login.clone(),
                config.fields.first_name.clone(),
                Duration::from_millis(config.fetch.dom_timeout_ms),
                config.fetch.rotate_credentials_interval,
                credentials,
            )
            .await?;
            Ok(Box::new(fetcher))
        }
        #[cfg(not(feature = "browser"))]
        StrategyKind::Browser => Err(crate::ConfigError::Validation(
            "the browser strategy requires building with the `browser` feature".to_string(),
        )
        .into()),
    }
}
