use crate::config::LoginConfig;
use crate::fetch::credentials::{Credential, CredentialProvider};
use crate::fetch::{classify_error, record_url, FetchError, FetchOutcome, FetchStrategy};
use async_trait::async_trait;
use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::{Client, Response};
use std::time::Duration;
use url::Url;

/// HTTP GET behind a login form
///
/// Each call logs in with a freshly sampled credential, lifts the session
/// cookie out of the login response, and forwards it on the record request.
/// Calls share no session state, so a batch can run them concurrently.
///
/// The login POST goes through a client that does not follow redirects so
/// the `Set-Cookie` header of the login response stays visible. The record
/// GET follows redirects; a session bounced back to the login page yields a
/// document without record data.
#[derive(Debug, Clone)]
pub struct AuthenticatedFetcher {
    client: Client,
    login_client: Client,
    base_url: Url,
    login_url: Url,
    session_cookie: String,
    login: LoginConfig,
    credentials: CredentialProvider,
}

impl AuthenticatedFetcher {
    pub fn new(
        client: Client,
        login_client: Client,
        base_url: Url,
        login_url: Url,
        session_cookie: String,
        login: LoginConfig,
        credentials: CredentialProvider,
    ) -> Self {
        Self {
            client,
            login_client,
            base_url,
            login_url,
            session_cookie,
            login,
            credentials,
        }
    }

    /// Posts the login form and returns the `name=value` session cookie
    async fn login(&self, credential: &Credential) -> Result<String, AttemptError> {
        let form = [
            (self.login.username.as_str(), credential.username.as_str()),
            (self.login.password.as_str(), credential.password.as_str()),
            (self.login.submit_param.as_str(), self.login.submit_value.as_str()),
        ];

        let response = self
            .login_client
            .post(self.login_url.clone())
            .form(&form)
            .send()
            .await
            .map_err(|e| AttemptError::Transport(self.login_url.clone(), e))?;

        let status = response.status();
        if !(status.is_success() || status.is_redirection()) {
            return Err(AttemptError::Fatal(FetchError::Login {
                username: credential.username.clone(),
                message: format!("login endpoint returned HTTP {}", status.as_u16()),
            }));
        }

        session_token(&response, &self.session_cookie).ok_or_else(|| {
            AttemptError::Fatal(FetchError::MissingSession {
                url: self.login_url.to_string(),
                cookie: self.session_cookie.clone(),
            })
        })
    }

    async fn fetch_with_session(&self, id: u64) -> Result<String, AttemptError> {
        let credential = self.credentials.sample();
        let token = self.login(credential).await?;
        tracing::trace!("Logged in as {} for {}", credential.username, id);

        let url = record_url(&self.base_url, id);
        let response = self
            .client
            .get(url.clone())
            .header(COOKIE, token)
            .send()
            .await
            .map_err(|e| AttemptError::Transport(url.clone(), e))?;

        if !response.status().is_success() {
            return Err(AttemptError::Fatal(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            }));
        }

        response
            .text()
            .await
            .map_err(|e| AttemptError::Transport(url, e))
    }
}

/// Failure inside one login-then-fetch attempt
enum AttemptError {
    Transport(Url, reqwest::Error),
    Fatal(FetchError),
}

/// Extracts `name=value` for the named cookie from `Set-Cookie` headers
fn session_token(response: &Response, cookie_name: &str) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .map(str::trim)
        .find(|pair| {
            pair.split_once('=')
                .map(|(name, _)| name.trim() == cookie_name)
                .unwrap_or(false)
        })
        .map(str::to_string)
}

#[async_trait]
impl FetchStrategy for AuthenticatedFetcher {
    async fn fetch(&self, id: u64, timeout: Duration) -> Result<FetchOutcome, FetchError> {
        match tokio::time::timeout(timeout, self.fetch_with_session(id)).await {
            Ok(Ok(body)) => Ok(FetchOutcome::Document(body)),
            Ok(Err(AttemptError::Transport(url, e))) => classify_error(&url, e).into_outcome(),
            Ok(Err(AttemptError::Fatal(e))) => Err(e),
            Err(_) => {
                tracing::debug!("Authenticated fetch for {} timed out after {:?}", id, timeout);
                Ok(FetchOutcome::TimedOut)
            }
        }
    }

    fn name(&self) -> &'static str {
        "authenticated"
    }
}
