//! Headless-browser fetch strategy
//!
//! Drives one persistent Chromium page: navigate to the record, log in when
//! the login form shows up, wait for the marker element, then hand the page
//! HTML to the extractor. The single page is shared, so IDs are processed one
//! at a time.

use crate::config::LoginConfig;
use crate::fetch::credentials::{Credential, CredentialProvider};
use crate::fetch::{record_url, FetchError, FetchOutcome, FetchStrategy};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::ClearBrowserCookiesParams;
use chromiumoxide::Page;
use futures::StreamExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use url::Url;

const LOGIN_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(10);
const MARKER_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct BrowserFetcher {
    _browser: Browser,
    handler: JoinHandle<()>,
    page: Mutex<Page>,
    base_url: Url,
    login: LoginConfig,
    marker_selector: String,
    dom_timeout: Duration,
    rotate_interval: u64,
    processed: AtomicU64,
    credentials: CredentialProvider,
}

impl BrowserFetcher {
    /// Launches a headless browser and opens the shared page
    pub async fn launch(
        base_url: Url,
        login: LoginConfig,
        marker_selector: String,
        dom_timeout: Duration,
        rotate_interval: u64,
        credentials: CredentialProvider,
    ) -> Result<Self, FetchError> {
        let config = BrowserConfig::builder().build().map_err(FetchError::Browser)?;
        let (browser, mut events) = Browser::launch(config).await.map_err(browser_error)?;

        // The CDP connection only makes progress while its handler is polled
        let handler = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser.new_page("about:blank").await.map_err(browser_error)?;
        tracing::info!("Headless browser ready");

        Ok(Self {
            _browser: browser,
            handler,
            page: Mutex::new(page),
            base_url,
            login,
            marker_selector,
            dom_timeout,
            rotate_interval,
            processed: AtomicU64::new(0),
            credentials,
        })
    }

    async fn log_in(&self, page: &Page, credential: &Credential) -> Result<(), FetchError> {
        tracing::debug!("Login form present, signing in as {}", credential.username);

        page.find_element(self.login.username_selector.as_str())
            .await
            .map_err(browser_error)?
            .type_str(&credential.username)
            .await
            .map_err(browser_error)?;
        page.find_element(self.login.password_selector.as_str())
            .await
            .map_err(browser_error)?
            .type_str(&credential.password)
            .await
            .map_err(browser_error)?;

        if let Some(remember) = &self.login.remember_selector {
            if let Ok(checkbox) = page.find_element(remember.as_str()).await {
                checkbox.click().await.map_err(browser_error)?;
            }
        }

        page.find_element(self.login.submit_selector.as_str())
            .await
            .map_err(browser_error)?
            .click()
            .await
            .map_err(browser_error)?;

        // A login that stays on the same page never navigates
        let _ = tokio::time::timeout(LOGIN_NAVIGATION_TIMEOUT, page.wait_for_navigation()).await;
        Ok(())
    }

    async fn wait_for_marker(&self, page: &Page) -> bool {
        let deadline = Instant::now() + self.dom_timeout;
        loop {
            if page.find_element(self.marker_selector.as_str()).await.is_ok() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(MARKER_POLL_INTERVAL).await;
        }
    }
}

impl Drop for BrowserFetcher {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

fn browser_error(error: chromiumoxide::error::CdpError) -> FetchError {
    FetchError::Browser(error.to_string())
}

#[async_trait]
impl FetchStrategy for BrowserFetcher {
    async fn fetch(&self, id: u64, timeout: Duration) -> Result<FetchOutcome, FetchError> {
        let page = self.page.lock().await;

        let processed = self.processed.fetch_add(1, Ordering::Relaxed) + 1;
        if self.rotate_interval > 0 && processed % self.rotate_interval == 0 {
            tracing::debug!("Rotating session after {} IDs", processed);
            page.execute(ClearBrowserCookiesParams::default())
                .await
                .map_err(browser_error)?;
        }

        let url = record_url(&self.base_url, id);
        match tokio::time::timeout(timeout, page.goto(url.as_str())).await {
            Ok(result) => {
                result.map_err(browser_error)?;
            }
            Err(_) => {
                tracing::debug!("Navigation to {} timed out after {:?}", id, timeout);
                return Ok(FetchOutcome::TimedOut);
            }
        }

        if page
            .find_element(self.login.username_selector.as_str())
            .await
            .is_ok()
        {
            let credential = self.credentials.sample().clone();
            self.log_in(&page, &credential).await?;
        }

        if !self.wait_for_marker(&page).await {
            tracing::debug!("No marker element for {}", id);
            return Ok(FetchOutcome::TimedOut);
        }

        let html = page.content().await.map_err(browser_error)?;
        Ok(FetchOutcome::Document(html))
    }

    fn name(&self) -> &'static str {
        "browser"
    }

    fn supports_concurrency(&self) -> bool {
        false
    }
}
