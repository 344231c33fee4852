use crate::fetch::{classify_error, record_url, FetchError, FetchOutcome, FetchStrategy};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Plain HTTP GET against the record view endpoint
#[derive(Debug, Clone)]
pub struct DirectFetcher {
    client: Client,
    base_url: Url,
}

impl DirectFetcher {
    pub fn new(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }
}

#[async_trait]
impl FetchStrategy for DirectFetcher {
    async fn fetch(&self, id: u64, timeout: Duration) -> Result<FetchOutcome, FetchError> {
        let url = record_url(&self.base_url, id);
        tracing::trace!("GET {}", url);

        let request = async {
            let response = self.client.get(url.clone()).send().await?;
            response.error_for_status()?.text().await
        };

        match tokio::time::timeout(timeout, request).await {
            Ok(Ok(body)) => Ok(FetchOutcome::Document(body)),
            Ok(Err(e)) => classify_error(&url, e).into_outcome(),
            Err(_) => {
                tracing::debug!("Fetch for {} timed out after {:?}", id, timeout);
                Ok(FetchOutcome::TimedOut)
            }
        }
    }

    fn name(&self) -> &'static str {
        "direct"
    }
}
