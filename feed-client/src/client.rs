use crate::parser::parse_feed;
use reqwest::Client;
use seedgate_core::{CoreError, FeedEntry, FeedError, FeedSource};
use std::time::Duration;
use tracing::{debug, info, warn};

const USER_AGENT: &str = concat!("seedgate/", env!("CARGO_PKG_VERSION"));

/// Fetches feeds over HTTP and parses them into entries.
#[derive(Debug, Clone)]
pub struct HttpFeedClient {
    http_client: Client,
}

impl HttpFeedClient {
    pub fn new(timeout: Duration) -> Result<Self, CoreError> {
        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self { http_client })
    }

    pub fn with_client(http_client: Client) -> Self {
        Self { http_client }
    }

    fn transport_error(url: &str, error: reqwest::Error) -> FeedError {
        if error.is_timeout() {
            FeedError::Timeout {
                url: url.to_string(),
            }
        } else {
            FeedError::Unreachable {
                url: url.to_string(),
                reason: error.to_string(),
            }
        }
    }
}

impl FeedSource for HttpFeedClient {
    async fn fetch(&self, url: &str) -> Result<Vec<FeedEntry>, CoreError> {
        debug!("Fetching feed from: {}", url);

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| Self::transport_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Feed request failed with status: {} for {}", status, url);
            return Err(FeedError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Self::transport_error(url, e))?;

        let entries = parse_feed(url, &bytes)?;
        info!("Retrieved {} entries from {}", entries.len(), url);
        Ok(entries)
    }
}
