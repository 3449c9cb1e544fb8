use crate::{HarvestError, PageFetcher};
use reqwest::Client;
use tracing::debug;

/// Plain GET over a shared `reqwest` client with the transport defaults.
#[derive(Debug, Default, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_page(&self, url: &str) -> Result<String, HarvestError> {
        debug!("Visit {}", url);
        let html = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(html)
    }
}
