use async_trait::async_trait;
use serde_json::Value;

use super::{CatalogClient, ImageSource, ReqwestCatalogClient, SourceQueue};
use crate::{CoverError, CoverResult, ImageHandle, RemoteConfig, SourceMode};

/// Serves cover image URLs from a catalog search.
///
/// A refill is one search request; the URLs it yields are only downloaded and
/// decoded when popped, so one broken URL costs a single image, not the batch.
pub struct RemoteSource<C = ReqwestCatalogClient> {
    client: C,
    config: RemoteConfig,
    search_query: String,
    queue: SourceQueue<String>,
}

impl RemoteSource<ReqwestCatalogClient> {
    pub fn new(config: RemoteConfig) -> CoverResult<Self> {
        let client = ReqwestCatalogClient::new(&config)?;
        Ok(Self::with_client(client, config))
    }
}

impl<C: CatalogClient> RemoteSource<C> {
    pub fn with_client(client: C, config: RemoteConfig) -> Self {
        Self {
            client,
            search_query: config.search_query.clone(),
            config,
            queue: SourceQueue::new(),
        }
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    fn search_params(&self) -> Vec<(&'static str, String)> {
        let query: String = self.search_query.chars().filter(|c| !c.is_whitespace()).collect();
        vec![
            ("q", query),
            ("per_page", self.config.per_page().to_string()),
            ("key", self.config.key.clone()),
            ("secret", self.config.secret.clone()),
        ]
    }
}

/// Pull the non-blank `cover_image` fields out of a search response.
pub fn extract_cover_urls(json: &Value) -> CoverResult<Vec<String>> {
    let Some(results) = json["results"].as_array() else {
        return Err(CoverError::Parse("response has no 'results' array".to_string()));
    };
    let urls = results
        .iter()
        .filter_map(|release| release["cover_image"].as_str())
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .collect();
    Ok(urls)
}

#[async_trait]
impl<C: CatalogClient> ImageSource for RemoteSource<C> {
    type Locator = String;

    fn mode(&self) -> SourceMode {
        SourceMode::Remote
    }

    fn queue(&self) -> &SourceQueue<String> {
        &self.queue
    }

    fn queue_mut(&mut self) -> &mut SourceQueue<String> {
        &mut self.queue
    }

    async fn load_locators(&self) -> CoverResult<Vec<String>> {
        if !self.config.has_credentials() {
            return Err(CoverError::MissingCredentials);
        }
        let json = self.client.get_json(&self.config.endpoint, &self.search_params()).await?;
        let total = json["results"].as_array().map_or(0, Vec::len);
        let mut urls = extract_cover_urls(&json)?;
        fastrand::shuffle(&mut urls);
        urls.truncate(self.config.batch_size);
        log::info!("Catalog search '{}' returned {} results, {} image URLs", self.search_query, total, urls.len());
        Ok(urls)
    }

    async fn resolve(&self, locator: &String) -> CoverResult<ImageHandle> {
        let bytes = self.client.get_bytes(locator).await?;
        ImageHandle::decode_async(locator.clone(), bytes).await
    }

    fn search_query(&self) -> Option<&str> {
        Some(&self.search_query)
    }

    /// The queued URLs belong to the old term and are dropped, the next fetch refills.
    /// Setting the current value again does nothing.
    fn set_search_query(&mut self, query: &str) {
        if query == self.search_query {
            return;
        }
        log::info!("Catalog search query changed to '{}'", query);
        self.search_query = query.to_string();
        self.queue.invalidate();
    }
}
