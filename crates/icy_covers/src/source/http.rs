//! HTTP access for the remote source, behind a trait so tests can swap in canned responses.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde_json::Value;

use crate::{CoverError, CoverResult, RemoteConfig};

#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// GET `url` with the given query parameters and parse the body as JSON.
    async fn get_json(&self, url: &str, params: &[(&str, String)]) -> CoverResult<Value>;

    /// GET `url` and return the raw body.
    async fn get_bytes(&self, url: &str) -> CoverResult<Vec<u8>>;
}

#[async_trait]
impl<T: CatalogClient + ?Sized> CatalogClient for Arc<T> {
    async fn get_json(&self, url: &str, params: &[(&str, String)]) -> CoverResult<Value> {
        (**self).get_json(url, params).await
    }

    async fn get_bytes(&self, url: &str) -> CoverResult<Vec<u8>> {
        (**self).get_bytes(url).await
    }
}

/// Production client on top of reqwest
#[derive(Clone)]
pub struct ReqwestCatalogClient {
    client: reqwest::Client,
}

impl ReqwestCatalogClient {
    pub fn new(config: &RemoteConfig) -> CoverResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|err| CoverError::Http(format!("Failed to create HTTP client: {err}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl CatalogClient for ReqwestCatalogClient {
    async fn get_json(&self, url: &str, params: &[(&str, String)]) -> CoverResult<Value> {
        let response = self.client.get(url).query(params).send().await?;
        if !response.status().is_success() {
            return Err(CoverError::Http(format!("HTTP {} from {}", response.status(), url)));
        }
        response.json::<Value>().await.map_err(|err| CoverError::Parse(err.to_string()))
    }

    async fn get_bytes(&self, url: &str) -> CoverResult<Vec<u8>> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(CoverError::Http(format!("HTTP {} from {}", response.status(), url)));
        }
        Ok(response.bytes().await?.to_vec())
    }
}
