#![allow(dead_code)]

use std::{
    collections::HashMap,
    io::Cursor,
    path::Path,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::Semaphore;

pub use icy_covers::*;

// ============================================================================
// Fixtures
// ============================================================================

pub fn png_bytes(shade: u8) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(3, 3, image::Rgba([shade, 255 - shade, shade / 2, 255]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

/// Write `count` small PNG files named `cover_00.png`, `cover_01.png`, ...
pub fn write_covers(dir: &Path, count: usize) {
    for i in 0..count {
        std::fs::write(dir.join(format!("cover_{i:02}.png")), png_bytes(i as u8)).unwrap();
    }
}

pub fn local_source(dir: &Path) -> LocalSource {
    LocalSource::new(LocalConfig {
        directory: dir.to_path_buf(),
    })
}

pub fn remote_config() -> RemoteConfig {
    RemoteConfig::default().with_credentials("test-key", "test-secret")
}

// ============================================================================
// In-memory catalog
// ============================================================================

/// Catalog client answering from canned data
#[derive(Default)]
pub struct StaticCatalog {
    /// `None` simulates a network failure on search
    pub search_response: Mutex<Option<Value>>,
    pub images: Mutex<HashMap<String, Vec<u8>>>,
    pub searches: AtomicUsize,
    pub downloads: AtomicUsize,
    pub last_params: Mutex<Vec<(String, String)>>,
}

impl StaticCatalog {
    /// Catalog with `count` results whose covers all decode
    pub fn with_covers(count: usize) -> Arc<Self> {
        let catalog = Self::default();
        let mut results = Vec::new();
        for i in 0..count {
            let url = format!("https://img.example/{i}.png");
            catalog.images.lock().insert(url.clone(), png_bytes(i as u8));
            results.push(serde_json::json!({ "title": format!("Album {i}"), "cover_image": url }));
        }
        *catalog.search_response.lock() = Some(serde_json::json!({ "results": results }));
        Arc::new(catalog)
    }

    pub fn empty() -> Arc<Self> {
        let catalog = Self::default();
        *catalog.search_response.lock() = Some(serde_json::json!({ "results": [] }));
        Arc::new(catalog)
    }

    pub fn unreachable() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn param(&self, name: &str) -> Option<String> {
        self.last_params.lock().iter().find(|(k, _)| k == name).map(|(_, v)| v.clone())
    }
}

#[async_trait]
impl CatalogClient for StaticCatalog {
    async fn get_json(&self, _url: &str, params: &[(&str, String)]) -> CoverResult<Value> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        *self.last_params.lock() = params.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
        self.search_response.lock().clone().ok_or_else(|| CoverError::Http("connection refused".to_string()))
    }

    async fn get_bytes(&self, url: &str) -> CoverResult<Vec<u8>> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        self.images.lock().get(url).cloned().ok_or_else(|| CoverError::Http(format!("HTTP 404 Not Found from {url}")))
    }
}

pub fn remote_source(catalog: &Arc<StaticCatalog>) -> RemoteSource<Arc<StaticCatalog>> {
    RemoteSource::with_client(catalog.clone(), remote_config())
}

// ============================================================================
// Scripted source
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    One(SourceMode),
    Many(SourceMode, usize),
}

/// Source with a fixed stock of distinct images that records every call
pub struct ScriptedSource {
    mode: SourceMode,
    /// `None` = never runs out
    stock: Option<usize>,
    served: usize,
    calls: Arc<Mutex<Vec<Call>>>,
    /// When set, every `fetch_many` waits for one permit
    gate: Option<Arc<Semaphore>>,
    /// Same for `fetch_one`
    single_gate: Option<Arc<Semaphore>>,
    queue: SourceQueue<String>,
}

impl ScriptedSource {
    pub fn new(mode: SourceMode, stock: Option<usize>, calls: &Arc<Mutex<Vec<Call>>>) -> Self {
        Self {
            mode,
            stock,
            served: 0,
            calls: calls.clone(),
            gate: None,
            single_gate: None,
            queue: SourceQueue::new(),
        }
    }

    pub fn gated(mut self, gate: &Arc<Semaphore>) -> Self {
        self.gate = Some(gate.clone());
        self
    }

    pub fn gated_single(mut self, gate: &Arc<Semaphore>) -> Self {
        self.single_gate = Some(gate.clone());
        self
    }

    fn next_image(&mut self) -> Option<ImageHandle> {
        if self.stock.is_some_and(|stock| self.served >= stock) {
            return None;
        }
        self.served += 1;
        let shade = (self.served % 251) as u8;
        let pixel = image::RgbaImage::from_pixel(1, 1, image::Rgba([shade, 0, 0, 255]));
        Some(ImageHandle::from_rgba(format!("{}-{}", self.mode, self.served), pixel))
    }
}

#[async_trait]
impl ImageSource for ScriptedSource {
    type Locator = String;

    fn mode(&self) -> SourceMode {
        self.mode
    }

    fn queue(&self) -> &SourceQueue<String> {
        &self.queue
    }

    fn queue_mut(&mut self) -> &mut SourceQueue<String> {
        &mut self.queue
    }

    async fn load_locators(&self) -> CoverResult<Vec<String>> {
        Ok(Vec::new())
    }

    async fn resolve(&self, locator: &String) -> CoverResult<ImageHandle> {
        Err(CoverError::Decode {
            locator: locator.clone(),
            message: "scripted".to_string(),
        })
    }

    async fn fetch_one(&mut self) -> Option<ImageHandle> {
        self.calls.lock().push(Call::One(self.mode));
        if let Some(gate) = &self.single_gate {
            gate.acquire().await.unwrap().forget();
        }
        self.next_image()
    }

    async fn fetch_many(&mut self, count: usize) -> Vec<ImageHandle> {
        self.calls.lock().push(Call::Many(self.mode, count));
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        (0..count).map_while(|_| self.next_image()).collect()
    }
}

pub type ScriptedRouter = SupplyRouter<ScriptedSource, ScriptedSource>;

pub fn scripted_router(local_stock: Option<usize>, remote_stock: Option<usize>) -> (ScriptedRouter, Arc<Mutex<Vec<Call>>>) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let router = SupplyRouter::new(
        ScriptedSource::new(SourceMode::Local, local_stock, &calls),
        ScriptedSource::new(SourceMode::Remote, remote_stock, &calls),
        SourceMode::Local,
        EventBus::new(200),
    );
    (router, calls)
}
