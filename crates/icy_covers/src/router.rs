//! Source selection with a single fallback hop.
//!
//! The router owns both sources and picks one per call from the current
//! [`SourceMode`]. When the active source comes up short, the remainder is asked
//! of the other source once. No state about earlier failures is kept between calls.

use crate::{
    events::{CoverEvent, EventBus},
    ImageHandle, ImageSource, LocalSource, RemoteSource, SourceMode,
};

pub struct SupplyRouter<L = LocalSource, R = RemoteSource> {
    mode: SourceMode,
    local: L,
    remote: R,
    events: EventBus,
}

impl<L, R> SupplyRouter<L, R>
where
    L: ImageSource,
    R: ImageSource,
{
    pub fn new(local: L, remote: R, mode: SourceMode, events: EventBus) -> Self {
        Self { mode, local, remote, events }
    }

    pub fn mode(&self) -> SourceMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: SourceMode) {
        if self.mode != mode {
            log::info!("Switching image source from {} to {}", self.mode, mode);
            self.mode = mode;
        }
    }

    pub fn local(&self) -> &L {
        &self.local
    }

    pub fn local_mut(&mut self) -> &mut L {
        &mut self.local
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn remote_mut(&mut self) -> &mut R {
        &mut self.remote
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// One image from the active source, or from the other one if the active source has none.
    pub async fn fetch_one(&mut self) -> Option<ImageHandle> {
        let active = self.mode;
        if let Some(image) = self.fetch_one_from(active).await {
            return Some(image);
        }

        let fallback = self.begin_fallback(active);
        let image = self.fetch_one_from(fallback).await;
        if image.is_none() {
            self.events.emit(CoverEvent::FetchFailed { source: fallback });
        }
        image
    }

    /// Up to `count` images: whatever the active source delivers, topped up from the other one.
    pub async fn fetch_many(&mut self, count: usize) -> Vec<ImageHandle> {
        if count == 0 {
            return Vec::new();
        }
        let active = self.mode;
        let mut images = self.fetch_many_from(active, count).await;
        if images.len() >= count {
            return images;
        }

        let fallback = self.begin_fallback(active);
        let missing = count - images.len();
        let extra = self.fetch_many_from(fallback, missing).await;
        if extra.len() < missing {
            self.events.emit(CoverEvent::FetchFailed { source: fallback });
        }
        images.extend(extra);
        images
    }

    fn begin_fallback(&self, failed: SourceMode) -> SourceMode {
        let next = failed.other();
        self.events.emit(CoverEvent::FetchFailed { source: failed });
        self.events.emit(CoverEvent::FallbackTriggered { from: failed, to: next });
        next
    }

    async fn fetch_one_from(&mut self, mode: SourceMode) -> Option<ImageHandle> {
        match mode {
            SourceMode::Local => self.local.fetch_one().await,
            SourceMode::Remote => self.remote.fetch_one().await,
        }
    }

    async fn fetch_many_from(&mut self, mode: SourceMode, count: usize) -> Vec<ImageHandle> {
        match mode {
            SourceMode::Local => self.local.fetch_many(count).await,
            SourceMode::Remote => self.remote.fetch_many(count).await,
        }
    }
}
