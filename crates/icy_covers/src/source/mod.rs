//! Image sources: a local directory and the remote catalog search.
//!
//! Both variants share the same queue discipline. A source keeps a [`SourceQueue`]
//! of unresolved locators, refills it in one go when it runs dry and resolves each
//! locator only when it is popped. Failures below this trait are logged and turned
//! into absence; nothing is raised to the caller.

use std::{collections::HashSet, fmt, hash::Hash};

use async_trait::async_trait;

use crate::{CoverResult, ImageHandle, SourceMode};

mod http;
mod local;
mod queue;
mod remote;

pub use http::*;
pub use local::*;
pub use queue::*;
pub use remote::*;

#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Unresolved reference to an image (file path, URL)
    type Locator: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static;

    fn mode(&self) -> SourceMode;

    fn queue(&self) -> &SourceQueue<Self::Locator>;

    fn queue_mut(&mut self) -> &mut SourceQueue<Self::Locator>;

    /// Produce a fresh, already shuffled batch of locators from the backend.
    async fn load_locators(&self) -> CoverResult<Vec<Self::Locator>>;

    /// Turn one locator into a decoded image.
    async fn resolve(&self, locator: &Self::Locator) -> CoverResult<ImageHandle>;

    /// Current search term, for sources that are driven by one.
    fn search_query(&self) -> Option<&str> {
        None
    }

    /// Change the search term. Sources without one ignore it.
    fn set_search_query(&mut self, _query: &str) {}

    /// Replace the queue content with a fresh batch, returns the number of new locators.
    /// A failing backend leaves the queue empty.
    async fn refill(&mut self) -> usize {
        let locators = match self.load_locators().await {
            Ok(locators) => locators,
            Err(err) => {
                log::warn!("Refill of {} source failed: {}", self.mode(), err);
                Vec::new()
            }
        };
        let count = locators.len();
        self.queue_mut().replace(locators);
        log::debug!("{} source queue refilled with {} locators", self.mode(), count);
        count
    }

    /// One image, refilling at most once. `None` if the backend has nothing to give.
    async fn fetch_one(&mut self) -> Option<ImageHandle> {
        let mut refilled = false;
        loop {
            if self.queue().is_empty() {
                if refilled {
                    return None;
                }
                refilled = true;
                if self.refill().await == 0 {
                    return None;
                }
            }
            let locator = self.queue_mut().pop()?;
            match self.resolve(&locator).await {
                Ok(image) => return Some(image),
                Err(err) => log::warn!("Dropping {:?} from {} source: {}", locator, self.mode(), err),
            }
        }
    }

    /// Up to `count` images in queue order.
    ///
    /// Refills whenever the queue runs dry and stops once a refill brings nothing new,
    /// or a whole refilled batch failed to resolve.
    async fn fetch_many(&mut self, count: usize) -> Vec<ImageHandle> {
        let mut images = Vec::with_capacity(count);
        let mut served: HashSet<Self::Locator> = HashSet::new();
        let mut resolved_since_refill = true;

        while images.len() < count {
            if self.queue().is_empty() {
                if !resolved_since_refill || self.refill().await == 0 {
                    break;
                }
                resolved_since_refill = false;
                // Prefer locators not yet handed out in this call; repeat only when the backend is smaller than `count`.
                let queue = self.queue_mut();
                if queue.iter().any(|locator| !served.contains(locator)) {
                    queue.retain(|locator| !served.contains(locator));
                }
            }
            let Some(locator) = self.queue_mut().pop() else {
                break;
            };
            match self.resolve(&locator).await {
                Ok(image) => {
                    images.push(image);
                    served.insert(locator);
                    resolved_since_refill = true;
                }
                Err(err) => log::warn!("Dropping {:?} from {} source: {}", locator, self.mode(), err),
            }
        }

        if images.len() < count {
            log::info!("{} source delivered {} of {} images", self.mode(), images.len(), count);
        }
        images
    }
}
