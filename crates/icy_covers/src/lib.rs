//! Image supply pipeline for the cover wall screensaver.
//!
//! - [`LocalSource`] / [`RemoteSource`] serve shuffled images from a directory or a catalog search
//! - [`SupplyRouter`] picks the active source and falls back to the other one on shortfall
//! - [`GridCoordinator`] keeps an N x N grid of [`Cell`]s filled, rebuilding on configuration
//!   changes and replacing one random cell per timer tick
//!
//! Drawing the cells, windows and the settings form are left to the embedding application.

#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::cast_possible_truncation
)]

pub mod config;
mod error;
pub mod events;
mod grid;
mod image_handle;
mod router;
mod source;

pub use config::{CoverConfig, GridConfig, LocalConfig, RemoteConfig, SourceMode, SUPPORTED_GRID_SIZES};
pub use error::*;
pub use events::{CoverEvent, EventBus, EventLog, LoggedEvent, SkipReason};
pub use grid::*;
pub use image_handle::*;
pub use router::*;
pub use source::*;

/// Build the production pipeline from one configuration value.
pub fn build_coordinator(config: &CoverConfig) -> CoverResult<GridCoordinator> {
    let events = EventBus::new(config.log_capacity);
    let local = LocalSource::new(config.local.clone());
    let remote = RemoteSource::new(config.remote.clone())?;
    let router = SupplyRouter::new(local, remote, config.grid.mode, events);
    GridCoordinator::new(router, &config.grid)
}
