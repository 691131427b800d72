//! Grid coordinator - keeps the cell grid in sync with the image supply
//!
//! Two kinds of work touch the grid:
//! - Rebuilds (resize, source switch, manual reset) regenerate every cell
//! - Ticks from the refresh timer replace one random cell
//!
//! Rebuilds are serialized through `rebuild_lock`, so a second rebuild queues behind
//! the first instead of interleaving with it. `rebuild_in_progress` lives in
//! [`GridState`] behind one mutex; ticks check it before fetching and again before
//! applying, and drop their image if a rebuild ran in between.

use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use parking_lot::Mutex;
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{interval_at, Instant, Interval, MissedTickBehavior},
};

use super::{cell_edge, Cell};
use crate::{
    config::{validate_dimension, validate_refresh_interval},
    events::{CoverEvent, EventBus, SkipReason},
    CoverResult, GridConfig, ImageSource, LocalSource, RemoteSource, SourceMode, SupplyRouter,
};

/// Everything the coordinator knows about the grid
#[derive(Debug, Clone, PartialEq)]
pub struct GridState {
    /// Rows = columns
    pub dimension: u32,
    /// `dimension * dimension` cells, row major
    pub cells: Vec<Cell>,
    pub refresh_interval_secs: u64,
    pub mode: SourceMode,
    pub rebuild_in_progress: bool,
    /// Display area in pixels (width, height)
    pub display_area: (u32, u32),
    /// Bumped every time a rebuild swaps in a new cell sequence
    pub generation: u64,
}

impl GridState {
    fn new(config: &GridConfig) -> Self {
        let count = (config.dimension * config.dimension) as usize;
        let mut state = Self {
            dimension: config.dimension,
            cells: vec![Cell::empty(); count],
            refresh_interval_secs: config.refresh_interval_secs,
            mode: config.mode,
            rebuild_in_progress: false,
            display_area: config.display_area,
            generation: 0,
        };
        state.layout_cells();
        state
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn filled_count(&self) -> usize {
        self.cells.iter().filter(|cell| !cell.is_empty()).count()
    }

    /// Edge every cell should have for the current dimension and display area
    pub fn cell_edge(&self) -> u32 {
        cell_edge(self.display_area, self.dimension)
    }

    fn layout_cells(&mut self) {
        let d = self.dimension.max(1);
        let (width, height) = (self.display_area.0 / d, self.display_area.1 / d);
        for cell in &mut self.cells {
            cell.resize(width, height);
        }
    }
}

/// What a rebuild changes before regenerating the cells
#[derive(Debug, Clone, Copy)]
enum GridChange {
    Nothing,
    Dimension(u32),
    Mode(SourceMode),
}

pub struct GridCoordinator<L = LocalSource, R = RemoteSource> {
    state: Mutex<GridState>,
    router: tokio::sync::Mutex<SupplyRouter<L, R>>,
    rebuild_lock: tokio::sync::Mutex<()>,
    period: watch::Sender<Duration>,
    timer: Mutex<Option<JoinHandle<()>>>,
    events: EventBus,
}

impl<L, R> GridCoordinator<L, R>
where
    L: ImageSource + 'static,
    R: ImageSource + 'static,
{
    /// The grid starts with empty cells; call [`Self::force_rebuild`] to populate it.
    pub fn new(mut router: SupplyRouter<L, R>, config: &GridConfig) -> CoverResult<Self> {
        config.validate()?;
        router.set_mode(config.mode);
        let events = router.events().clone();
        let (period, _) = watch::channel(Duration::from_secs(config.refresh_interval_secs));
        Ok(Self {
            state: Mutex::new(GridState::new(config)),
            router: tokio::sync::Mutex::new(router),
            rebuild_lock: tokio::sync::Mutex::new(()),
            period,
            timer: Mutex::new(None),
            events,
        })
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Copy of the current grid
    pub fn snapshot(&self) -> GridState {
        self.state.lock().clone()
    }

    pub fn dimension(&self) -> u32 {
        self.state.lock().dimension
    }

    pub fn source_mode(&self) -> SourceMode {
        self.state.lock().mode
    }

    pub fn is_rebuilding(&self) -> bool {
        self.state.lock().rebuild_in_progress
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Switch to an `n` x `n` grid and rebuild. Unsupported sizes are rejected up front.
    pub async fn set_grid_dimension(&self, dimension: u32) -> CoverResult<()> {
        validate_dimension(dimension)?;
        self.rebuild(GridChange::Dimension(dimension)).await;
        Ok(())
    }

    /// Switch the active source and rebuild.
    pub async fn set_source_mode(&self, mode: SourceMode) {
        self.rebuild(GridChange::Mode(mode)).await;
    }

    /// Change the remote search term. The grid is left as is; new terms show up as cells get replaced.
    pub async fn set_search_query(&self, query: &str) {
        self.router.lock().await.remote_mut().set_search_query(query);
    }

    pub async fn search_query(&self) -> Option<String> {
        self.router.lock().await.remote().search_query().map(str::to_string)
    }

    /// Regenerate every cell with the current settings.
    pub async fn force_rebuild(&self) {
        self.rebuild(GridChange::Nothing).await;
    }

    /// Reprogram the refresh timer period. Whether the timer runs is not affected.
    pub fn set_refresh_interval(&self, seconds: u64) -> CoverResult<()> {
        validate_refresh_interval(seconds)?;
        self.state.lock().refresh_interval_secs = seconds;
        self.period.send_replace(Duration::from_secs(seconds));
        log::info!("Refresh interval set to {}s", seconds);
        Ok(())
    }

    pub fn refresh_interval(&self) -> u64 {
        self.state.lock().refresh_interval_secs
    }

    /// Re-layout the existing cells for a new display area; images are kept.
    /// During a rebuild only the area is recorded, the rebuild lays out with it when it finishes.
    pub fn on_display_area_changed(&self, width: u32, height: u32) {
        let mut state = self.state.lock();
        state.display_area = (width, height);
        if state.rebuild_in_progress {
            log::debug!("Display area changed to {}x{} during rebuild, layout deferred", width, height);
            return;
        }
        state.layout_cells();
    }

    // ========================================================================
    // Rebuild & tick
    // ========================================================================

    async fn rebuild(&self, change: GridChange) {
        let _serial = self.rebuild_lock.lock().await;

        let (dimension, mode) = {
            let mut state = self.state.lock();
            match change {
                GridChange::Nothing => {}
                GridChange::Dimension(dimension) => state.dimension = dimension,
                GridChange::Mode(mode) => state.mode = mode,
            }
            state.rebuild_in_progress = true;
            (state.dimension, state.mode)
        };
        self.events.emit(CoverEvent::RebuildStarted { dimension });

        let requested = (dimension * dimension) as usize;
        let images = {
            let mut router = self.router.lock().await;
            router.set_mode(mode);
            router.fetch_many(requested).await
        };

        let mut cells: Vec<Cell> = images.into_iter().take(requested).map(Cell::new).collect();
        let filled = cells.len();
        cells.resize_with(requested, Cell::empty);

        {
            let mut state = self.state.lock();
            state.cells = cells;
            state.layout_cells();
            state.generation += 1;
            state.rebuild_in_progress = false;
        }
        self.events.emit(CoverEvent::RebuildCompleted { filled, requested });
    }

    /// Replace one random cell. Skipped entirely if a rebuild is running or ran meanwhile,
    /// or if the supply is still busy with an earlier request.
    pub async fn tick(&self) {
        let picked = {
            let state = self.state.lock();
            if state.rebuild_in_progress {
                Err(SkipReason::RebuildInProgress)
            } else if state.cells.is_empty() {
                Err(SkipReason::EmptyGrid)
            } else {
                Ok((fastrand::usize(..state.cells.len()), state.generation))
            }
        };
        let (index, generation) = match picked {
            Ok(picked) => picked,
            Err(reason) => return self.skip_tick(reason),
        };

        let image = {
            // A tick never waits for the supply; if the previous tick or a rebuild still holds it, this one is dropped
            let Ok(mut router) = self.router.try_lock() else {
                return self.skip_tick(SkipReason::SupplyBusy);
            };
            if let Err(reason) = self.check_unchanged(generation) {
                return self.skip_tick(reason);
            }
            router.fetch_one().await
        };
        let Some(image) = image else {
            return self.skip_tick(SkipReason::NotFound);
        };

        let applied = {
            let mut state = self.state.lock();
            if state.rebuild_in_progress {
                Err(SkipReason::RebuildInProgress)
            } else if state.generation != generation {
                Err(SkipReason::GridChanged)
            } else {
                state.cells[index].set_image(image);
                Ok(())
            }
        };
        match applied {
            Ok(()) => self.events.emit(CoverEvent::TickReplaced { index }),
            Err(reason) => self.skip_tick(reason),
        }
    }

    fn check_unchanged(&self, generation: u64) -> Result<(), SkipReason> {
        let state = self.state.lock();
        if state.rebuild_in_progress {
            Err(SkipReason::RebuildInProgress)
        } else if state.generation != generation {
            Err(SkipReason::GridChanged)
        } else {
            Ok(())
        }
    }

    fn skip_tick(&self, reason: SkipReason) {
        self.events.emit(CoverEvent::TickSkipped { reason });
    }

    // ========================================================================
    // Refresh timer
    // ========================================================================

    /// Start the periodic tick task. Must be called from within a tokio runtime.
    pub fn start_timer(self: &Arc<Self>) {
        let mut timer = self.timer.lock();
        if timer.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }
        let period_rx = self.period.subscribe();
        *timer = Some(tokio::spawn(run_timer(Arc::downgrade(self), period_rx)));
        log::info!("Refresh timer started ({}s)", self.refresh_interval());
    }

    pub fn stop_timer(&self) {
        if let Some(handle) = self.timer.lock().take() {
            handle.abort();
            log::info!("Refresh timer stopped");
        }
    }

    pub fn is_timer_running(&self) -> bool {
        self.timer.lock().as_ref().is_some_and(|handle| !handle.is_finished())
    }
}

impl<L, R> Drop for GridCoordinator<L, R> {
    fn drop(&mut self) {
        if let Some(handle) = self.timer.get_mut().take() {
            handle.abort();
        }
    }
}

fn ticker(period: Duration) -> Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// Fires on a fixed period. Each tick runs as its own task so a slow fetch never holds up the schedule.
async fn run_timer<L, R>(coordinator: Weak<GridCoordinator<L, R>>, mut period_rx: watch::Receiver<Duration>)
where
    L: ImageSource + 'static,
    R: ImageSource + 'static,
{
    let mut period = *period_rx.borrow_and_update();
    let mut timer = ticker(period);
    loop {
        tokio::select! {
            _ = timer.tick() => {
                let Some(coordinator) = coordinator.upgrade() else {
                    break;
                };
                tokio::spawn(async move {
                    coordinator.tick().await;
                });
            }
            changed = period_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let next = *period_rx.borrow_and_update();
                if next != period {
                    period = next;
                    timer = ticker(period);
                }
            }
        }
    }
}
