//! Structured events for the log view and the process log.
//!
//! Every event goes three ways: the `log` facade, a bounded in-memory [`EventLog`]
//! (oldest entry evicted first) and a broadcast channel for any attached view.

use std::{collections::VecDeque, fmt, sync::Arc};

use chrono::{DateTime, Local};
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::SourceMode;

const BROADCAST_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoverEvent {
    /// A source could not satisfy a request
    FetchFailed { source: SourceMode },
    /// The router is retrying against the other source
    FallbackTriggered { from: SourceMode, to: SourceMode },
    RebuildStarted { dimension: u32 },
    RebuildCompleted { filled: usize, requested: usize },
    TickReplaced { index: usize },
    TickSkipped { reason: SkipReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// A rebuild was running when the tick fired
    RebuildInProgress,
    /// A rebuild replaced the grid while the tick was fetching
    GridChanged,
    /// An earlier tick or a rebuild was still fetching
    SupplyBusy,
    /// Both sources came up empty
    NotFound,
    EmptyGrid,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::RebuildInProgress => write!(f, "rebuild in progress"),
            SkipReason::GridChanged => write!(f, "grid changed during fetch"),
            SkipReason::SupplyBusy => write!(f, "supply busy"),
            SkipReason::NotFound => write!(f, "no image available"),
            SkipReason::EmptyGrid => write!(f, "grid has no cells"),
        }
    }
}

impl CoverEvent {
    fn is_warning(&self) -> bool {
        matches!(
            self,
            CoverEvent::FetchFailed { .. }
                | CoverEvent::FallbackTriggered { .. }
                | CoverEvent::TickSkipped { reason: SkipReason::NotFound }
        )
    }
}

impl fmt::Display for CoverEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoverEvent::FetchFailed { source } => write!(f, "fetch_failed source={source}"),
            CoverEvent::FallbackTriggered { from, to } => write!(f, "fallback_triggered from={from} to={to}"),
            CoverEvent::RebuildStarted { dimension } => write!(f, "rebuild_started dimension={dimension}"),
            CoverEvent::RebuildCompleted { filled, requested } => write!(f, "rebuild_completed filled={filled} requested={requested}"),
            CoverEvent::TickReplaced { index } => write!(f, "tick_replaced index={index}"),
            CoverEvent::TickSkipped { reason } => write!(f, "tick_skipped reason={reason}"),
        }
    }
}

/// One line of the event log
#[derive(Debug, Clone)]
pub struct LoggedEvent {
    pub at: DateTime<Local>,
    pub event: CoverEvent,
}

impl fmt::Display for LoggedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.at.format("%H:%M:%S"), self.event)
    }
}

/// Bounded event history, oldest entries are evicted once `capacity` is reached
pub struct EventLog {
    entries: VecDeque<LoggedEvent>,
    capacity: usize,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, event: CoverEvent) {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(LoggedEvent { at: Local::now(), event });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest first
    pub fn entries(&self) -> impl Iterator<Item = &LoggedEvent> {
        self.entries.iter()
    }
}

/// Cloneable handle used by the router and the coordinator to report events
#[derive(Clone)]
pub struct EventBus {
    history: Arc<Mutex<EventLog>>,
    tx: broadcast::Sender<CoverEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            history: Arc::new(Mutex::new(EventLog::new(capacity))),
            tx,
        }
    }

    pub fn emit(&self, event: CoverEvent) {
        if event.is_warning() {
            log::warn!("{}", event);
        } else {
            log::info!("{}", event);
        }
        self.history.lock().push(event.clone());
        // No subscribers is fine
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CoverEvent> {
        self.tx.subscribe()
    }

    /// Copy of the current history, oldest first
    pub fn history(&self) -> Vec<LoggedEvent> {
        self.history.lock().entries().cloned().collect()
    }

    /// Events only, oldest first
    pub fn recent_events(&self) -> Vec<CoverEvent> {
        self.history.lock().entries().map(|e| e.event.clone()).collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_LOG_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_log_evicts_oldest() {
        let mut log = EventLog::new(3);
        for index in 0..5 {
            log.push(CoverEvent::TickReplaced { index });
        }
        assert_eq!(log.len(), 3);
        let indices: Vec<_> = log
            .entries()
            .map(|e| match e.event {
                CoverEvent::TickReplaced { index } => index,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(indices, vec![2, 3, 4]);
    }

    #[test]
    fn test_event_display() {
        let event = CoverEvent::FallbackTriggered {
            from: SourceMode::Remote,
            to: SourceMode::Local,
        };
        assert_eq!(event.to_string(), "fallback_triggered from=remote to=local");
        assert_eq!(
            CoverEvent::TickSkipped {
                reason: SkipReason::RebuildInProgress
            }
            .to_string(),
            "tick_skipped reason=rebuild in progress"
        );
    }

    #[tokio::test]
    async fn test_bus_broadcasts_and_records() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe();
        bus.emit(CoverEvent::RebuildStarted { dimension: 3 });
        assert_eq!(rx.recv().await.unwrap(), CoverEvent::RebuildStarted { dimension: 3 });
        assert_eq!(bus.recent_events(), vec![CoverEvent::RebuildStarted { dimension: 3 }]);
    }
}
