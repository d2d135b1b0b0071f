//! Depth cache manager.
//!
//! Keeps one [`PriceLevelBook`] per subscribed symbol in sync with the
//! exchange:
//! 1. Depth events for a new symbol are buffered until a snapshot arrives.
//! 2. The snapshot replaces both sides. Buffered events newer than the
//!    snapshot are replayed, older ones dropped.
//! 3. Later events are applied as they arrive.
//! 4. Every `refresh_interval` the snapshot is fetched again. Events keep
//!    being applied during the fetch and are replayed on top of the new
//!    snapshot.
//!
//! Snapshot fetches happen outside every lock, and at most one fetch per
//! symbol is in flight at a time.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam::channel::Receiver;
use dashmap::DashMap;
use parking_lot::Mutex;

use lob_book::{PriceLevelBook, SequencePolicy};
use lob_core::config::DepthConfig;
use lob_core::types::{Precision, Symbol};

use crate::error::DepthError;
use crate::events::{DepthEvent, DepthSnapshot};

/// Source of full book snapshots, typically an exchange REST endpoint.
pub trait SnapshotSource: Send + Sync {
    fn fetch_snapshot(&self, symbol: &Symbol) -> anyhow::Result<DepthSnapshot>;
}

impl<F> SnapshotSource for F
where
    F: Fn(&Symbol) -> anyhow::Result<DepthSnapshot> + Send + Sync,
{
    fn fetch_snapshot(&self, symbol: &Symbol) -> anyhow::Result<DepthSnapshot> {
        self(symbol)
    }
}

/// Callback invoked with the updated book after every applied event and
/// every successful refresh.
pub type DepthListener = Box<dyn Fn(&Symbol, &PriceLevelBook) + Send + Sync>;

/// What [`DepthCacheManager::on_depth_event`] did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Held until the symbol's first snapshot.
    Buffered,
    /// Applied to the book.
    Applied,
}

/// Summary of a successful [`DepthCacheManager::refresh`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshReport {
    /// Sequence of the applied snapshot.
    pub sequence: u64,
    /// Buffered events applied on top of the snapshot.
    pub replayed: usize,
    /// Buffered events discarded as stale or rejected.
    pub dropped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// No snapshot yet: events are only buffered.
    Buffering,
    /// Synchronized: events are applied.
    Live,
    /// Synchronized and fetching a new snapshot: events are applied and
    /// also buffered for replay.
    Refreshing,
}

struct SyncState {
    phase: Phase,
    pending: VecDeque<DepthEvent>,
    next_refresh: Option<Instant>,
    /// A snapshot fetch is in flight.
    fetching: bool,
}

impl SyncState {
    fn buffer(&mut self, symbol: &Symbol, event: DepthEvent, capacity: usize) {
        if self.pending.len() >= capacity {
            self.pending.pop_front();
            tracing::debug!(symbol = %symbol, capacity, "depth buffer full, dropping oldest event");
        }
        self.pending.push_back(event);
    }

    /// Undo the effects of a refresh that failed.
    fn abort_refresh(&mut self) {
        if self.phase == Phase::Refreshing {
            self.phase = Phase::Live;
            self.pending.clear();
        }
    }
}

struct SymbolDepth {
    book: Arc<PriceLevelBook>,
    sync: Mutex<SyncState>,
}

/// Owns the depth books of every subscribed symbol.
///
/// Thread-safe: symbols live in a `DashMap` and each symbol's sync state
/// has its own mutex. One writer per symbol is the expected deployment; any
/// number of threads may read the books.
pub struct DepthCacheManager {
    config: DepthConfig,
    source: Arc<dyn SnapshotSource>,
    listener: Option<DepthListener>,
    symbols: DashMap<Symbol, Arc<SymbolDepth>>,
    closed: AtomicBool,
}

impl DepthCacheManager {
    pub fn new(config: DepthConfig, source: Arc<dyn SnapshotSource>) -> Self {
        Self {
            config,
            source,
            listener: None,
            symbols: DashMap::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Install the update callback.
    pub fn with_listener<F>(mut self, listener: F) -> Self
    where
        F: Fn(&Symbol, &PriceLevelBook) + Send + Sync + 'static,
    {
        self.listener = Some(Box::new(listener));
        self
    }

    pub fn config(&self) -> &DepthConfig {
        &self.config
    }

    /// Create the book for `symbol`, or return the existing one.
    ///
    /// A new symbol buffers events and fetches its first snapshot when the
    /// next event arrives (or on an explicit [`DepthCacheManager::refresh`]).
    pub fn subscribe(&self, symbol: Symbol, precision: Precision) -> Result<Arc<PriceLevelBook>, DepthError> {
        self.ensure_open()?;
        let policy = if self.config.strict_sequencing {
            SequencePolicy::Strict
        } else {
            SequencePolicy::Permissive
        };

        let entry = self.symbols.entry(symbol.clone()).or_insert_with(|| {
            tracing::info!(symbol = %symbol, ?policy, "subscribed to depth");
            Arc::new(SymbolDepth {
                book: Arc::new(PriceLevelBook::with_policy(precision, policy)),
                sync: Mutex::new(SyncState {
                    phase: Phase::Buffering,
                    pending: VecDeque::new(),
                    next_refresh: Some(Instant::now()),
                    fetching: false,
                }),
            })
        });
        Ok(Arc::clone(&entry.book))
    }

    /// Drop the book for `symbol`. Returns `false` if it was not subscribed.
    pub fn unsubscribe(&self, symbol: &Symbol) -> bool {
        let removed = self.symbols.remove(symbol).is_some();
        if removed {
            tracing::info!(symbol = %symbol, "unsubscribed from depth");
        }
        removed
    }

    /// Drop every book. Later calls fail with [`DepthError::Closed`].
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.symbols.clear();
        tracing::info!("depth cache manager closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn book(&self, symbol: &Symbol) -> Option<Arc<PriceLevelBook>> {
        self.symbols.get(symbol).map(|entry| Arc::clone(&entry.book))
    }

    /// Subscribed symbols, sorted.
    pub fn symbols(&self) -> Vec<Symbol> {
        let mut symbols: Vec<Symbol> = self.symbols.iter().map(|e| e.key().clone()).collect();
        symbols.sort();
        symbols
    }

    /// Whether `symbol` has applied at least one snapshot.
    pub fn is_synced(&self, symbol: &Symbol) -> bool {
        self.symbols
            .get(symbol)
            .map(|entry| entry.sync.lock().phase != Phase::Buffering)
            .unwrap_or(false)
    }

    /// Compact snapshot text of `symbol` at the configured depth.
    pub fn encode(&self, symbol: &Symbol) -> Result<String, DepthError> {
        let depth = self.entry(symbol)?;
        Ok(depth.book.encode(self.config.snapshot_levels))
    }

    /// Make the next event for `symbol` trigger a refresh.
    pub fn request_refresh(&self, symbol: &Symbol) -> Result<(), DepthError> {
        let depth = self.entry(symbol)?;
        depth.sync.lock().next_refresh = Some(Instant::now());
        Ok(())
    }

    /// Handle one incremental depth event.
    pub fn on_depth_event(&self, event: DepthEvent) -> Result<Outcome, DepthError> {
        let depth = self.entry(&event.symbol)?;
        let symbol = event.symbol.clone();
        let capacity = self.config.buffer_capacity;

        let (outcome, due) = {
            let mut sync = depth.sync.lock();
            let due = !sync.fetching && sync.next_refresh.is_some_and(|at| Instant::now() >= at);

            let outcome = match sync.phase {
                Phase::Buffering => {
                    sync.buffer(&symbol, event, capacity);
                    Ok(Outcome::Buffered)
                }
                Phase::Live => depth
                    .book
                    .apply_update(&event.bids, &event.asks, event.sequence)
                    .map(|()| Outcome::Applied),
                Phase::Refreshing => match depth.book.apply_update(&event.bids, &event.asks, event.sequence) {
                    Ok(()) => {
                        sync.buffer(&symbol, event, capacity);
                        Ok(Outcome::Applied)
                    }
                    Err(err) => Err(err),
                },
            };
            (outcome, due)
        };

        if matches!(outcome, Ok(Outcome::Applied)) {
            self.notify(&symbol, &depth.book);
        }
        // Runs even for a rejected event so a stale feed can resync. Failures
        // are logged by `refresh`.
        if due {
            let _ = self.refresh(&symbol);
        }
        outcome.map_err(DepthError::from)
    }

    /// Fetch a fresh snapshot for `symbol` and rebuild its book.
    ///
    /// On failure the book keeps its current state: a symbol that was never
    /// synchronized keeps buffering, a synchronized one keeps applying
    /// events. Another attempt is scheduled after `retry_interval`.
    ///
    /// Fails with [`DepthError::RefreshInProgress`] while another refresh of
    /// `symbol` is fetching; that refresh replays every event received in
    /// the meantime.
    pub fn refresh(&self, symbol: &Symbol) -> Result<RefreshReport, DepthError> {
        let depth = self.entry(symbol)?;
        {
            let mut sync = depth.sync.lock();
            if sync.fetching {
                tracing::debug!(symbol = %symbol, "depth snapshot refresh already in flight");
                return Err(DepthError::RefreshInProgress(symbol.clone()));
            }
            sync.fetching = true;
            if sync.phase == Phase::Live {
                sync.phase = Phase::Refreshing;
                sync.pending.clear();
            }
        }

        let fetched = self.source.fetch_snapshot(symbol);

        let mut sync = depth.sync.lock();
        sync.fetching = false;
        let applied = match fetched {
            Ok(snapshot) => depth
                .book
                .apply_snapshot(&snapshot.bids, &snapshot.asks, snapshot.sequence)
                .map(|()| snapshot.sequence)
                .map_err(DepthError::from),
            Err(source) => Err(DepthError::Snapshot {
                symbol: symbol.clone(),
                source,
            }),
        };
        let sequence = match applied {
            Ok(sequence) => sequence,
            Err(err) => {
                tracing::error!(symbol = %symbol, error = %err, "depth snapshot refresh failed");
                sync.abort_refresh();
                sync.next_refresh = Some(Instant::now() + self.config.retry_interval());
                return Err(err);
            }
        };

        let mut report = RefreshReport {
            sequence,
            replayed: 0,
            dropped: 0,
        };
        for event in std::mem::take(&mut sync.pending) {
            if event.sequence <= sequence {
                report.dropped += 1;
                continue;
            }
            match depth.book.apply_update(&event.bids, &event.asks, event.sequence) {
                Ok(()) => report.replayed += 1,
                Err(err) => {
                    tracing::warn!(
                        symbol = %symbol,
                        sequence = event.sequence,
                        error = %err,
                        "dropping buffered depth event"
                    );
                    report.dropped += 1;
                }
            }
        }
        sync.phase = Phase::Live;
        sync.next_refresh = self.config.refresh_interval().map(|d| Instant::now() + d);
        drop(sync);

        tracing::info!(
            symbol = %symbol,
            sequence,
            replayed = report.replayed,
            dropped = report.dropped,
            "depth snapshot applied"
        );
        self.notify(symbol, &depth.book);
        Ok(report)
    }

    fn notify(&self, symbol: &Symbol, book: &PriceLevelBook) {
        if let Some(listener) = &self.listener {
            listener(symbol, book);
        }
    }

    fn ensure_open(&self) -> Result<(), DepthError> {
        if self.is_closed() {
            return Err(DepthError::Closed);
        }
        Ok(())
    }

    fn entry(&self, symbol: &Symbol) -> Result<Arc<SymbolDepth>, DepthError> {
        self.ensure_open()?;
        self.symbols
            .get(symbol)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| DepthError::UnknownSymbol(symbol.clone()))
    }
}

/// Run the single writer thread: drain `events` into `manager` until the
/// channel disconnects or the manager is closed.
pub fn spawn_writer(manager: Arc<DepthCacheManager>, events: Receiver<DepthEvent>) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("depth-writer".into())
        .spawn(move || {
            tracing::info!("depth writer started");
            for event in events.iter() {
                match manager.on_depth_event(event) {
                    Ok(_) => {}
                    Err(DepthError::Closed) => break,
                    Err(err) => tracing::warn!(error = %err, "depth event rejected"),
                }
            }
            tracing::info!("depth writer stopped");
        })
}
