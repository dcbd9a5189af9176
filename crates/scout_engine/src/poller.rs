use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use scout_core::{update, Generation, PollEffect, PollMsg, PollState, TaskRecord};
use scout_logging::{scout_debug, scout_info, scout_warn, set_poll_cycle};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{CredentialStore, FailureKind, FetchError, ListingExtractor, PageSource};

/// Period of the recurring listing poll.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Shortest accepted period; tokio intervals reject a zero period.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollEvent {
    CycleCompleted {
        cycle: u64,
        records: Vec<TaskRecord>,
    },
    CycleFailed {
        cycle: u64,
        error: FetchError,
    },
    /// The timer of `generation` stopped itself after a session failure.
    Suspended {
        generation: Generation,
        reason: FailureKind,
    },
}

pub trait CycleSink: Send + Sync {
    fn emit(&self, event: PollEvent);
}

pub struct ChannelCycleSink {
    tx: std::sync::mpsc::Sender<PollEvent>,
}

impl ChannelCycleSink {
    pub fn new(tx: std::sync::mpsc::Sender<PollEvent>) -> Self {
        Self { tx }
    }
}

impl CycleSink for ChannelCycleSink {
    fn emit(&self, event: PollEvent) {
        let _ = self.tx.send(event);
    }
}

/// Sink for callers that only want the log output.
#[derive(Debug, Default)]
pub struct DiscardSink;

impl CycleSink for DiscardSink {
    fn emit(&self, _event: PollEvent) {}
}

/// Result of a start or stop request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    Started,
    AlreadyRunning,
    Stopped,
    NotRunning,
}

impl fmt::Display for PollStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollStatus::Started => write!(f, "Polling started"),
            PollStatus::AlreadyRunning => write!(f, "Polling is already running"),
            PollStatus::Stopped => write!(f, "Polling stopped"),
            PollStatus::NotRunning => write!(f, "No polling is currently running"),
        }
    }
}

/// Recurring listing poll. At most one timer task is alive at a time.
///
/// Stopping cancels future ticks only; a cycle already fetching runs to
/// completion. Timer tasks are spawned on the ambient tokio runtime, so
/// [`Poller::start`] must be called from within one.
#[derive(Clone)]
pub struct Poller {
    inner: Arc<PollerInner>,
}

struct PollerInner {
    source: Arc<dyn PageSource>,
    credentials: Arc<CredentialStore>,
    listing: ListingExtractor,
    listing_url: String,
    period: Duration,
    sink: Arc<dyn CycleSink>,
    lifecycle: Mutex<Lifecycle>,
    cycles: AtomicU64,
}

#[derive(Default)]
struct Lifecycle {
    state: PollState,
    timer: Option<(Generation, CancellationToken)>,
}

impl Poller {
    pub fn new(
        source: Arc<dyn PageSource>,
        credentials: Arc<CredentialStore>,
        listing: ListingExtractor,
        listing_url: impl Into<String>,
        period: Duration,
        sink: Arc<dyn CycleSink>,
    ) -> Self {
        Self {
            inner: Arc::new(PollerInner {
                source,
                credentials,
                listing,
                listing_url: listing_url.into(),
                period: period.max(MIN_POLL_INTERVAL),
                sink,
                lifecycle: Mutex::new(Lifecycle::default()),
                cycles: AtomicU64::new(0),
            }),
        }
    }

    pub fn start(&self) -> PollStatus {
        if self.inner.apply(PollMsg::StartRequested).is_empty() {
            scout_warn!("Polling is already running.");
            PollStatus::AlreadyRunning
        } else {
            scout_info!("Polling started, every {:?}", self.inner.period);
            PollStatus::Started
        }
    }

    pub fn stop(&self) -> PollStatus {
        if self.inner.apply(PollMsg::StopRequested).is_empty() {
            scout_warn!("No polling is currently running.");
            PollStatus::NotRunning
        } else {
            scout_info!("Polling stopped");
            PollStatus::Stopped
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.lock().state.is_running()
    }

    /// Stops the timer after a session failure seen outside the timer, such as
    /// an on-demand form fetch.
    pub fn suspend_after(&self, error: &FetchError) {
        if !error.kind.suspends_polling() {
            return;
        }
        if let Some(PollEffect::CancelTimer { generation }) =
            self.inner.apply(PollMsg::OnDemandFailed).into_iter().next()
        {
            scout_warn!("Polling suspended: {}", error.kind);
            self.inner.sink.emit(PollEvent::Suspended {
                generation,
                reason: error.kind.clone(),
            });
        }
    }

    /// Runs one fetch-and-extract cycle immediately, outside the timer.
    pub async fn poll_once(&self) -> Result<Vec<TaskRecord>, FetchError> {
        let cycle = self.inner.next_cycle();
        self.inner.run_cycle(cycle).await
    }
}

impl PollerInner {
    fn lock(&self) -> std::sync::MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply(self: &Arc<Self>, msg: PollMsg) -> Vec<PollEffect> {
        let mut lifecycle = self.lock();
        let (state, effects) = update(std::mem::take(&mut lifecycle.state), msg);
        lifecycle.state = state;

        for effect in &effects {
            match *effect {
                PollEffect::SpawnTimer { generation } => {
                    let token = CancellationToken::new();
                    lifecycle.timer = Some((generation, token.clone()));
                    tokio::spawn(run_timer(self.clone(), generation, token));
                }
                PollEffect::CancelTimer { generation } => {
                    if let Some((active, token)) = lifecycle.timer.take() {
                        debug_assert_eq!(active, generation);
                        token.cancel();
                    }
                }
            }
        }
        effects
    }

    fn next_cycle(&self) -> u64 {
        self.cycles.fetch_add(1, Ordering::Relaxed) + 1
    }

    async fn run_cycle(&self, cycle: u64) -> Result<Vec<TaskRecord>, FetchError> {
        let headers = self.credentials.get();
        let page = self.source.get(&self.listing_url, &headers).await?;

        set_poll_cycle(cycle);
        let records = self.listing.extract(&page.html, &page.url);
        scout_info!("cycle={} parsed {} task records", cycle, records.len());
        if log::log_enabled!(log::Level::Debug) {
            if let Ok(json) = serde_json::to_string_pretty(&records) {
                scout_debug!("{}", json);
            }
        }
        Ok(records)
    }
}

async fn run_timer(inner: Arc<PollerInner>, generation: Generation, token: CancellationToken) {
    // First tick one period after start, like a minute-aligned cron entry.
    let mut ticker = interval_at(Instant::now() + inner.period, inner.period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let cycle = inner.next_cycle();
        match inner.run_cycle(cycle).await {
            Ok(records) => inner
                .sink
                .emit(PollEvent::CycleCompleted { cycle, records }),
            Err(error) => {
                let reason = error.kind.clone();
                inner.sink.emit(PollEvent::CycleFailed { cycle, error });
                if reason.suspends_polling() {
                    if !inner.apply(PollMsg::SessionFailed { generation }).is_empty() {
                        scout_warn!("Polling suspended: {}", reason);
                        inner.sink.emit(PollEvent::Suspended { generation, reason });
                    }
                    break;
                }
            }
        }
    }
    scout_debug!("timer generation={} exited", generation);
}
