//! Dashboard Sync Controller
//!
//! Loads the teacher dashboard and keeps its feedback analytics fresh.
//!
//! # State Machine
//!
//! ```text
//!            mount()
//!               │
//!               ▼
//!          ┌─────────┐  resources or progress failed  ┌───────────┐
//!          │ Loading │ ─────────────────────────────► │ Error(..) │
//!          └─────────┘                                └───────────┘
//!               │ both succeeded                  retry() │
//!               ▼                                         │
//!          ┌─────────┐ ◄──────────── (back to Loading) ───┘
//!          │  Ready  │
//!          └─────────┘
//!             ▲   │ analytics refresh (poll tick or bus signal)
//!             └───┘
//! ```
//!
//! While `Ready`, a background task owns the poll timer and a refresh signal
//! fed by a bus subscription. Each tick causes one analytics fetch. Bus
//! signals coalesce: any number of `FeedbackSubmitted` events that arrive
//! before the task gets to them, or while a fetch is in flight, cause exactly
//! one further fetch. The snapshot is replaced on success and left alone on
//! failure.
//!
//! `unmount()` (or dropping the controller) aborts the task and releases the
//! subscription. Every state write is tagged with the mount epoch, so a fetch
//! that completes after unmount or remount changes nothing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::model::{FeedbackAnalytics, ProgressRecord, Resource};
use crate::bus::{BusEvent, Listener, NotificationBus, Subscription};
use crate::config::{DashboardConfig, MAX_POLL_INTERVAL};
use crate::service::ClassroomService;

/// Where the dashboard is in its load cycle
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum DashboardPhase {
    /// Initial load in progress
    #[default]
    Loading,
    /// Resources and progress are available
    Ready,
    /// Resources or progress could not be loaded
    Error(String),
}

impl DashboardPhase {
    /// Whether the dashboard is ready
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

/// Everything a dashboard surface renders
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DashboardSnapshot {
    /// Load state
    pub phase: DashboardPhase,
    /// Lesson resources
    pub resources: Vec<Resource>,
    /// Class progress
    pub progress: Vec<ProgressRecord>,
    /// Latest analytics, `None` until one fetch succeeds
    pub analytics: Option<FeedbackAnalytics>,
    /// When `analytics` was last replaced
    pub last_refreshed: Option<DateTime<Utc>>,
}

/// What started an analytics refresh
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RefreshTrigger {
    Poll,
    Bus,
    Manual,
}

impl std::fmt::Display for RefreshTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Poll => write!(f, "poll"),
            Self::Bus => write!(f, "bus"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

struct Shared<S> {
    service: Arc<S>,
    state: RwLock<DashboardSnapshot>,
    epoch: AtomicU64,
    updates: watch::Sender<u64>,
}

impl<S: ClassroomService> Shared<S> {
    fn is_current(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) == epoch
    }

    fn notify(&self) {
        self.updates.send_modify(|n| *n += 1);
    }

    /// Apply `f` to the state if `epoch` is still the live mount
    fn update(&self, epoch: u64, f: impl FnOnce(&mut DashboardSnapshot)) -> bool {
        {
            let mut state = self.state.write();
            if !self.is_current(epoch) {
                return false;
            }
            f(&mut state);
        }
        self.notify();
        true
    }

    async fn load(&self, epoch: u64) -> bool {
        self.update(epoch, |state| state.phase = DashboardPhase::Loading);

        let (resources, progress, analytics) = futures::join!(
            self.service.resources(),
            self.service.progress(),
            self.service.feedback_analytics(),
        );

        let analytics = match analytics {
            Ok(analytics) => Some(analytics),
            Err(e) => {
                tracing::warn!(error = %e, "Feedback analytics unavailable");
                None
            }
        };

        let mut ready = false;
        let applied = self.update(epoch, |state| match (resources, progress) {
            (Ok(resources), Ok(progress)) => {
                tracing::info!(
                    resources = resources.len(),
                    students = progress.len(),
                    analytics = analytics.is_some(),
                    "Dashboard loaded"
                );
                state.resources = resources;
                state.progress = progress;
                if let Some(analytics) = analytics {
                    state.analytics = Some(analytics);
                    state.last_refreshed = Some(Utc::now());
                }
                state.phase = DashboardPhase::Ready;
                ready = true;
            }
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(error = %e, "Dashboard load failed");
                state.phase = DashboardPhase::Error(e.to_string());
            }
        });
        applied && ready
    }

    async fn refresh_analytics(&self, epoch: u64, trigger: RefreshTrigger) -> bool {
        match self.service.feedback_analytics().await {
            Ok(analytics) => {
                let applied = self.update(epoch, |state| {
                    state.analytics = Some(analytics);
                    state.last_refreshed = Some(Utc::now());
                });
                tracing::debug!(%trigger, applied, "Feedback analytics refreshed");
                applied
            }
            Err(e) => {
                tracing::warn!(%trigger, error = %e, "Feedback analytics refresh failed");
                false
            }
        }
    }
}

struct SyncTask {
    handle: JoinHandle<()>,
    subscription: Subscription,
}

impl SyncTask {
    fn stop(self) {
        self.handle.abort();
        self.subscription.unsubscribe();
    }
}

/// Teacher dashboard controller
pub struct DashboardSync<S: ClassroomService> {
    shared: Arc<Shared<S>>,
    bus: Arc<dyn NotificationBus>,
    poll_interval: Duration,
    task: Mutex<Option<SyncTask>>,
}

impl<S: ClassroomService + 'static> DashboardSync<S> {
    /// Create an unmounted controller
    pub fn new(service: Arc<S>, bus: Arc<dyn NotificationBus>, config: &DashboardConfig) -> Self {
        let (updates, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                service,
                state: RwLock::new(DashboardSnapshot::default()),
                epoch: AtomicU64::new(0),
                updates,
            }),
            bus,
            poll_interval: config.poll_interval.min(MAX_POLL_INTERVAL),
            task: Mutex::new(None),
        }
    }

    /// Load everything and, once `Ready`, start keeping analytics fresh
    ///
    /// Returns whether the dashboard reached `Ready`. Mounting again restarts
    /// the whole cycle.
    pub async fn mount(&self) -> bool {
        self.stop_sync();
        let epoch = self.shared.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(epoch, "Dashboard mounting");

        let ready = self.shared.load(epoch).await;
        if ready && self.shared.is_current(epoch) {
            self.start_sync(epoch);
        }
        ready
    }

    /// Re-run the whole load after an error
    ///
    /// Does nothing (and returns `false`) unless the dashboard is in `Error`.
    pub async fn retry(&self) -> bool {
        if !matches!(self.phase(), DashboardPhase::Error(_)) {
            return false;
        }
        tracing::info!("Retrying dashboard load");
        self.mount().await
    }

    /// Fetch analytics now
    ///
    /// Only acts while `Ready`; returns whether the snapshot was replaced.
    pub async fn refresh_analytics(&self) -> bool {
        if !self.phase().is_ready() {
            return false;
        }
        let epoch = self.shared.epoch.load(Ordering::SeqCst);
        self.shared
            .refresh_analytics(epoch, RefreshTrigger::Manual)
            .await
    }

    /// Stop refreshing; later completions are ignored
    pub fn unmount(&self) {
        self.shared.epoch.fetch_add(1, Ordering::SeqCst);
        self.stop_sync();
        tracing::debug!("Dashboard unmounted");
    }

    /// Current load state
    #[must_use]
    pub fn phase(&self) -> DashboardPhase {
        self.shared.state.read().phase.clone()
    }

    /// Copy of everything the dashboard shows
    #[must_use]
    pub fn snapshot(&self) -> DashboardSnapshot {
        self.shared.state.read().clone()
    }

    /// Latest analytics, if any fetch has succeeded
    #[must_use]
    pub fn analytics(&self) -> Option<FeedbackAnalytics> {
        self.shared.state.read().analytics.clone()
    }

    /// Receiver that changes whenever the snapshot changes
    #[must_use]
    pub fn updates(&self) -> watch::Receiver<u64> {
        self.shared.updates.subscribe()
    }

    /// Whether the background refresh task is running
    #[must_use]
    pub fn is_syncing(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }

    fn start_sync(&self, epoch: u64) {
        let signal = Arc::new(Notify::new());
        let listener: Listener = {
            let signal = Arc::clone(&signal);
            // notify_one keeps at most one pending permit
            Arc::new(move || signal.notify_one())
        };
        let subscription = self.bus.subscribe(BusEvent::FeedbackSubmitted, listener);

        let shared = Arc::clone(&self.shared);
        let period = self.poll_interval;
        let handle = tokio::spawn(async move {
            let mut poll = interval_at(Instant::now() + period, period);
            poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                let trigger = tokio::select! {
                    _ = poll.tick() => RefreshTrigger::Poll,
                    () = signal.notified() => RefreshTrigger::Bus,
                };
                if !shared.is_current(epoch) {
                    break;
                }
                shared.refresh_analytics(epoch, trigger).await;
            }
            tracing::debug!(epoch, "Dashboard sync task stopped");
        });

        tracing::debug!(epoch, poll_secs = period.as_secs(), "Dashboard sync started");
        if let Some(previous) = self.task.lock().replace(SyncTask {
            handle,
            subscription,
        }) {
            previous.stop();
        }
    }

    fn stop_sync(&self) {
        if let Some(task) = self.task.lock().take() {
            task.stop();
        }
    }
}

impl<S: ClassroomService> Drop for DashboardSync<S> {
    fn drop(&mut self) {
        self.shared.epoch.fetch_add(1, Ordering::SeqCst);
        if let Some(task) = self.task.get_mut().take() {
            task.stop();
        }
    }
}

impl<S: ClassroomService> std::fmt::Debug for DashboardSync<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardSync")
            .field("phase", &self.shared.state.read().phase)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}
