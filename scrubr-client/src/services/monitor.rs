//! Scan progress monitor
//!
//! Given a job id, keeps a live [`MonitorView`] of the job's progress.
//!
//! **Protocol:**
//! 1. Open a push subscription to the job's channel and start a 3 s connect timer
//! 2. Channel opens first: cancel the timer, mark live, apply pushed snapshots
//! 3. Timer fires first, or the channel errors/closes before a terminal
//!    snapshot: drop the subscription and poll job status once per second
//! 4. Stop everything once a terminal snapshot has been applied
//!
//! All snapshot updates, pushed or polled, go through [`MonitorState::apply`],
//! which refuses to change anything once a terminal snapshot is held. Each
//! activation gets a generation number; a worker whose generation is no longer
//! current cannot touch the view, so nothing mutates state after
//! [`ScanProgressMonitor::deactivate`] returns.
//!
//! The monitor, not the worker task, owns the subscription. The worker only
//! borrows it through a shared slot while polling, so deactivating drops the
//! subscription (closing the connection) before `deactivate` returns.

use futures::StreamExt;
use scrubr_common::api::{JobId, JobProgressSnapshot};
use std::future::poll_fn;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::Poll;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{ChannelEvent, ProgressChannel, SanitizerApi, Subscription};

/// Time allowed for the push channel to open
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Status poll period once the push channel is abandoned
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Consecutive failed polls before the view reports stale data
pub const DEFAULT_POLL_FAILURE_THRESHOLD: u32 = 5;

/// Shown while polling keeps failing
pub const STALE_PROGRESS_NOTICE: &str =
    "Progress updates are temporarily unavailable; showing the last known state.";

/// Observable monitor output
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonitorView {
    /// Latest snapshot; `None` until the first update arrives
    pub snapshot: Option<JobProgressSnapshot>,
    /// Progress currently arriving over the push channel
    pub is_live: bool,
    pub error: Option<String>,
}

impl MonitorView {
    pub fn is_terminal(&self) -> bool {
        self.snapshot.as_ref().is_some_and(|s| s.is_terminal())
    }
}

/// Result of offering a snapshot to the monitor state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Snapshot replaced the previous one
    Applied,
    /// Snapshot applied and is terminal
    Terminal,
    /// A terminal snapshot was already held; nothing changed
    IgnoredAfterTerminal,
}

/// Monitor state guarded by the shared lock
#[derive(Debug, Default)]
pub struct MonitorState {
    generation: u64,
    view: MonitorView,
}

impl MonitorState {
    /// The single snapshot transition
    ///
    /// Any snapshot is accepted (counts may go backwards, the backend is
    /// authoritative) until a terminal one is held.
    pub fn apply(&mut self, snapshot: JobProgressSnapshot) -> ApplyOutcome {
        if self.view.is_terminal() {
            return ApplyOutcome::IgnoredAfterTerminal;
        }

        let terminal = snapshot.is_terminal();
        self.view.snapshot = Some(snapshot);

        if terminal {
            self.view.is_live = false;
            ApplyOutcome::Terminal
        } else {
            ApplyOutcome::Applied
        }
    }

    pub fn view(&self) -> &MonitorView {
        &self.view
    }
}

struct Shared {
    state: Mutex<MonitorState>,
    tx: watch::Sender<MonitorView>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, MonitorState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Mutate state on behalf of `generation`; `None` if it is no longer current
    fn update<R>(&self, generation: u64, f: impl FnOnce(&mut MonitorState) -> R) -> Option<R> {
        let mut state = self.lock();
        if state.generation != generation {
            return None;
        }
        let result = f(&mut state);
        self.tx.send_replace(state.view.clone());
        Some(result)
    }

    /// Start a new generation; returns its number
    fn advance(&self, reset_view: bool) -> u64 {
        let mut state = self.lock();
        state.generation += 1;
        if reset_view {
            state.view = MonitorView::default();
        } else {
            state.view.is_live = false;
        }
        self.tx.send_replace(state.view.clone());
        state.generation
    }
}

/// Push subscription shared between the monitor and its worker
///
/// `None` once the subscription has been closed by either side.
#[derive(Clone)]
struct SubscriptionSlot(Arc<Mutex<Option<Subscription>>>);

/// What the slot yielded
enum Incoming {
    Event(ChannelEvent),
    /// Stream ended on the remote side
    Ended,
    /// Subscription was closed locally
    Closed,
}

impl SubscriptionSlot {
    fn new(subscription: Subscription) -> Self {
        Self(Arc::new(Mutex::new(Some(subscription))))
    }

    fn lock(&self) -> MutexGuard<'_, Option<Subscription>> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Drop the subscription in place; returns whether one was still open
    fn close(&self) -> bool {
        let subscription = self.lock().take();
        subscription.is_some()
    }

    fn is_open(&self) -> bool {
        self.lock().is_some()
    }

    /// Next event; the lock is held only for the duration of each poll
    async fn next(&self) -> Incoming {
        poll_fn(|cx| {
            let mut slot = self.lock();
            let Some(subscription) = slot.as_mut() else {
                return Poll::Ready(Incoming::Closed);
            };
            match subscription.poll_next_unpin(cx) {
                Poll::Ready(Some(event)) => Poll::Ready(Incoming::Event(event)),
                Poll::Ready(None) => Poll::Ready(Incoming::Ended),
                Poll::Pending => Poll::Pending,
            }
        })
        .await
    }
}

struct ActiveWatch {
    job_id: JobId,
    subscription: SubscriptionSlot,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Live progress monitor for one job at a time
pub struct ScanProgressMonitor {
    api: Arc<dyn SanitizerApi>,
    channel: Arc<dyn ProgressChannel>,
    poll_failure_threshold: u32,
    shared: Arc<Shared>,
    active: Option<ActiveWatch>,
}

impl ScanProgressMonitor {
    pub fn new(api: Arc<dyn SanitizerApi>, channel: Arc<dyn ProgressChannel>) -> Self {
        let (tx, _) = watch::channel(MonitorView::default());
        Self {
            api,
            channel,
            poll_failure_threshold: DEFAULT_POLL_FAILURE_THRESHOLD,
            shared: Arc::new(Shared {
                state: Mutex::new(MonitorState::default()),
                tx,
            }),
            active: None,
        }
    }

    pub fn with_poll_failure_threshold(mut self, threshold: u32) -> Self {
        self.poll_failure_threshold = threshold.max(1);
        self
    }

    /// Watch `job_id`, or stop watching with `None`
    ///
    /// Any previous subscription is closed before the new one opens.
    /// Must be called from within a tokio runtime.
    pub fn activate(&mut self, job_id: Option<JobId>) {
        self.deactivate();

        let Some(job_id) = job_id else {
            return;
        };

        let generation = self.shared.advance(true);
        let cancel = CancellationToken::new();
        let subscription = SubscriptionSlot::new(self.channel.subscribe(&job_id));

        let worker = Worker {
            api: Arc::clone(&self.api),
            subscription: subscription.clone(),
            shared: Arc::clone(&self.shared),
            generation,
            job_id: job_id.clone(),
            cancel: cancel.clone(),
            poll_failure_threshold: self.poll_failure_threshold,
            started: Instant::now(),
        };

        info!(job_id = %job_id, "Monitoring job progress");
        let handle = tokio::spawn(worker.run());

        self.active = Some(ActiveWatch {
            job_id,
            subscription,
            cancel,
            handle,
        });
    }

    /// Stop watching: closes the subscription and clears any timer or poll
    ///
    /// The subscription is dropped before this returns. The last snapshot
    /// stays readable; `is_live` drops to false.
    pub fn deactivate(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };

        self.shared.advance(false);
        let was_open = active.subscription.close();
        active.cancel.cancel();
        active.handle.abort();
        debug!(job_id = %active.job_id, closed_subscription = was_open, "Stopped monitoring job");
    }

    /// Whether the current watch still holds its push subscription
    pub fn is_subscribed(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|a| a.subscription.is_open())
    }

    pub fn job_id(&self) -> Option<&JobId> {
        self.active.as_ref().map(|a| &a.job_id)
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Current view
    pub fn view(&self) -> MonitorView {
        self.shared.lock().view.clone()
    }

    /// Receiver notified on every view change
    pub fn subscribe(&self) -> watch::Receiver<MonitorView> {
        self.shared.tx.subscribe()
    }
}

impl Drop for ScanProgressMonitor {
    fn drop(&mut self) {
        self.deactivate();
    }
}

/// How the push phase ended
enum PushEnd {
    /// Terminal snapshot held; nothing more to do
    Terminal,
    /// Deactivated or superseded
    Cancelled,
    /// Switch to polling
    Fallback(String),
}

struct Worker {
    api: Arc<dyn SanitizerApi>,
    subscription: SubscriptionSlot,
    shared: Arc<Shared>,
    generation: u64,
    job_id: JobId,
    cancel: CancellationToken,
    poll_failure_threshold: u32,
    started: Instant,
}

impl Worker {
    async fn run(self) {
        let end = self.stream_push().await;
        self.subscription.close();

        match end {
            PushEnd::Terminal | PushEnd::Cancelled => {}
            PushEnd::Fallback(reason) => {
                info!(job_id = %self.job_id, reason = %reason, "Falling back to status polling");
                if self
                    .shared
                    .update(self.generation, |s| s.view.is_live = false)
                    .is_some()
                {
                    self.poll().await;
                }
            }
        }
    }

    /// Push phase; the caller closes the subscription on return
    async fn stream_push(&self) -> PushEnd {
        let connect_deadline = tokio::time::sleep(CONNECT_TIMEOUT);
        tokio::pin!(connect_deadline);
        let mut open = false;

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => return PushEnd::Cancelled,

                _ = &mut connect_deadline, if !open => {
                    warn!(job_id = %self.job_id, timeout = ?CONNECT_TIMEOUT, "Progress channel did not open in time");
                    return PushEnd::Fallback("connect timeout".to_string());
                }

                event = self.subscription.next() => match event {
                    Incoming::Closed => return PushEnd::Cancelled,
                    Incoming::Event(ChannelEvent::Opened) => {
                        open = true;
                        if self.mark_live().is_none() {
                            return PushEnd::Cancelled;
                        }
                        debug!(job_id = %self.job_id, "Progress channel open");
                    }
                    Incoming::Event(ChannelEvent::Message(text)) => {
                        if !open {
                            open = true;
                            if self.mark_live().is_none() {
                                return PushEnd::Cancelled;
                            }
                        }

                        let snapshot = match serde_json::from_str::<JobProgressSnapshot>(&text) {
                            Ok(snapshot) => snapshot,
                            Err(e) => {
                                debug!(job_id = %self.job_id, error = %e, "Dropping malformed progress message");
                                continue;
                            }
                        };

                        if snapshot.job_id != self.job_id {
                            debug!(job_id = %self.job_id, other = %snapshot.job_id, "Dropping message for another job");
                            continue;
                        }

                        match self.shared.update(self.generation, |s| s.apply(snapshot)) {
                            None => return PushEnd::Cancelled,
                            Some(ApplyOutcome::Applied) => {}
                            Some(ApplyOutcome::Terminal) | Some(ApplyOutcome::IgnoredAfterTerminal) => {
                                debug!(job_id = %self.job_id, "Terminal snapshot received, closing channel");
                                return PushEnd::Terminal;
                            }
                        }
                    }
                    Incoming::Event(ChannelEvent::Error(e)) => {
                        if self.is_terminal() {
                            return PushEnd::Terminal;
                        }
                        warn!(job_id = %self.job_id, error = %e, "Progress channel error");
                        return PushEnd::Fallback(e);
                    }
                    Incoming::Ended => {
                        if self.is_terminal() {
                            return PushEnd::Terminal;
                        }
                        return PushEnd::Fallback("channel closed".to_string());
                    }
                }
            }
        }
    }

    /// Poll phase; runs until terminal or cancelled
    ///
    /// Failures are retried indefinitely. After `poll_failure_threshold`
    /// consecutive failures the view carries a stale-data notice until the
    /// next successful poll.
    async fn poll(&self) {
        let mut interval = tokio::time::interval(POLL_INTERVAL);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut consecutive_failures: u32 = 0;

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return,
                _ = interval.tick() => {}
            }

            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return,
                result = self.api.job_status(&self.job_id) => result,
            };

            match result {
                Ok(status) => {
                    consecutive_failures = 0;
                    let snapshot = status.into_snapshot(self.started.elapsed().as_secs_f64());

                    let outcome = self.shared.update(self.generation, |s| {
                        s.view.error = None;
                        s.apply(snapshot)
                    });

                    match outcome {
                        None => return,
                        Some(ApplyOutcome::Applied) => {}
                        Some(ApplyOutcome::Terminal) | Some(ApplyOutcome::IgnoredAfterTerminal) => {
                            debug!(job_id = %self.job_id, "Terminal status polled, polling stopped");
                            return;
                        }
                    }
                }
                Err(e) => {
                    consecutive_failures = consecutive_failures.saturating_add(1);
                    debug!(
                        job_id = %self.job_id,
                        failures = consecutive_failures,
                        error = %e,
                        "Status poll failed"
                    );

                    if consecutive_failures == self.poll_failure_threshold {
                        warn!(job_id = %self.job_id, failures = consecutive_failures, "Status polling keeps failing");
                    }
                    if consecutive_failures >= self.poll_failure_threshold {
                        let updated = self.shared.update(self.generation, |s| {
                            s.view.error = Some(STALE_PROGRESS_NOTICE.to_string());
                        });
                        if updated.is_none() {
                            return;
                        }
                    }
                }
            }
        }
    }

    fn mark_live(&self) -> Option<()> {
        self.shared.update(self.generation, |s| s.view.is_live = true)
    }

    fn is_terminal(&self) -> bool {
        self.shared.lock().view.is_terminal()
    }
}
