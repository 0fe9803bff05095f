// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Cancellable interval polling
//!
//! A [`PollingEngine`] runs a [`PollTask`] once when started and then once per
//! interval until it is stopped, either by the caller or by the task's stop
//! predicate. The first scheduled tick fires one full interval after start.
//!
//! Every fetch runs as its own Tokio task and carries a sequence number, so a
//! slow response never blocks the schedule. Results are applied under the
//! snapshot lock: a result older than the last applied one is dropped, and so
//! is anything that completes after the session stopped. Stopping does not
//! abort requests already in flight.

use std::{fmt, sync::Arc, time::Duration};

use tokio::{
    sync::watch,
    time::{Instant, MissedTickBehavior, interval_at},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::{
    error::{PollError, PollResult},
    query::RequestPolicy,
};

/// Shortest interval an engine will schedule
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Work run on every poll
pub trait PollTask: Send + Sync + 'static {
    /// Value produced by one successful run
    type Output: Clone + Send + Sync + 'static;

    /// Session label used in logs
    const NAME: &'static str = "poll";

    /// Run one fetch with the given cache policy
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch fails; the session keeps polling
    fn run(
        &self,
        policy: RequestPolicy,
    ) -> impl Future<Output = PollResult<Self::Output>> + Send;

    /// Whether `output` is final, ending the session
    fn should_stop(&self, _output: &Self::Output) -> bool {
        false
    }

    /// Whether fetches are currently suppressed
    fn is_paused(&self) -> bool {
        false
    }
}

/// Lifecycle of a polling session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Created, not started
    #[default]
    Idle,
    /// Polling
    Active,
    /// Stopped for good
    Stopped,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Active => f.write_str("active"),
            Self::Stopped => f.write_str("stopped"),
        }
    }
}

/// Observable state of a polling session
#[derive(Debug, Clone)]
pub struct PollSnapshot<T> {
    /// Session lifecycle state
    pub state: SessionState,
    /// Whether any fetch is outstanding
    pub is_fetching: bool,
    /// Whether the last applied fetch failed
    pub is_error: bool,
    /// Whether any fetch has succeeded
    pub has_run: bool,
    /// Output of the last successful fetch, kept across failed ones
    pub result: Option<T>,
    /// Error of the last applied fetch, if it failed
    pub error: Option<Arc<PollError>>,
    /// Fetches issued so far, including the initial one
    pub ticks_started: u64,
    issued_seq: u64,
    applied_seq: u64,
    in_flight: usize,
}

impl<T> Default for PollSnapshot<T> {
    fn default() -> Self {
        Self {
            state: SessionState::Idle,
            is_fetching: false,
            is_error: false,
            has_run: false,
            result: None,
            error: None,
            ticks_started: 0,
            issued_seq: 0,
            applied_seq: 0,
            in_flight: 0,
        }
    }
}

impl<T> PollSnapshot<T> {
    /// Whether the session is polling
    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    /// Sequence number of the fetch whose outcome is shown, `0` before any
    pub fn applied_seq(&self) -> u64 {
        self.applied_seq
    }
}

enum Outcome {
    Discarded,
    Stale,
    Failed(String),
    Applied { stop: bool },
}

struct Shared<T: PollTask> {
    task: T,
    snapshot: watch::Sender<PollSnapshot<T::Output>>,
    cancel: CancellationToken,
}

impl<T: PollTask> Shared<T> {
    /// Spawn one fetch unless the task is paused or the session is not active
    fn issue(self: &Arc<Self>, policy: RequestPolicy) {
        if self.task.is_paused() {
            trace!(session = T::NAME, "session paused, skipping fetch");
            return;
        }

        let mut seq = 0;
        let issued = self.snapshot.send_if_modified(|snap| {
            if snap.state != SessionState::Active {
                return false;
            }
            snap.issued_seq += 1;
            seq = snap.issued_seq;
            snap.in_flight += 1;
            snap.is_fetching = true;
            snap.ticks_started += 1;
            true
        });
        if !issued {
            return;
        }

        debug!(session = T::NAME, seq, %policy, "polling");
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = shared.task.run(policy).await;
            shared.apply(seq, outcome);
        });
    }

    fn apply(&self, seq: u64, outcome: PollResult<T::Output>) {
        let mut result = Outcome::Discarded;
        self.snapshot.send_modify(|snap| {
            snap.in_flight = snap.in_flight.saturating_sub(1);
            snap.is_fetching = snap.in_flight > 0;

            if snap.state != SessionState::Active {
                return;
            }
            if seq <= snap.applied_seq {
                result = Outcome::Stale;
                return;
            }
            snap.applied_seq = seq;

            match outcome {
                Ok(output) => {
                    let stop = self.task.should_stop(&output);
                    snap.result = Some(output);
                    snap.has_run = true;
                    snap.is_error = false;
                    snap.error = None;
                    if stop {
                        snap.state = SessionState::Stopped;
                    }
                    result = Outcome::Applied { stop };
                }
                Err(error) => {
                    result = Outcome::Failed(error.to_string());
                    snap.is_error = true;
                    snap.error = Some(Arc::new(error));
                }
            }
        });

        match result {
            Outcome::Discarded => trace!(session = T::NAME, seq, "discarding result after stop"),
            Outcome::Stale => debug!(session = T::NAME, seq, "discarding stale result"),
            Outcome::Failed(error) => warn!(session = T::NAME, seq, error = %error, "poll failed"),
            Outcome::Applied { stop: true } => {
                self.cancel.cancel();
                info!(session = T::NAME, seq, "stop condition reached, session stopped");
            }
            Outcome::Applied { stop: false } => {}
        }
    }
}

/// Interval poller for one [`PollTask`]
///
/// Dropping the engine stops it.
pub struct PollingEngine<T: PollTask> {
    shared: Arc<Shared<T>>,
    interval: Duration,
}

impl<T: PollTask> fmt::Debug for PollingEngine<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollingEngine")
            .field("session", &T::NAME)
            .field("interval", &self.interval)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl<T: PollTask> PollingEngine<T> {
    /// Create an idle engine that runs `task` every `interval`
    pub fn new(task: T, interval: Duration) -> Self {
        let (snapshot, _) = watch::channel(PollSnapshot::default());
        Self {
            shared: Arc::new(Shared {
                task,
                snapshot,
                cancel: CancellationToken::new(),
            }),
            interval: interval.max(MIN_INTERVAL),
        }
    }

    /// Start polling
    ///
    /// Issues the initial fetch with [`RequestPolicy::CacheFirst`], then one
    /// [`RequestPolicy::NetworkOnly`] fetch per interval. Must be called from
    /// within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`PollError::AlreadyStarted`] unless the engine is idle; a
    /// stopped engine cannot be restarted
    pub fn start(&self) -> PollResult<()> {
        let started = self.shared.snapshot.send_if_modified(|snap| {
            if snap.state == SessionState::Idle {
                snap.state = SessionState::Active;
                true
            } else {
                false
            }
        });
        if !started {
            return Err(PollError::AlreadyStarted);
        }

        info!(
            session = T::NAME,
            interval_ms = self.interval.as_millis(),
            "polling session started"
        );
        tokio::spawn(run_loop(Arc::clone(&self.shared), self.interval));
        Ok(())
    }

    /// Stop polling
    ///
    /// No tick fires after this returns. Requests already in flight complete
    /// but their results are discarded. Calling it again has no effect.
    pub fn stop(&self) {
        let stopped = self.shared.snapshot.send_if_modified(|snap| {
            if snap.state == SessionState::Stopped {
                false
            } else {
                snap.state = SessionState::Stopped;
                true
            }
        });
        self.shared.cancel.cancel();

        if stopped {
            info!(session = T::NAME, "polling session stopped");
        }
    }

    /// Current session state
    pub fn snapshot(&self) -> PollSnapshot<T::Output> {
        self.shared.snapshot.borrow().clone()
    }

    /// Receiver notified on every snapshot change
    pub fn subscribe(&self) -> watch::Receiver<PollSnapshot<T::Output>> {
        self.shared.snapshot.subscribe()
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.shared.snapshot.borrow().state
    }

    /// Polled task
    pub fn task(&self) -> &T {
        &self.shared.task
    }

    /// Interval between scheduled fetches
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl<T: PollTask> Drop for PollingEngine<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_loop<T: PollTask>(shared: Arc<Shared<T>>, period: Duration) {
    shared.issue(RequestPolicy::CacheFirst);

    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = shared.cancel.cancelled() => break,
            _ = ticker.tick() => shared.issue(RequestPolicy::NetworkOnly),
        }
    }
    trace!(session = T::NAME, "polling loop exited");
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::{
            Mutex,
            atomic::{AtomicBool, Ordering},
        },
    };

    use tokio::time::sleep;
    use tokio_test::{assert_err, assert_ok};

    use super::*;

    const INTERVAL: Duration = Duration::from_secs(10);
    const EPSILON: Duration = Duration::from_millis(1);

    type Calls = Arc<Mutex<Vec<RequestPolicy>>>;

    /// Task returning scripted `(delay, outcome)` pairs, then `Ok(0)` immediately
    struct ScriptedTask {
        calls: Calls,
        script: Mutex<VecDeque<(Duration, PollResult<u32>)>>,
        stop_at: Option<u32>,
        paused: AtomicBool,
    }

    impl ScriptedTask {
        fn new(script: Vec<(Duration, PollResult<u32>)>) -> (Self, Calls) {
            let calls = Calls::default();
            let task = Self {
                calls: Arc::clone(&calls),
                script: Mutex::new(script.into()),
                stop_at: None,
                paused: AtomicBool::new(false),
            };
            (task, calls)
        }
    }

    impl PollTask for ScriptedTask {
        type Output = u32;

        fn run(&self, policy: RequestPolicy) -> impl Future<Output = PollResult<u32>> + Send {
            self.calls.lock().unwrap().push(policy);
            let (delay, outcome) = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or((Duration::ZERO, Ok(0)));
            async move {
                sleep(delay).await;
                outcome
            }
        }

        fn should_stop(&self, output: &u32) -> bool {
            self.stop_at.is_some_and(|stop_at| *output >= stop_at)
        }

        fn is_paused(&self) -> bool {
            self.paused.load(Ordering::SeqCst)
        }
    }

    fn count(calls: &Calls) -> usize {
        calls.lock().unwrap().len()
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_waits_one_interval() {
        let (task, calls) = ScriptedTask::new(vec![]);
        let engine = PollingEngine::new(task, INTERVAL);
        assert_eq!(engine.state(), SessionState::Idle);

        assert_ok!(engine.start());
        sleep(EPSILON).await;
        assert_eq!(*calls.lock().unwrap(), vec![RequestPolicy::CacheFirst]);

        sleep(INTERVAL - 2 * EPSILON).await;
        assert_eq!(count(&calls), 1);

        sleep(2 * EPSILON).await;
        assert_eq!(
            *calls.lock().unwrap(),
            vec![RequestPolicy::CacheFirst, RequestPolicy::NetworkOnly]
        );

        let snapshot = engine.snapshot();
        assert!(snapshot.is_active());
        assert!(snapshot.has_run);
        assert_eq!(snapshot.result, Some(0));
        assert_eq!(snapshot.ticks_started, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_predicate_ends_ticking() {
        let (mut task, calls) = ScriptedTask::new(vec![
            (Duration::ZERO, Ok(1)),
            (Duration::ZERO, Ok(2)),
            (Duration::ZERO, Ok(3)),
        ]);
        task.stop_at = Some(3);
        let engine = PollingEngine::new(task, INTERVAL);

        engine.start().unwrap();
        sleep(2 * INTERVAL + EPSILON).await;
        assert_eq!(count(&calls), 3);
        assert_eq!(engine.state(), SessionState::Stopped);

        sleep(6 * INTERVAL).await;
        let snapshot = engine.snapshot();
        assert_eq!(count(&calls), 3);
        assert_eq!(snapshot.ticks_started, 3);
        assert_eq!(snapshot.result, Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn late_response_from_earlier_fetch_is_discarded() {
        let (task, _calls) = ScriptedTask::new(vec![
            (Duration::from_secs(15), Ok(1)),
            (Duration::from_secs(1), Ok(2)),
        ]);
        let engine = PollingEngine::new(task, INTERVAL);

        engine.start().unwrap();
        sleep(Duration::from_secs(5)).await;
        let snapshot = engine.snapshot();
        assert!(snapshot.is_fetching);
        assert!(!snapshot.has_run);

        // Second fetch starts at 10s and lands at 11s
        sleep(Duration::from_secs(6) + EPSILON).await;
        assert_eq!(engine.snapshot().result, Some(2));

        // First fetch lands at 15s and must not overwrite the newer result
        sleep(Duration::from_secs(5)).await;
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.result, Some(2));
        assert_eq!(snapshot.applied_seq(), 2);
        assert!(!snapshot.is_fetching);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_fetch_keeps_previous_result() {
        let (task, _calls) = ScriptedTask::new(vec![
            (Duration::ZERO, Ok(7)),
            (
                Duration::ZERO,
                Err(PollError::Timeout { timeout_seconds: 10 }),
            ),
        ]);
        let engine = PollingEngine::new(task, INTERVAL);

        engine.start().unwrap();
        sleep(INTERVAL + EPSILON).await;
        let snapshot = engine.snapshot();
        assert!(snapshot.is_error);
        assert!(snapshot.has_run);
        assert_eq!(snapshot.result, Some(7));
        assert!(matches!(
            snapshot.error.as_deref(),
            Some(PollError::Timeout { .. })
        ));
        assert!(snapshot.is_active());

        // Next tick succeeds again and clears the error
        sleep(INTERVAL).await;
        let snapshot = engine.snapshot();
        assert!(!snapshot.is_error);
        assert!(snapshot.error.is_none());
        assert_eq!(snapshot.result, Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_discards_in_flight_result() {
        let (task, calls) = ScriptedTask::new(vec![(Duration::from_secs(5), Ok(1))]);
        let engine = PollingEngine::new(task, INTERVAL);

        engine.start().unwrap();
        sleep(Duration::from_secs(1)).await;
        engine.stop();
        engine.stop();

        sleep(3 * INTERVAL).await;
        let snapshot = engine.snapshot();
        assert_eq!(count(&calls), 1);
        assert_eq!(snapshot.state, SessionState::Stopped);
        assert!(snapshot.result.is_none());
        assert!(!snapshot.has_run);
        assert!(!snapshot.is_fetching);
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_engine_cannot_restart() {
        let (task, _calls) = ScriptedTask::new(vec![]);
        let engine = PollingEngine::new(task, INTERVAL);

        assert_ok!(engine.start());
        assert!(matches!(engine.start(), Err(PollError::AlreadyStarted)));

        engine.stop();
        assert_err!(engine.start());
        assert_eq!(engine.state(), SessionState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn stopping_idle_engine_prevents_start() {
        let (task, calls) = ScriptedTask::new(vec![]);
        let engine = PollingEngine::new(task, INTERVAL);

        engine.stop();
        assert_err!(engine.start());
        sleep(2 * INTERVAL).await;
        assert_eq!(count(&calls), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn paused_task_issues_nothing() {
        let (task, calls) = ScriptedTask::new(vec![]);
        task.paused.store(true, Ordering::SeqCst);
        let engine = PollingEngine::new(task, INTERVAL);

        engine.start().unwrap();
        sleep(3 * INTERVAL + EPSILON).await;
        assert_eq!(count(&calls), 0);
        assert_eq!(engine.snapshot().ticks_started, 0);

        engine.task().paused.store(false, Ordering::SeqCst);
        sleep(INTERVAL).await;
        assert_eq!(*calls.lock().unwrap(), vec![RequestPolicy::NetworkOnly]);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_engine_stops_polling() {
        let (task, calls) = ScriptedTask::new(vec![]);
        let engine = PollingEngine::new(task, INTERVAL);

        engine.start().unwrap();
        sleep(EPSILON).await;
        drop(engine);

        sleep(5 * INTERVAL).await;
        assert_eq!(count(&calls), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_observe_results() {
        let (task, _calls) = ScriptedTask::new(vec![(Duration::from_secs(2), Ok(42))]);
        let engine = PollingEngine::new(task, INTERVAL);
        let mut updates = engine.subscribe();

        engine.start().unwrap();
        let snapshot = updates
            .wait_for(|snapshot| snapshot.has_run)
            .await
            .unwrap()
            .clone();

        assert_eq!(snapshot.result, Some(42));
        assert_eq!(snapshot.applied_seq(), 1);
    }

    #[test]
    fn zero_interval_is_clamped() {
        let (task, _calls) = ScriptedTask::new(vec![]);
        let engine = PollingEngine::new(task, Duration::ZERO);
        assert_eq!(engine.interval(), MIN_INTERVAL);
    }
}
