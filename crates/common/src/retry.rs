//! Retrying mutation driver.
//!
//! Remote writes are delivered at-least-once: a [`Mutation`] is invoked until
//! its outcome reports `write_ok`, the [`RetryBudget`] runs out, or the
//! caller cancels. Every attempt receives an [`Attempt`] record by value. The
//! first carries the caller's initial state, later ones carry the complete
//! outcome of the attempt before them, so a mutation can pick up whatever
//! the previous round learned (a freshly created id, a newer concurrency
//! token, ...).
//!
//! The driver never sleeps between attempts and never runs two attempts at
//! once. Backoff, if wanted, belongs inside the mutation. Idempotency of a
//! repeated attempt is the mutation's responsibility too.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Outcome of a single write attempt.
pub trait WriteOutcome {
    /// Whether the remote side accepted the write.
    fn write_ok(&self) -> bool;
}

/// How many retries a run may spend after its first attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryBudget {
    /// At most `n` retries, so at most `n + 1` invocations.
    Limited(u32),
    /// Retry until success or cancellation.
    Unbounded,
}

impl RetryBudget {
    /// Whether the attempt numbered `attempt` (0 is the first) may run.
    pub fn allows(&self, attempt: u32) -> bool {
        match self {
            RetryBudget::Limited(max) => attempt <= *max,
            RetryBudget::Unbounded => true,
        }
    }
}

impl Default for RetryBudget {
    fn default() -> Self {
        RetryBudget::Limited(DEFAULT_MAX_RETRIES)
    }
}

impl From<Option<u32>> for RetryBudget {
    fn from(max: Option<u32>) -> Self {
        max.map(RetryBudget::Limited).unwrap_or(RetryBudget::Unbounded)
    }
}

/// What an attempt starts from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptInput<S, R> {
    /// The caller's initial state (attempt 0 only).
    Initial(S),
    /// The whole outcome of the previous attempt.
    Retry(R),
}

impl<S, R> AttemptInput<S, R> {
    /// Collapse both shapes into the state a mutation actually works on.
    ///
    /// This is where a mutation plugs in its narrowing policy, e.g. keeping
    /// only the handle a previous outcome produced.
    pub fn narrow<T>(
        self,
        from_initial: impl FnOnce(S) -> T,
        from_previous: impl FnOnce(R) -> T,
    ) -> T {
        match self {
            AttemptInput::Initial(state) => from_initial(state),
            AttemptInput::Retry(previous) => from_previous(previous),
        }
    }

    pub fn previous(&self) -> Option<&R> {
        match self {
            AttemptInput::Initial(_) => None,
            AttemptInput::Retry(previous) => Some(previous),
        }
    }
}

/// Immutable record handed to each invocation of a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt<S, R> {
    /// Zero-based attempt counter.
    pub number: u32,
    pub input: AttemptInput<S, R>,
}

impl<S, R> Attempt<S, R> {
    fn first(state: S) -> Self {
        Self {
            number: 0,
            input: AttemptInput::Initial(state),
        }
    }

    fn after(number: u32, previous: R) -> Self {
        Self {
            number,
            input: AttemptInput::Retry(previous),
        }
    }

    pub fn is_first(&self) -> bool {
        self.number == 0
    }
}

/// A remote write that can be attempted repeatedly over a session.
#[async_trait]
pub trait Mutation<Session: Sync + ?Sized>: Send + Sync {
    type State: Send;
    type Outcome: WriteOutcome + Send;
    type Error: Send;

    /// Perform one attempt. An `Err` aborts the run without further retries.
    async fn attempt(
        &self,
        attempt: Attempt<Self::State, Self::Outcome>,
        session: &Session,
    ) -> Result<Self::Outcome, Self::Error>;
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stop {
    Succeeded,
    /// The budget ran out while the outcome still reported `write_ok == false`.
    Exhausted,
    /// The cancel signal fired between attempts.
    Cancelled,
}

/// Result of a completed run: the last outcome and how we got there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run<R> {
    pub outcome: R,
    /// Number of times the mutation was invoked.
    pub attempts: u32,
    pub stop: Stop,
}

impl<R: WriteOutcome> Run<R> {
    pub fn write_ok(&self) -> bool {
        self.outcome.write_ok()
    }
}

impl<R> Run<R> {
    pub fn into_outcome(self) -> R {
        self.outcome
    }
}

/// Drives a [`Mutation`] until it succeeds, the budget is spent, or the run
/// is cancelled.
#[derive(Debug, Clone, Default)]
pub struct RetryDriver {
    budget: RetryBudget,
    cancel: Option<watch::Receiver<()>>,
}

impl RetryDriver {
    pub fn new(budget: RetryBudget) -> Self {
        Self {
            budget,
            cancel: None,
        }
    }

    /// Observe a cancel signal between attempts.
    ///
    /// A send on the paired sender, or dropping it, stops the run before the
    /// next attempt starts. An attempt already in flight is never interrupted.
    pub fn with_cancel(mut self, cancel: watch::Receiver<()>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn budget(&self) -> RetryBudget {
        self.budget
    }

    /// Run `op` starting from `initial`, reusing `session` for every attempt.
    pub async fn run<M, Session>(
        &self,
        op: &M,
        initial: M::State,
        session: &Session,
    ) -> Result<Run<M::Outcome>, M::Error>
    where
        M: Mutation<Session>,
        Session: Sync + ?Sized,
    {
        let mut attempt = Attempt::first(initial);

        loop {
            let number = attempt.number;
            tracing::debug!(attempt = number, "running mutation attempt");

            let outcome = op.attempt(attempt, session).await?;
            let attempts = number.saturating_add(1);

            if outcome.write_ok() {
                tracing::debug!(attempts, "mutation succeeded");
                return Ok(Run {
                    outcome,
                    attempts,
                    stop: Stop::Succeeded,
                });
            }

            let next = number.saturating_add(1);
            if !self.budget.allows(next) {
                tracing::warn!(attempts, budget = ?self.budget, "mutation retry budget exhausted");
                return Ok(Run {
                    outcome,
                    attempts,
                    stop: Stop::Exhausted,
                });
            }

            if self.is_cancelled() {
                tracing::info!(attempts, "mutation cancelled between attempts");
                return Ok(Run {
                    outcome,
                    attempts,
                    stop: Stop::Cancelled,
                });
            }

            attempt = Attempt::after(next, outcome);
        }
    }

    /// Like [`RetryDriver::run`], with a session created for this run only.
    pub async fn run_with_new_session<M, Session>(
        &self,
        op: &M,
        initial: M::State,
    ) -> Result<Run<M::Outcome>, M::Error>
    where
        M: Mutation<Session>,
        Session: Default + Sync,
    {
        let session = Session::default();
        self.run(op, initial, &session).await
    }

    fn is_cancelled(&self) -> bool {
        match &self.cancel {
            Some(rx) => rx.has_changed().unwrap_or(true),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Outcome {
        write_ok: bool,
        seen: u32,
    }

    impl WriteOutcome for Outcome {
        fn write_ok(&self) -> bool {
            self.write_ok
        }
    }

    /// Succeeds once `succeed_at` attempts have failed; `None` never succeeds.
    struct Flaky {
        succeed_at: Option<u32>,
        calls: AtomicU32,
        inputs: Mutex<Vec<AttemptInput<u32, Outcome>>>,
    }

    impl Flaky {
        fn new(succeed_at: Option<u32>) -> Self {
            Self {
                succeed_at,
                calls: AtomicU32::new(0),
                inputs: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Mutation<()> for Flaky {
        type State = u32;
        type Outcome = Outcome;
        type Error = String;

        async fn attempt(
            &self,
            attempt: Attempt<u32, Outcome>,
            _session: &(),
        ) -> Result<Outcome, String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inputs.lock().unwrap().push(attempt.input.clone());
            Ok(Outcome {
                write_ok: self.succeed_at == Some(attempt.number),
                seen: attempt.number,
            })
        }
    }

    #[tokio::test]
    async fn test_first_attempt_success_invokes_once() {
        let op = Flaky::new(Some(0));
        let run = RetryDriver::new(RetryBudget::Limited(10))
            .run(&op, 7, &())
            .await
            .unwrap();

        assert_eq!(op.calls(), 1);
        assert_eq!(run.attempts, 1);
        assert_eq!(run.stop, Stop::Succeeded);
        assert!(run.write_ok());
        assert_eq!(op.inputs.lock().unwrap()[0], AttemptInput::Initial(7));
    }

    #[tokio::test]
    async fn test_always_failing_invokes_budget_plus_one() {
        for n in [0, 1, 4] {
            let op = Flaky::new(None);
            let run = RetryDriver::new(RetryBudget::Limited(n))
                .run(&op, 0, &())
                .await
                .unwrap();

            assert_eq!(op.calls(), n + 1);
            assert_eq!(run.attempts, n + 1);
            assert_eq!(run.stop, Stop::Exhausted);
            assert!(!run.write_ok());
            assert_eq!(run.outcome.seen, n);
        }
    }

    #[tokio::test]
    async fn test_succeeds_on_last_allowed_attempt() {
        let op = Flaky::new(Some(3));
        let run = RetryDriver::new(RetryBudget::Limited(3))
            .run(&op, 0, &())
            .await
            .unwrap();

        assert_eq!(op.calls(), 4);
        assert_eq!(run.stop, Stop::Succeeded);
        assert!(run.write_ok());
    }

    #[tokio::test]
    async fn test_previous_outcome_is_threaded_forward() {
        let op = Flaky::new(Some(2));
        RetryDriver::new(RetryBudget::Unbounded)
            .run(&op, 42, &())
            .await
            .unwrap();

        let inputs = op.inputs.lock().unwrap();
        assert_eq!(inputs.len(), 3);
        assert_eq!(inputs[0], AttemptInput::Initial(42));
        assert_eq!(
            inputs[1],
            AttemptInput::Retry(Outcome {
                write_ok: false,
                seen: 0
            })
        );
        assert_eq!(inputs[2].previous().map(|o| o.seen), Some(1));
    }

    struct Faulty {
        calls: AtomicU32,
    }

    #[async_trait]
    impl Mutation<()> for Faulty {
        type State = ();
        type Outcome = Outcome;
        type Error = String;

        async fn attempt(
            &self,
            attempt: Attempt<(), Outcome>,
            _session: &(),
        ) -> Result<Outcome, String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if attempt.number == 1 {
                return Err("connection reset".to_string());
            }
            Ok(Outcome {
                write_ok: false,
                seen: attempt.number,
            })
        }
    }

    #[tokio::test]
    async fn test_operation_error_propagates_without_retry() {
        let op = Faulty {
            calls: AtomicU32::new(0),
        };
        let err = RetryDriver::new(RetryBudget::Unbounded)
            .run(&op, (), &())
            .await
            .unwrap_err();

        assert_eq!(err, "connection reset");
        assert_eq!(op.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cancel_stops_unbounded_run() {
        let (tx, rx) = watch::channel(());
        tx.send(()).unwrap();

        let op = Flaky::new(None);
        let run = RetryDriver::new(RetryBudget::Unbounded)
            .with_cancel(rx)
            .run(&op, 0, &())
            .await
            .unwrap();

        assert_eq!(op.calls(), 1);
        assert_eq!(run.stop, Stop::Cancelled);
        assert!(!run.write_ok());
    }

    #[tokio::test]
    async fn test_unsignalled_cancel_does_not_interfere() {
        let (_tx, rx) = watch::channel(());
        let op = Flaky::new(Some(2));
        let run = RetryDriver::new(RetryBudget::Limited(5))
            .with_cancel(rx)
            .run(&op, 0, &())
            .await
            .unwrap();

        assert_eq!(run.stop, Stop::Succeeded);
        assert_eq!(op.calls(), 3);
    }

    #[derive(Default)]
    struct CountingSession {
        uses: AtomicU32,
    }

    struct UsesSession;

    #[async_trait]
    impl Mutation<CountingSession> for UsesSession {
        type State = ();
        type Outcome = Outcome;
        type Error = String;

        async fn attempt(
            &self,
            attempt: Attempt<(), Outcome>,
            session: &CountingSession,
        ) -> Result<Outcome, String> {
            let uses = session.uses.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(Outcome {
                write_ok: uses == 3,
                seen: attempt.number,
            })
        }
    }

    #[tokio::test]
    async fn test_new_session_is_reused_across_attempts() {
        let run = RetryDriver::default()
            .run_with_new_session::<_, CountingSession>(&UsesSession, ())
            .await
            .unwrap();

        // Three uses of the same session add up to success on the third attempt
        assert_eq!(run.attempts, 3);
        assert!(run.write_ok());
    }

    #[test]
    fn test_narrow_selects_by_shape() {
        let initial: AttemptInput<&str, (bool, &str)> = AttemptInput::Initial("draft");
        assert_eq!(initial.narrow(|s| s.to_string(), |(_, c)| c.to_string()), "draft");

        let retry: AttemptInput<&str, (bool, &str)> = AttemptInput::Retry((false, "cluster-1"));
        assert_eq!(retry.narrow(|s| s.to_string(), |(_, c)| c.to_string()), "cluster-1");
    }

    #[test]
    fn test_budget_from_option() {
        assert_eq!(RetryBudget::from(Some(3)), RetryBudget::Limited(3));
        assert_eq!(RetryBudget::from(None), RetryBudget::Unbounded);
        assert!(RetryBudget::Limited(2).allows(2));
        assert!(!RetryBudget::Limited(2).allows(3));
        assert!(RetryBudget::Unbounded.allows(u32::MAX));
    }
}
