//! # Club Portal Runtime
//!
//! The Store that coordinates reducer execution and effect handling for the
//! portal state layer.
//!
//! ## Core Components
//!
//! - **Store**: owns the state behind an async `RwLock`, runs the reducer
//!   and executes the returned effects
//! - **Effect Executor**: spawns effects as tokio tasks and feeds produced
//!   actions back into the store
//! - **Action broadcast**: every action produced by an effect is published
//!   once it has been reduced, so callers can wait for a result
//!   (`send_and_wait_for`) and read the state it left behind
//!
//! Effects are never retried and never cancelled: a failed API call becomes
//! a failure action, and an in-flight effect whose result is no longer
//! interesting still runs to completion and is reduced.
//!
//! ## Example
//!
//! ```ignore
//! use club_portal_runtime::Store;
//!
//! let store = Store::new(PortalState::default(), PortalReducer::new(), env);
//!
//! store.send(PortalAction::Bootstrap).await?.wait().await;
//! let count = store.state(|s| s.tickets.tickets.len()).await;
//! ```

use club_portal_core::{effect::Effect, reducer::Reducer};
use futures::future::{BoxFuture, FutureExt};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{RwLock, broadcast, watch};

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Failures of [`Store`](crate::Store) calls
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum StoreError {
        /// `shutdown` was called; no further actions are reduced
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Effect tasks were still running when the shutdown deadline passed
        #[error("Shutdown deadline passed with {0} effect task(s) running")]
        ShutdownTimeout(usize),

        /// Nothing matched before the deadline
        #[error("Timed out waiting for effects")]
        Timeout,

        /// The action broadcast has no sender left
        #[error("Action broadcast closed")]
        ChannelClosed,
    }
}

pub use error::StoreError;

/// Default number of actions buffered for slow observers
const BROADCAST_CAPACITY: usize = 64;

/// Number of running tasks, observable at zero
#[derive(Clone)]
struct TaskCount(Arc<watch::Sender<usize>>);

impl TaskCount {
    fn new() -> Self {
        Self(Arc::new(watch::channel(0).0))
    }

    fn enter(&self) -> TaskGuard {
        self.0.send_modify(|running| *running += 1);
        TaskGuard(self.clone())
    }

    fn running(&self) -> usize {
        *self.0.borrow()
    }

    async fn idle(&self) {
        let mut rx = self.0.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|running| *running == 0).await;
    }
}

/// Leaves the count on drop, including when the task panics
struct TaskGuard(TaskCount);

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.0.0.send_modify(|running| *running = running.saturating_sub(1));
    }
}

/// Handle for waiting on the effects started by one `send`.
///
/// Covers `Future`, `Parallel` and `Sequential` effects and the effects of
/// every action they feed back. `Delay` effects are timers (toast expiry)
/// and are not awaited.
#[derive(Clone)]
pub struct EffectHandle {
    tasks: TaskCount,
}

impl EffectHandle {
    fn new() -> Self {
        Self { tasks: TaskCount::new() }
    }

    /// A handle with nothing to wait for
    #[must_use]
    pub fn completed() -> Self {
        Self::new()
    }

    /// Wait until every tracked effect has finished
    pub async fn wait(&self) {
        self.tasks.idle().await;
    }

    /// [`wait`](Self::wait) with an upper bound
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if effects are still running after `timeout`.
    pub async fn wait_with_timeout(&self, timeout: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| StoreError::Timeout)
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("running", &self.tasks.running())
            .finish()
    }
}

fn executed(kind: &'static str) {
    metrics::counter!("portal.store.effects", "kind" => kind).increment(1);
}

/// Store runtime for coordinating reducer execution and effect handling.
pub mod store {
    use super::{
        Arc, AtomicBool, BROADCAST_CAPACITY, BoxFuture, Duration, Effect, EffectHandle, FutureExt,
        Instant, Ordering, Reducer, RwLock, StoreError, TaskCount, broadcast, executed,
    };

    struct Shared<R: Reducer> {
        state: RwLock<R::State>,
        reducer: R,
        env: R::Environment,
        accepting: AtomicBool,
        /// Every spawned effect task, for shutdown
        tasks: TaskCount,
        actions: broadcast::Sender<R::Action>,
    }

    /// The runtime for one reducer. Cloning is cheap and every clone drives
    /// the same state.
    pub struct Store<R: Reducer> {
        shared: Arc<Shared<R>>,
    }

    impl<R: Reducer> Clone for Store<R> {
        fn clone(&self) -> Self {
            Self {
                shared: Arc::clone(&self.shared),
            }
        }
    }

    impl<R> Store<R>
    where
        R: Reducer + Send + Sync + 'static,
        R::State: Send + Sync + 'static,
        R::Action: Clone + Send + 'static,
        R::Environment: Send + Sync + 'static,
    {
        /// Store with the default broadcast capacity (64 actions)
        #[must_use]
        pub fn new(initial_state: R::State, reducer: R, env: R::Environment) -> Self {
            Self::with_broadcast_capacity(initial_state, reducer, env, BROADCAST_CAPACITY)
        }

        /// Store whose action broadcast buffers `capacity` actions per observer
        #[must_use]
        pub fn with_broadcast_capacity(
            initial_state: R::State,
            reducer: R,
            env: R::Environment,
            capacity: usize,
        ) -> Self {
            let (actions, _) = broadcast::channel(capacity.max(1));
            Self {
                shared: Arc::new(Shared {
                    state: RwLock::new(initial_state),
                    reducer,
                    env,
                    accepting: AtomicBool::new(true),
                    tasks: TaskCount::new(),
                    actions,
                }),
            }
        }

        /// Reduce `action` and start its effects.
        ///
        /// Returns as soon as the effects are spawned; the handle waits for
        /// them.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] after [`shutdown`](Self::shutdown).
        #[tracing::instrument(skip_all, name = "store_send")]
        pub async fn send(&self, action: R::Action) -> Result<EffectHandle, StoreError> {
            let handle = EffectHandle::new();
            self.dispatch(action, &handle.tasks).await?;
            Ok(handle)
        }

        async fn dispatch(&self, action: R::Action, tracked: &TaskCount) -> Result<(), StoreError> {
            if !self.shared.accepting.load(Ordering::Acquire) {
                tracing::warn!("Action refused after shutdown");
                metrics::counter!("portal.store.refused").increment(1);
                return Err(StoreError::ShutdownInProgress);
            }
            metrics::counter!("portal.store.actions").increment(1);

            let effects = {
                let mut state = self.shared.state.write().await;
                let started = Instant::now();
                let effects = self.shared.reducer.reduce(&mut state, action, &self.shared.env);
                metrics::histogram!("portal.store.reduce_seconds").record(started.elapsed().as_secs_f64());
                effects
            };
            tracing::trace!(effects = effects.len(), "Reduced");

            for effect in effects {
                self.start(effect, tracked);
            }
            Ok(())
        }

        /// Send an action and wait for a matching action produced by its effects
        ///
        /// Subscribes before sending, so a fast effect cannot be missed. The
        /// matching action has already been reduced when it is returned.
        ///
        /// # Errors
        ///
        /// - [`StoreError::Timeout`]: nothing matched within `timeout`
        /// - [`StoreError::ChannelClosed`]: the broadcast channel closed
        /// - [`StoreError::ShutdownInProgress`]: the store is shutting down
        ///
        /// # Example
        ///
        /// ```ignore
        /// let result = store.send_and_wait_for(
        ///     PortalAction::Cart(CartAction::Checkout { token }),
        ///     |a| matches!(a,
        ///         PortalAction::Cart(CartAction::CheckoutSucceeded { .. }
        ///             | CartAction::CheckoutFailed { .. })),
        ///     Duration::from_secs(10),
        /// ).await?;
        /// ```
        pub async fn send_and_wait_for<F>(
            &self,
            action: R::Action,
            matches: F,
            timeout: Duration,
        ) -> Result<R::Action, StoreError>
        where
            F: Fn(&R::Action) -> bool,
        {
            let mut results = self.shared.actions.subscribe();
            self.send(action).await?;

            let wanted = async {
                loop {
                    match results.recv().await {
                        Ok(action) if matches(&action) => return Ok(action),
                        Ok(_) => {},
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "Result observer fell behind");
                        },
                        Err(broadcast::error::RecvError::Closed) => return Err(StoreError::ChannelClosed),
                    }
                }
            };
            tokio::time::timeout(timeout, wanted)
                .await
                .unwrap_or(Err(StoreError::Timeout))
        }

        /// Every action fed back by an effect, after it is reduced
        #[must_use]
        pub fn subscribe_actions(&self) -> broadcast::Receiver<R::Action> {
            self.shared.actions.subscribe()
        }

        /// Read the current state
        ///
        /// ```ignore
        /// let in_cart = store.state(|s| s.cart.item_count()).await;
        /// ```
        pub async fn state<F, T>(&self, read: F) -> T
        where
            F: FnOnce(&R::State) -> T,
        {
            read(&*self.shared.state.read().await)
        }

        /// Refuse further actions and wait for running effect tasks, toast
        /// timers included.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if tasks are still running
        /// after `timeout`.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            self.shared.accepting.store(false, Ordering::Release);
            tracing::info!(running = self.shared.tasks.running(), "Store shutting down");

            if tokio::time::timeout(timeout, self.shared.tasks.idle()).await.is_err() {
                let running = self.shared.tasks.running();
                tracing::error!(running, "Effect tasks outlived the shutdown deadline");
                metrics::counter!("portal.store.shutdown_timeouts").increment(1);
                return Err(StoreError::ShutdownTimeout(running));
            }
            tracing::info!("Store stopped");
            Ok(())
        }

        /// Reduce an effect result, then publish it
        async fn feed_back(&self, action: R::Action, tracked: &TaskCount) {
            let published = action.clone();
            if let Err(error) = self.dispatch(action, tracked).await {
                tracing::debug!(%error, "Effect result dropped");
            }
            let _ = self.shared.actions.send(published);
        }

        fn spawn(&self, tracked: Option<&TaskCount>, task: BoxFuture<'static, ()>) {
            let guards = (self.shared.tasks.enter(), tracked.map(TaskCount::enter));
            tokio::spawn(async move {
                let _guards = guards;
                task.await;
            });
        }

        /// Start one effect.
        ///
        /// `Parallel` children start immediately; `Sequential` children run
        /// one at a time, each with its feedback settled before the next.
        fn start(&self, effect: Effect<R::Action>, tracked: &TaskCount) {
            match effect {
                Effect::None => executed("none"),
                Effect::Future(fut) => {
                    executed("future");
                    let store = self.clone();
                    let feedback = tracked.clone();
                    self.spawn(
                        Some(tracked),
                        async move {
                            if let Some(action) = fut.await {
                                store.feed_back(action, &feedback).await;
                            }
                        }
                        .boxed(),
                    );
                },
                Effect::Delay { duration, action } => {
                    executed("delay");
                    let store = self.clone();
                    self.spawn(
                        None,
                        async move {
                            tokio::time::sleep(duration).await;
                            store.feed_back(*action, &TaskCount::new()).await;
                        }
                        .boxed(),
                    );
                },
                Effect::Parallel(effects) => {
                    executed("parallel");
                    for effect in effects {
                        self.start(effect, tracked);
                    }
                },
                Effect::Sequential(effects) => {
                    executed("sequential");
                    let store = self.clone();
                    self.spawn(
                        Some(tracked),
                        async move {
                            for effect in effects {
                                let step = TaskCount::new();
                                store.start(effect, &step);
                                step.idle().await;
                            }
                        }
                        .boxed(),
                    );
                },
            }
        }
    }
}

pub use store::Store;

#[cfg(test)]
mod tests {
    use super::*;
    use club_portal_core::{SmallVec, smallvec};

    #[derive(Debug, Clone)]
    struct Turnstile {
        admitted: i32,
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Gate {
        Admit,
        AdmitAfterScan,
        AdmitPairInOrder,
        AdmitPairAtOnce,
        Queue(u8),
        ReopenLater,
    }

    struct GateReducer;

    impl Reducer for GateReducer {
        type State = Turnstile;
        type Action = Gate;
        type Environment = ();

        fn reduce(&self, state: &mut Turnstile, action: Gate, _env: &()) -> SmallVec<[Effect<Gate>; 4]> {
            match action {
                Gate::Admit => {
                    state.admitted += 1;
                    SmallVec::new()
                },
                Gate::AdmitAfterScan => smallvec![Effect::future(async { Some(Gate::Admit) })],
                Gate::AdmitPairInOrder => smallvec![Effect::chain(vec![
                    Effect::future(async { Some(Gate::Admit) }),
                    Effect::future(async { Some(Gate::Admit) }),
                ])],
                Gate::AdmitPairAtOnce => smallvec![Effect::merge(vec![
                    Effect::future(async { Some(Gate::Admit) }),
                    Effect::future(async { Some(Gate::Admit) }),
                ])],
                Gate::Queue(0) => SmallVec::new(),
                Gate::Queue(n) => {
                    state.admitted += 1;
                    smallvec![Effect::future(async move { Some(Gate::Queue(n - 1)) })]
                },
                Gate::ReopenLater => smallvec![Effect::Delay {
                    duration: Duration::from_secs(30),
                    action: Box::new(Gate::Admit),
                }],
            }
        }
    }

    fn store() -> Store<GateReducer> {
        Store::new(Turnstile { admitted: 0 }, GateReducer, ())
    }

    #[tokio::test]
    async fn reduces_before_send_returns() -> Result<(), StoreError> {
        let store = store();
        store.send(Gate::Admit).await?;
        assert_eq!(store.state(|s| s.admitted).await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn future_results_are_fed_back() -> Result<(), StoreError> {
        let store = store();
        store.send(Gate::AdmitAfterScan).await?.wait().await;
        assert_eq!(store.state(|s| s.admitted).await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn handle_waits_for_cascaded_effects() -> Result<(), StoreError> {
        let store = store();
        store
            .send(Gate::Queue(5))
            .await?
            .wait_with_timeout(Duration::from_secs(5))
            .await?;
        assert_eq!(store.state(|s| s.admitted).await, 5);
        Ok(())
    }

    #[tokio::test]
    async fn sequential_and_parallel_effects_complete() -> Result<(), StoreError> {
        let store = store();
        store.send(Gate::AdmitPairInOrder).await?.wait().await;
        store.send(Gate::AdmitPairAtOnce).await?.wait().await;
        assert_eq!(store.state(|s| s.admitted).await, 4);
        Ok(())
    }

    #[tokio::test]
    async fn matched_result_is_already_reduced() -> Result<(), StoreError> {
        let store = store();
        let action = store
            .send_and_wait_for(Gate::AdmitAfterScan, |a| *a == Gate::Admit, Duration::from_secs(5))
            .await?;
        assert_eq!(action, Gate::Admit);
        assert_eq!(store.state(|s| s.admitted).await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn send_and_wait_for_times_out() {
        let store = store();
        let result = store
            .send_and_wait_for(Gate::Admit, |a| *a == Gate::AdmitAfterScan, Duration::from_millis(50))
            .await;
        assert_eq!(result.err(), Some(StoreError::Timeout));
    }

    #[tokio::test(start_paused = true)]
    async fn handle_does_not_wait_for_timers() -> Result<(), StoreError> {
        let store = store();
        store
            .send(Gate::ReopenLater)
            .await?
            .wait_with_timeout(Duration::from_millis(10))
            .await?;
        assert_eq!(store.state(|s| s.admitted).await, 0);

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(store.state(|s| s.admitted).await, 1);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_reports_timers_still_pending() -> Result<(), StoreError> {
        let store = store();
        store.send(Gate::ReopenLater).await?;
        assert_eq!(
            store.shutdown(Duration::from_secs(1)).await,
            Err(StoreError::ShutdownTimeout(1))
        );
        Ok(())
    }

    #[tokio::test]
    async fn rejects_actions_after_shutdown() -> Result<(), StoreError> {
        let store = store();
        store.shutdown(Duration::from_secs(1)).await?;
        assert_eq!(store.send(Gate::Admit).await.err(), Some(StoreError::ShutdownInProgress));
        Ok(())
    }
}
