//! The search lifecycle engine.
//!
//! A search goes Idle → Searching → Polling → Success | Error. Every step
//! after `start` runs as a [`ScheduledTask`] on the tokio runtime. Each
//! session is stamped with a generation number; `start` and `cancel` bump
//! it, and every continuation checks it under the state lock before touching
//! the session. A continuation still waiting on its timer is cancelled
//! outright. One already talking to the backend is left to finish: it sees
//! the newer generation, drops its result and stops any search it was just
//! handed, so it never mutates state or reaches an observer.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::aggregate::{ByCountryResolver, PerHotelResolver, ResolvePolicy, aggregate_tours};
use crate::api::{ApiError, Disposition, SearchToken, TourApi};
use crate::cache::CachedTourApi;
use crate::clock::Clock;
use crate::domain::{CountryId, PriceOffer, Tour};

use super::config::SearchConfig;
use super::observer::{self, Observers, SessionObserver, Subscription};
use super::session::{SearchSession, SearchStatus};
use super::task::ScheduledTask;

struct EngineState {
    generation: u64,
    session: SearchSession,
    /// The one continuation allowed to advance the current session.
    pending: Option<ScheduledTask>,
}

struct Inner<A> {
    api: Arc<CachedTourApi<A>>,
    clock: Arc<dyn Clock>,
    config: SearchConfig,
    state: Mutex<EngineState>,
    observers: Observers,
}

/// Drives a single price search at a time.
///
/// Cloning gives another handle onto the same engine.
pub struct SearchEngine<A> {
    inner: Arc<Inner<A>>,
}

impl<A> Clone for SearchEngine<A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<A: TourApi> SearchEngine<A> {
    pub fn new(api: Arc<CachedTourApi<A>>, clock: Arc<dyn Clock>, config: SearchConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                api,
                clock,
                config,
                state: Mutex::new(EngineState {
                    generation: 0,
                    session: SearchSession::idle(0),
                    pending: None,
                }),
                observers: Observers::default(),
            }),
        }
    }

    /// Start searching `country`, replacing whatever search was running.
    ///
    /// Returns straight away with the new session's generation; progress is
    /// reported to observers. Must be called from within a tokio runtime.
    pub fn start(&self, country: CountryId) -> u64 {
        debug_assert!(!observer::delivering(), "observers must not call back into the engine");
        let inner = &self.inner;
        let mut state = inner.state.lock();

        state.generation += 1;
        let generation = state.generation;
        if let Some(task) = state.pending.take() {
            task.cancel();
        }
        if state.session.is_busy()
            && let Some(token) = state.session.token.take()
        {
            debug!(%token, "stopping superseded search");
            inner.spawn_stop(token);
        }

        debug!(generation, %country, "search started");
        state.session = SearchSession::searching(generation, country.clone());
        inner.observers.notify(&state.session);

        let task = ScheduledTask::now(inner.clone().begin(generation, country));
        state.pending = Some(task);
        generation
    }

    /// Abandon the running search, if any.
    ///
    /// Returns `false` without touching anything unless a search is
    /// searching or polling. Otherwise the session goes back to idle and the
    /// backend is asked to stop the search; failure to stop is only logged.
    pub async fn cancel(&self) -> bool {
        debug_assert!(!observer::delivering(), "observers must not call back into the engine");
        let token = {
            let mut state = self.inner.state.lock();
            if !state.session.is_busy() {
                return false;
            }

            state.generation += 1;
            if let Some(task) = state.pending.take() {
                task.cancel();
            }
            let token = state.session.token.take();
            debug!(generation = state.generation, "search cancelled");
            state.session = SearchSession::idle(state.generation);
            self.inner.observers.notify(&state.session);
            token
        };

        if let Some(token) = token {
            self.inner.stop_quietly(&token).await;
        }
        true
    }

    /// A copy of the current session.
    pub fn snapshot(&self) -> SearchSession {
        debug_assert!(!observer::delivering(), "observers must not call back into the engine");
        self.inner.state.lock().session.clone()
    }

    /// Register an observer for every future transition.
    pub fn subscribe(&self, observer: impl SessionObserver) -> Subscription {
        self.inner.observers.subscribe(Arc::new(observer))
    }

    /// Transitions as a channel. The channel closes when the subscription is
    /// dropped.
    pub fn updates(&self) -> (Subscription, mpsc::UnboundedReceiver<SearchSession>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = self.subscribe(move |session: &SearchSession| {
            // A dropped receiver just means nobody is listening any more.
            let _ = tx.send(session.clone());
        });
        (subscription, rx)
    }

    pub fn config(&self) -> &SearchConfig {
        &self.inner.config
    }

    /// The cached backend the engine searches through.
    pub fn api(&self) -> &Arc<CachedTourApi<A>> {
        &self.inner.api
    }
}

impl<A: TourApi> Inner<A> {
    /// Searching: ask the backend for a token.
    async fn begin(self: Arc<Self>, generation: u64, country: CountryId) {
        let result = self.api.client().start_search(&country).await;

        let mut state = self.state.lock();
        if state.generation != generation {
            // Superseded after the backend had already accepted the search.
            if let Ok(ticket) = result {
                debug!(generation, token = %ticket.token, "discarding superseded ticket");
                self.spawn_stop(ticket.token);
            }
            return;
        }

        match result {
            Ok(ticket) => {
                let delay = self.clock.until(ticket.ready_at);
                debug!(
                    generation,
                    token = %ticket.token,
                    delay_ms = delay.as_millis() as u64,
                    "search accepted, polling"
                );
                state.session.status = SearchStatus::Polling;
                state.session.token = Some(ticket.token.clone());
                self.observers.notify(&state.session);
                state.pending = Some(self.schedule_poll(generation, ticket.token, delay));
            }
            Err(e) => {
                info!(generation, %country, error = %e, "search could not be started");
                fail(&mut state, &self.observers, &e);
            }
        }
    }

    /// Polling: fetch results and decide what happens next.
    async fn poll(self: Arc<Self>, generation: u64, token: SearchToken) {
        let result = self.api.client().fetch_prices(&token).await;

        let prices = match result {
            Ok(prices) => prices,
            Err(e) => {
                let mut state = self.state.lock();
                if state.generation != generation {
                    return;
                }
                self.handle_fetch_error(&mut state, generation, token, e);
                return;
            }
        };

        let country = {
            let state = self.state.lock();
            if state.generation != generation {
                return;
            }
            state.session.country.clone()
        };
        let Some(country) = country else {
            return;
        };

        let tours = self.aggregate(prices.clone(), &country).await;

        let mut state = self.state.lock();
        if state.generation != generation {
            return;
        }
        info!(generation, %token, tours = tours.len(), "search complete");
        state.session.status = SearchStatus::Success;
        state.session.prices = Some(prices);
        state.session.tours = Some(tours);
        state.pending = None;
        self.observers.notify(&state.session);
    }

    fn handle_fetch_error(
        self: &Arc<Self>,
        state: &mut EngineState,
        generation: u64,
        token: SearchToken,
        error: ApiError,
    ) {
        match error.disposition() {
            Disposition::NotReady(wait_until) => {
                let delay = wait_until
                    .map(|at| self.clock.until(at))
                    .unwrap_or(self.config.not_ready_delay);
                debug!(
                    generation,
                    %token,
                    delay_ms = delay.as_millis() as u64,
                    "results not ready"
                );
                state.pending = Some(self.schedule_poll(generation, token, delay));
            }
            Disposition::Transient if state.session.retry_count < self.config.max_retries => {
                state.session.retry_count += 1;
                warn!(
                    generation,
                    %token,
                    retry_count = state.session.retry_count,
                    error = %error,
                    "fetching results failed, retrying"
                );
                self.observers.notify(&state.session);
                let delay = self.config.retry_delay;
                state.pending = Some(self.schedule_poll(generation, token, delay));
            }
            Disposition::Transient | Disposition::Fatal => {
                info!(
                    generation,
                    %token,
                    retry_count = state.session.retry_count,
                    error = %error,
                    "search failed"
                );
                fail(state, &self.observers, &error);
            }
        }
    }

    fn schedule_poll(
        self: &Arc<Self>,
        generation: u64,
        token: SearchToken,
        delay: Duration,
    ) -> ScheduledTask {
        ScheduledTask::after(delay, self.clone().poll(generation, token))
    }

    async fn aggregate(&self, prices: Vec<PriceOffer>, country: &CountryId) -> Vec<Tour> {
        match self.config.resolve_policy {
            ResolvePolicy::PerHotel => {
                aggregate_tours(prices, country, &PerHotelResolver::new(&self.api)).await
            }
            ResolvePolicy::ByCountry => {
                aggregate_tours(prices, country, &ByCountryResolver::new(&self.api)).await
            }
        }
    }

    /// Best-effort stop. Failures are logged and otherwise ignored.
    async fn stop_quietly(&self, token: &SearchToken) {
        match self.api.client().stop_search(token).await {
            Ok(()) => debug!(%token, "backend search stopped"),
            Err(e) => warn!(%token, error = %e, "failed to stop backend search"),
        }
    }

    fn spawn_stop(self: &Arc<Self>, token: SearchToken) {
        let inner = self.clone();
        tokio::spawn(async move { inner.stop_quietly(&token).await });
    }
}

fn fail(state: &mut EngineState, observers: &Observers, error: &ApiError) {
    state.session.status = SearchStatus::Error;
    state.session.last_error = Some(error.to_string());
    state.pending = None;
    observers.notify(&state.session);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fixtures::{offer, sample_api};
    use crate::api::{FetchReply, MockTourApi, StartReply};
    use crate::cache::CacheConfig;
    use crate::clock::InstantClock;
    use chrono::TimeDelta;
    use tokio::time::Instant;

    struct Harness {
        engine: SearchEngine<MockTourApi>,
        mock: MockTourApi,
        rx: mpsc::UnboundedReceiver<SearchSession>,
        _sub: Subscription,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_config(SearchConfig::default())
        }

        fn with_config(config: SearchConfig) -> Self {
            let clock: Arc<dyn Clock> = Arc::new(InstantClock::new());
            let mock = sample_api(clock.clone());
            let api = Arc::new(CachedTourApi::new(mock.clone(), &CacheConfig::default()));
            let engine = SearchEngine::new(api, clock, config);
            let (_sub, rx) = engine.updates();
            Self {
                engine,
                mock,
                rx,
                _sub,
            }
        }

        async fn next(&mut self) -> SearchSession {
            self.rx.recv().await.unwrap()
        }

        /// Collect transitions until one is terminal.
        async fn until_settled(&mut self) -> Vec<SearchSession> {
            let mut seen = Vec::new();
            loop {
                let session = self.next().await;
                let done = matches!(
                    session.status,
                    SearchStatus::Success | SearchStatus::Error | SearchStatus::Idle
                );
                seen.push(session);
                if done {
                    return seen;
                }
            }
        }

        fn assert_quiet(&mut self) {
            assert!(self.rx.try_recv().is_err(), "unexpected transition");
        }
    }

    fn gr() -> CountryId {
        CountryId::parse("GR").unwrap()
    }

    fn eg() -> CountryId {
        CountryId::parse("EG").unwrap()
    }

    fn ticket(token: &str, ready_in_ms: i64) -> StartReply {
        StartReply::Ticket {
            token: token.to_string(),
            ready_in: TimeDelta::milliseconds(ready_in_ms),
        }
    }

    fn server_error() -> FetchReply {
        FetchReply::Fail {
            status: 500,
            message: "boom".to_string(),
        }
    }

    fn statuses(sessions: &[SearchSession]) -> Vec<SearchStatus> {
        sessions.iter().map(|s| s.status).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn end_to_end_search() {
        let mut h = Harness::new();
        h.mock.push_start(ticket("T1", 500));
        h.mock.push_fetch(FetchReply::NotReady {
            ready_in: Some(TimeDelta::milliseconds(200)),
        });
        h.mock.push_fetch(FetchReply::Prices(vec![
            offer("p1", 300, Some(1)),
            offer("p2", 100, Some(3)),
        ]));

        let began = Instant::now();
        let generation = h.engine.start(gr());
        let seen = h.until_settled().await;

        assert_eq!(
            statuses(&seen),
            vec![
                SearchStatus::Searching,
                SearchStatus::Polling,
                SearchStatus::Success
            ]
        );
        assert!(seen.iter().all(|s| s.generation == generation));
        assert_eq!(seen[1].token, Some(SearchToken::new("T1")));
        assert!(began.elapsed() >= Duration::from_millis(700));

        let done = &seen[2];
        assert_eq!(done.retry_count, 0);
        assert!(done.last_error.is_none());
        assert_eq!(done.prices.as_ref().map(Vec::len), Some(2));
        let tours = done.tours.as_ref().unwrap();
        assert_eq!(tours.len(), 2);
        assert_eq!(tours[0].id().as_str(), "p2");
        assert_eq!(tours[0].hotel.name, "Santorini Sun");
        assert_eq!(tours[1].id().as_str(), "p1");
        assert_eq!(h.mock.fetch_calls(), 2);
        assert_eq!(h.engine.snapshot(), *done);

        assert!(!h.engine.cancel().await);
        h.assert_quiet();
        assert!(h.mock.stopped_tokens().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn emulated_backend_search() {
        let mut h = Harness::new();
        h.engine.start(gr());
        let seen = h.until_settled().await;

        let done = seen.last().unwrap();
        assert_eq!(done.status, SearchStatus::Success);
        assert_eq!(done.tours.as_ref().map(Vec::len), Some(3));
        let amounts: Vec<_> = done.tours.as_ref().unwrap().iter().map(Tour::amount).collect();
        let mut sorted = amounts.clone();
        sorted.sort();
        assert_eq!(amounts, sorted);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_exhausted_end_in_error() {
        let mut h = Harness::new();
        h.mock.push_start(ticket("T1", 0));
        for _ in 0..3 {
            h.mock.push_fetch(server_error());
        }

        h.engine.start(gr());
        let seen = h.until_settled().await;

        assert_eq!(
            statuses(&seen),
            vec![
                SearchStatus::Searching,
                SearchStatus::Polling,
                SearchStatus::Polling,
                SearchStatus::Polling,
                SearchStatus::Error
            ]
        );
        let retries: Vec<u32> = seen.iter().map(|s| s.retry_count).collect();
        assert_eq!(retries, vec![0, 0, 1, 2, 2]);

        let failed = seen.last().unwrap();
        assert_eq!(failed.last_error.as_deref(), Some("API error 500: boom"));
        assert!(failed.tours.is_none());
        assert_eq!(h.mock.fetch_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_within_budget_then_success() {
        let mut h = Harness::new();
        h.mock.push_start(ticket("T1", 0));
        h.mock.push_fetch(server_error());
        h.mock.push_fetch(server_error());
        h.mock.push_fetch(FetchReply::Prices(vec![offer("p1", 100, Some(1))]));

        let began = Instant::now();
        h.engine.start(gr());
        let seen = h.until_settled().await;

        let done = seen.last().unwrap();
        assert_eq!(done.status, SearchStatus::Success);
        assert_eq!(done.retry_count, 2);
        assert!(done.last_error.is_none());
        assert!(began.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn retry_budget_is_configurable() {
        let mut h = Harness::with_config(SearchConfig::default().with_max_retries(0));
        h.mock.push_start(ticket("T1", 0));
        h.mock.push_fetch(server_error());

        h.engine.start(gr());
        let seen = h.until_settled().await;
        assert_eq!(
            statuses(&seen),
            vec![SearchStatus::Searching, SearchStatus::Polling, SearchStatus::Error]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn not_ready_is_free() {
        let mut h = Harness::new();
        h.mock.push_start(ticket("T1", 0));
        for _ in 0..5 {
            h.mock.push_fetch(FetchReply::NotReady {
                ready_in: Some(TimeDelta::milliseconds(100)),
            });
        }
        h.mock.push_fetch(FetchReply::Prices(vec![]));

        h.engine.start(gr());
        let seen = h.until_settled().await;

        assert_eq!(
            statuses(&seen),
            vec![
                SearchStatus::Searching,
                SearchStatus::Polling,
                SearchStatus::Success
            ]
        );
        let done = seen.last().unwrap();
        assert_eq!(done.retry_count, 0);
        assert_eq!(done.tours.as_deref(), Some(&[][..]));
        assert_eq!(h.mock.fetch_calls(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn not_ready_without_timestamp_waits_default_delay() {
        let mut h = Harness::new();
        h.mock.push_start(ticket("T1", 0));
        h.mock.push_fetch(FetchReply::NotReady { ready_in: None });
        h.mock.push_fetch(FetchReply::Prices(vec![]));

        let began = Instant::now();
        h.engine.start(gr());
        h.until_settled().await;
        assert!(began.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn past_ready_at_polls_immediately() {
        let mut h = Harness::new();
        h.mock.push_start(ticket("T1", -5_000));
        h.mock.push_fetch(FetchReply::NotReady {
            ready_in: Some(TimeDelta::milliseconds(-1_000)),
        });
        h.mock.push_fetch(FetchReply::Prices(vec![offer("p1", 100, Some(1))]));

        let began = Instant::now();
        h.engine.start(gr());
        let seen = h.until_settled().await;

        assert_eq!(seen.last().unwrap().status, SearchStatus::Success);
        assert_eq!(h.mock.fetch_calls(), 2);
        assert!(began.elapsed() < Duration::from_millis(1));
    }

    #[tokio::test(start_paused = true)]
    async fn bad_request_on_start_is_fatal() {
        let mut h = Harness::new();
        h.engine.start(CountryId::parse("XX").unwrap());
        let seen = h.until_settled().await;

        assert_eq!(
            statuses(&seen),
            vec![SearchStatus::Searching, SearchStatus::Error]
        );
        let failed = seen.last().unwrap();
        assert_eq!(failed.retry_count, 0);
        assert!(failed.token.is_none());
        assert!(failed.last_error.as_deref().unwrap().starts_with("bad request"));
        assert_eq!(h.mock.start_calls(), 1);
        assert_eq!(h.mock.fetch_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn bad_request_on_fetch_is_not_retried() {
        let mut h = Harness::new();
        h.mock.push_start(ticket("T1", 0));
        h.mock.push_fetch(FetchReply::Fail {
            status: 400,
            message: "bad token".to_string(),
        });

        h.engine.start(gr());
        let seen = h.until_settled().await;

        let failed = seen.last().unwrap();
        assert_eq!(failed.status, SearchStatus::Error);
        assert_eq!(failed.retry_count, 0);
        assert_eq!(h.mock.fetch_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_when_idle_is_a_no_op() {
        let mut h = Harness::new();
        assert!(!h.engine.cancel().await);
        assert!(!h.engine.cancel().await);
        h.assert_quiet();
        assert_eq!(h.engine.snapshot().status, SearchStatus::Idle);
        assert!(h.mock.stopped_tokens().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_while_polling_stops_backend_and_goes_idle() {
        let mut h = Harness::new();
        h.mock.push_start(ticket("T1", 1_000));

        h.engine.start(gr());
        assert_eq!(h.next().await.status, SearchStatus::Searching);
        assert_eq!(h.next().await.status, SearchStatus::Polling);

        assert!(h.engine.cancel().await);
        let idle = h.next().await;
        assert_eq!(idle.status, SearchStatus::Idle);
        assert!(idle.token.is_none());
        assert_eq!(h.mock.stopped_tokens(), vec![SearchToken::new("T1")]);

        // The poll that was scheduled for later must never run.
        tokio::time::sleep(Duration::from_secs(10)).await;
        h.assert_quiet();
        assert_eq!(h.mock.fetch_calls(), 0);
        assert_eq!(h.engine.snapshot().status, SearchStatus::Idle);

        assert!(!h.engine.cancel().await);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_ignores_stop_failures() {
        let mut h = Harness::new();
        h.mock.push_start(ticket("T1", 1_000));
        h.mock.fail_stop(true);

        h.engine.start(gr());
        h.next().await;
        h.next().await;

        assert!(h.engine.cancel().await);
        assert_eq!(h.next().await.status, SearchStatus::Idle);
        assert_eq!(h.mock.stopped_tokens().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_while_searching_needs_no_token() {
        let mut h = Harness::new();
        h.engine.start(gr());
        assert_eq!(h.next().await.status, SearchStatus::Searching);

        assert!(h.engine.cancel().await);
        assert_eq!(h.next().await.status, SearchStatus::Idle);

        tokio::time::sleep(Duration::from_secs(10)).await;
        h.assert_quiet();
        assert_eq!(h.engine.snapshot().status, SearchStatus::Idle);
        // Cancelled before the start request went out.
        assert_eq!(h.mock.start_calls(), 0);
        assert!(h.mock.stopped_tokens().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_start_request_stops_the_late_ticket() {
        let mut h = Harness::new();
        h.mock.set_latency(Duration::from_millis(300));
        h.mock.push_start(ticket("T1", 0));

        h.engine.start(gr());
        assert_eq!(h.next().await.status, SearchStatus::Searching);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(h.mock.start_calls(), 1);

        assert!(h.engine.cancel().await);
        assert_eq!(h.next().await.status, SearchStatus::Idle);
        assert!(h.mock.stopped_tokens().is_empty());

        tokio::time::sleep(Duration::from_secs(5)).await;
        h.assert_quiet();
        assert_eq!(h.engine.snapshot().status, SearchStatus::Idle);
        assert_eq!(h.mock.stopped_tokens(), vec![SearchToken::new("T1")]);
        assert_eq!(h.mock.fetch_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_fetch_leaves_session_idle() {
        let mut h = Harness::new();
        h.mock.set_latency(Duration::from_millis(300));
        h.mock.push_start(ticket("T1", 0));
        h.mock.push_fetch(FetchReply::Prices(vec![offer("p1", 100, Some(1))]));

        h.engine.start(gr());
        assert_eq!(h.next().await.status, SearchStatus::Searching);
        assert_eq!(h.next().await.status, SearchStatus::Polling);

        // The fetch went out as soon as polling began and is still running.
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(h.mock.fetch_calls(), 1);

        assert!(h.engine.cancel().await);
        assert_eq!(h.next().await.status, SearchStatus::Idle);
        assert_eq!(h.mock.stopped_tokens(), vec![SearchToken::new("T1")]);

        tokio::time::sleep(Duration::from_secs(2)).await;
        h.assert_quiet();
        let session = h.engine.snapshot();
        assert_eq!(session.status, SearchStatus::Idle);
        assert!(session.prices.is_none());
        assert!(session.tours.is_none());
        assert_eq!(h.mock.hotel_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_fetch_after_cancel_is_not_retried() {
        let mut h = Harness::new();
        h.mock.set_latency(Duration::from_millis(300));
        h.mock.push_start(ticket("T1", 0));
        h.mock.push_fetch(server_error());

        h.engine.start(gr());
        h.next().await;
        h.next().await;
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(h.engine.cancel().await);
        assert_eq!(h.next().await.status, SearchStatus::Idle);

        tokio::time::sleep(Duration::from_secs(10)).await;
        h.assert_quiet();
        let session = h.engine.snapshot();
        assert_eq!(session.status, SearchStatus::Idle);
        assert_eq!(session.retry_count, 0);
        assert_eq!(h.mock.fetch_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn newer_start_supersedes_older_session() {
        let mut h = Harness::new();
        h.mock.push_start(ticket("T1", 1_000));

        let first = h.engine.start(gr());
        assert_eq!(h.next().await.status, SearchStatus::Searching);
        assert_eq!(h.next().await.status, SearchStatus::Polling);

        let second = h.engine.start(eg());
        assert!(second > first);
        let seen = h.until_settled().await;

        assert!(seen.iter().all(|s| s.generation == second));
        let done = seen.last().unwrap();
        assert_eq!(done.status, SearchStatus::Success);
        assert_eq!(done.country, Some(eg()));
        let tours = done.tours.as_ref().unwrap();
        assert_eq!(tours.len(), 1);
        assert_eq!(tours[0].hotel.name, "Nile View");

        assert_eq!(h.mock.stopped_tokens(), vec![SearchToken::new("T1")]);
        tokio::time::sleep(Duration::from_secs(10)).await;
        h.assert_quiet();
    }

    #[tokio::test(start_paused = true)]
    async fn start_superseding_a_start_request_stops_its_ticket() {
        let mut h = Harness::new();
        h.mock.set_latency(Duration::from_millis(300));
        h.mock.push_start(ticket("T1", 0));

        h.engine.start(gr());
        assert_eq!(h.next().await.status, SearchStatus::Searching);
        tokio::time::sleep(Duration::from_millis(100)).await;

        let second = h.engine.start(eg());
        let seen = h.until_settled().await;

        assert!(seen.iter().all(|s| s.generation == second));
        let done = seen.last().unwrap();
        assert_eq!(done.status, SearchStatus::Success);
        assert_eq!(done.country, Some(eg()));
        assert_eq!(h.mock.start_calls(), 2);
        assert_eq!(h.mock.stopped_tokens(), vec![SearchToken::new("T1")]);
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_during_aggregation_never_reports() {
        let mut h = Harness::new();
        h.mock.set_latency(Duration::from_millis(300));
        h.mock.push_start(ticket("T1", 0));
        h.mock.push_fetch(FetchReply::Prices(vec![offer("p1", 100, Some(1))]));

        let first = h.engine.start(gr());
        assert_eq!(h.next().await.status, SearchStatus::Searching);
        assert_eq!(h.next().await.status, SearchStatus::Polling);

        // Prices arrive after 300ms; the hotel lookup then takes another 300ms.
        tokio::time::sleep(Duration::from_millis(450)).await;
        assert_eq!(h.mock.hotel_calls(), 1);

        let second = h.engine.start(eg());
        assert!(second > first);
        let seen = h.until_settled().await;

        assert!(seen.iter().all(|s| s.generation == second));
        let done = seen.last().unwrap();
        assert_eq!(done.status, SearchStatus::Success);
        let tours = done.tours.as_ref().unwrap();
        assert_eq!(tours.len(), 1);
        assert_eq!(tours[0].hotel.name, "Nile View");
        assert_eq!(h.mock.stopped_tokens(), vec![SearchToken::new("T1")]);

        tokio::time::sleep(Duration::from_secs(10)).await;
        h.assert_quiet();
        assert_eq!(h.engine.snapshot(), *done);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_after_error_resets_retries() {
        let mut h = Harness::new();
        h.mock.push_start(ticket("T1", 0));
        for _ in 0..3 {
            h.mock.push_fetch(server_error());
        }
        h.engine.start(gr());
        assert_eq!(h.until_settled().await.last().unwrap().retry_count, 2);

        h.engine.start(gr());
        let seen = h.until_settled().await;
        assert_eq!(seen[0].retry_count, 0);
        assert!(seen[0].last_error.is_none());
        assert_eq!(seen.last().unwrap().status, SearchStatus::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_subscription_stops_delivery() {
        let h = Harness::new();
        let Harness {
            engine,
            mut rx,
            _sub,
            ..
        } = h;
        drop(_sub);

        engine.start(gr());
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.recv().await.is_none());
        assert_eq!(engine.snapshot().status, SearchStatus::Success);
    }

    #[cfg(debug_assertions)]
    #[tokio::test]
    #[should_panic(expected = "observers must not call back into the engine")]
    async fn observer_calling_back_into_engine_is_caught() {
        let h = Harness::new();
        let engine = h.engine.clone();
        let _sub = h.engine.subscribe(move |_: &SearchSession| {
            engine.snapshot();
        });
        h.engine.start(gr());
    }
}
