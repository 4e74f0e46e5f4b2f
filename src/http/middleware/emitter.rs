//! Fetch lifecycle events.
//!
//! # Responsibilities
//! - Time every call through the wrapped service
//! - Publish `begin` before the call and `success`/`error` once it settles
//! - Hand the inner outcome back untouched
//!
//! # Design Decisions
//! - `begin` is published inside `Service::call`, before the future is polled
//! - The subscriber list is snapshotted when a call begins; that call's events go
//!   to exactly those subscribers, in registration order
//! - Events borrow the request and outcome, so nothing needs to be `Clone`
//! - Elapsed time comes from the stopwatch once and is reused for the event

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use arc_swap::ArcSwap;
use futures_util::future::BoxFuture;
use tower::{Layer, Service};

use crate::http::request::FetchRequest;
use crate::observability::timer::{Mark, SystemClock, TimerSource};

/// Kind of a lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchEventKind {
    Begin,
    Success,
    Error,
}

impl FetchEventKind {
    pub const ALL: [FetchEventKind; 3] = [
        FetchEventKind::Begin,
        FetchEventKind::Success,
        FetchEventKind::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FetchEventKind::Begin => "request.begin",
            FetchEventKind::Success => "request.success",
            FetchEventKind::Error => "request.error",
        }
    }
}

impl fmt::Display for FetchEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Published before the wrapped call starts.
#[derive(Debug)]
pub struct BeginEvent<'a> {
    pub start: Mark,
    pub request: &'a FetchRequest,
}

/// Published when the wrapped call resolves.
#[derive(Debug)]
pub struct SuccessEvent<'a, R> {
    pub start: Mark,
    pub end: Mark,
    pub duration: Duration,
    pub request: &'a FetchRequest,
    pub response: &'a R,
}

/// Published when the wrapped call fails.
#[derive(Debug)]
pub struct ErrorEvent<'a, E> {
    pub start: Mark,
    pub end: Mark,
    pub duration: Duration,
    pub request: &'a FetchRequest,
    pub error: &'a E,
}

#[derive(Debug)]
pub enum FetchEvent<'a, R, E> {
    Begin(BeginEvent<'a>),
    Success(SuccessEvent<'a, R>),
    Error(ErrorEvent<'a, E>),
}

impl<R, E> FetchEvent<'_, R, E> {
    pub fn kind(&self) -> FetchEventKind {
        match self {
            FetchEvent::Begin(_) => FetchEventKind::Begin,
            FetchEvent::Success(_) => FetchEventKind::Success,
            FetchEvent::Error(_) => FetchEventKind::Error,
        }
    }

    pub fn request(&self) -> &FetchRequest {
        match self {
            FetchEvent::Begin(event) => event.request,
            FetchEvent::Success(event) => event.request,
            FetchEvent::Error(event) => event.request,
        }
    }

    pub fn start(&self) -> Mark {
        match self {
            FetchEvent::Begin(event) => event.start,
            FetchEvent::Success(event) => event.start,
            FetchEvent::Error(event) => event.start,
        }
    }

    /// Elapsed time, once the call has settled.
    pub fn duration(&self) -> Option<Duration> {
        match self {
            FetchEvent::Begin(_) => None,
            FetchEvent::Success(event) => Some(event.duration),
            FetchEvent::Error(event) => Some(event.duration),
        }
    }
}

/// Handle returned by [`FetchEmitter::on`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback<R, E> = Arc<dyn Fn(&FetchEvent<'_, R, E>) + Send + Sync>;

struct Subscriber<R, E> {
    id: SubscriptionId,
    kind: FetchEventKind,
    callback: Callback<R, E>,
}

impl<R, E> Clone for Subscriber<R, E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            kind: self.kind,
            callback: self.callback.clone(),
        }
    }
}

type Subscribers<R, E> = Arc<Vec<Subscriber<R, E>>>;

/// Notification channel of one decorated service.
///
/// Clones share the same subscriber list.
pub struct FetchEmitter<R, E> {
    subscribers: Arc<ArcSwap<Vec<Subscriber<R, E>>>>,
    next_id: Arc<AtomicU64>,
}

impl<R, E> FetchEmitter<R, E> {
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(ArcSwap::from_pointee(Vec::new())),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Register `callback` for every event of `kind`.
    pub fn on<F>(&self, kind: FetchEventKind, callback: F) -> SubscriptionId
    where
        F: Fn(&FetchEvent<'_, R, E>) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let callback: Callback<R, E> = Arc::new(callback);
        self.subscribers.rcu(|current| {
            let mut next = Vec::clone(current);
            next.push(Subscriber {
                id,
                kind,
                callback: callback.clone(),
            });
            next
        });
        id
    }

    pub fn on_begin<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&BeginEvent<'_>) + Send + Sync + 'static,
    {
        self.on(FetchEventKind::Begin, move |event| {
            if let FetchEvent::Begin(begin) = event {
                callback(begin);
            }
        })
    }

    pub fn on_success<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&SuccessEvent<'_, R>) + Send + Sync + 'static,
    {
        self.on(FetchEventKind::Success, move |event| {
            if let FetchEvent::Success(success) = event {
                callback(success);
            }
        })
    }

    pub fn on_error<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&ErrorEvent<'_, E>) + Send + Sync + 'static,
    {
        self.on(FetchEventKind::Error, move |event| {
            if let FetchEvent::Error(error) = event {
                callback(error);
            }
        })
    }

    /// Remove a subscription. Returns `false` if it was already gone.
    ///
    /// Calls that already began keep delivering to it.
    pub fn off(&self, id: SubscriptionId) -> bool {
        let mut removed = false;
        self.subscribers.rcu(|current| {
            let next: Vec<_> = current.iter().filter(|s| s.id != id).cloned().collect();
            removed = next.len() != current.len();
            next
        });
        removed
    }

    pub fn subscriber_count(&self, kind: FetchEventKind) -> usize {
        self.subscribers
            .load()
            .iter()
            .filter(|s| s.kind == kind)
            .count()
    }

    fn snapshot(&self) -> Subscribers<R, E> {
        self.subscribers.load_full()
    }
}

fn dispatch<R, E>(subscribers: &[Subscriber<R, E>], event: &FetchEvent<'_, R, E>) {
    let kind = event.kind();
    for subscriber in subscribers.iter().filter(|s| s.kind == kind) {
        (subscriber.callback)(event);
    }
}

impl<R, E> Clone for FetchEmitter<R, E> {
    fn clone(&self) -> Self {
        Self {
            subscribers: self.subscribers.clone(),
            next_id: self.next_id.clone(),
        }
    }
}

impl<R, E> Default for FetchEmitter<R, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R, E> fmt::Debug for FetchEmitter<R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchEmitter")
            .field("subscribers", &self.subscribers.load().len())
            .finish()
    }
}

/// Layer producing [`Emitter`] services.
#[derive(Clone)]
pub struct EmitterLayer {
    timer: Arc<dyn TimerSource>,
}

impl EmitterLayer {
    /// Emitter timed by the wall clock.
    pub fn new() -> Self {
        Self {
            timer: Arc::new(SystemClock),
        }
    }

    pub fn with_timer<T: TimerSource>(self, timer: T) -> Self {
        self.with_shared_timer(Arc::new(timer))
    }

    pub fn with_shared_timer(mut self, timer: Arc<dyn TimerSource>) -> Self {
        self.timer = timer;
        self
    }

    /// Wrap `inner`, returning the service together with its channel.
    pub fn layer_with_emitter<S>(&self, inner: S) -> (Emitter<S>, FetchEmitter<S::Response, S::Error>)
    where
        S: Service<FetchRequest>,
    {
        let service = Emitter::new(inner, self.timer.clone());
        let emitter = service.emitter().clone();
        (service, emitter)
    }
}

impl Default for EmitterLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EmitterLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmitterLayer").finish_non_exhaustive()
    }
}

impl<S> Layer<S> for EmitterLayer
where
    S: Service<FetchRequest>,
{
    type Service = Emitter<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Emitter::new(inner, self.timer.clone())
    }
}

/// Service publishing lifecycle events for every call.
pub struct Emitter<S>
where
    S: Service<FetchRequest>,
{
    inner: S,
    timer: Arc<dyn TimerSource>,
    emitter: FetchEmitter<S::Response, S::Error>,
}

impl<S> Emitter<S>
where
    S: Service<FetchRequest>,
{
    pub fn new(inner: S, timer: Arc<dyn TimerSource>) -> Self {
        Self {
            inner,
            timer,
            emitter: FetchEmitter::new(),
        }
    }

    pub fn emitter(&self) -> &FetchEmitter<S::Response, S::Error> {
        &self.emitter
    }
}

impl<S> Clone for Emitter<S>
where
    S: Service<FetchRequest> + Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            timer: self.timer.clone(),
            emitter: self.emitter.clone(),
        }
    }
}

impl<S> fmt::Debug for Emitter<S>
where
    S: Service<FetchRequest> + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("inner", &self.inner)
            .field("emitter", &self.emitter)
            .finish_non_exhaustive()
    }
}

impl<S> Service<FetchRequest> for Emitter<S>
where
    S: Service<FetchRequest>,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    S::Error: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<S::Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: FetchRequest) -> Self::Future {
        let (start, stopwatch) = self.timer.start();
        let subscribers = self.emitter.snapshot();

        dispatch(
            &subscribers,
            &FetchEvent::Begin(BeginEvent {
                start,
                request: &request,
            }),
        );

        let future = self.inner.call(request.clone());

        Box::pin(async move {
            let result = future.await;
            let (end, duration) = stopwatch.stop();

            let event = match &result {
                Ok(response) => FetchEvent::Success(SuccessEvent {
                    start,
                    end,
                    duration,
                    request: &request,
                    response,
                }),
                Err(error) => FetchEvent::Error(ErrorEvent {
                    start,
                    end,
                    duration,
                    request: &request,
                    error,
                }),
            };
            dispatch(&subscribers, &event);

            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::timer::Stopwatch;
    use std::sync::Mutex;
    use tower::{service_fn, ServiceExt};

    fn fixed_timer() -> impl TimerSource {
        || {
            (
                Duration::ZERO,
                Stopwatch::new(|| (Duration::from_millis(100), Duration::from_millis(100))),
            )
        }
    }

    fn record(emitter: &FetchEmitter<String, String>) -> Arc<Mutex<Vec<String>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        for kind in FetchEventKind::ALL {
            let log = log.clone();
            emitter.on(kind, move |event| {
                log.lock()
                    .unwrap()
                    .push(format!("{} {}", event.kind(), event.request().url_str()));
            });
        }
        log
    }

    #[tokio::test]
    async fn test_success_is_preceded_by_begin() {
        let inner = service_fn(|req: FetchRequest| async move {
            Ok::<_, String>(format!("ok {}", req.url_str()))
        });
        let (service, emitter) = EmitterLayer::new().layer_with_emitter(inner);
        let log = record(&emitter);

        let response = service.oneshot(FetchRequest::url("http://a")).await.unwrap();

        assert_eq!(response, "ok http://a");
        assert_eq!(
            *log.lock().unwrap(),
            ["request.begin http://a", "request.success http://a"]
        );
    }

    #[tokio::test]
    async fn test_error_is_preceded_by_begin_and_passed_through() {
        let inner = service_fn(|_req: FetchRequest| async move { Err::<String, _>("boom".to_string()) });
        let (service, emitter) = EmitterLayer::new().layer_with_emitter(inner);
        let log = record(&emitter);

        let error = service.oneshot(FetchRequest::url("http://b")).await.unwrap_err();

        assert_eq!(error, "boom");
        assert_eq!(
            *log.lock().unwrap(),
            ["request.begin http://b", "request.error http://b"]
        );
    }

    #[tokio::test]
    async fn test_duration_comes_from_timer_source() {
        let inner = service_fn(|_req: FetchRequest| async move { Ok::<_, String>(String::new()) });
        let (service, emitter) = EmitterLayer::new()
            .with_timer(fixed_timer())
            .layer_with_emitter(inner);

        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        emitter.on_success(move |event| {
            *sink.lock().unwrap() = Some((event.start, event.end, event.duration));
        });

        service.oneshot(FetchRequest::url("http://c")).await.unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            Some((
                Duration::ZERO,
                Duration::from_millis(100),
                Duration::from_millis(100)
            ))
        );
    }

    #[tokio::test]
    async fn test_response_is_returned_by_identity() {
        let shared: Arc<str> = Arc::from("body");
        let returned = shared.clone();
        let inner = service_fn(move |_req: FetchRequest| {
            let returned = returned.clone();
            async move { Ok::<_, String>(returned) }
        });
        let (service, emitter) = EmitterLayer::new().layer_with_emitter(inner);

        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        emitter.on_success(move |event| {
            *sink.lock().unwrap() = Some(event.response.clone());
        });

        let response = service.oneshot(FetchRequest::url("http://d")).await.unwrap();

        assert!(Arc::ptr_eq(&response, &shared));
        assert!(Arc::ptr_eq(seen.lock().unwrap().as_ref().unwrap(), &shared));
    }

    #[tokio::test]
    async fn test_begin_fires_before_future_is_polled() {
        let inner = service_fn(|_req: FetchRequest| async move { Ok::<_, String>(String::new()) });
        let (mut service, emitter) = EmitterLayer::new().layer_with_emitter(inner);
        let log = record(&emitter);

        let future = service
            .ready()
            .await
            .unwrap()
            .call(FetchRequest::url("http://e"));
        assert_eq!(*log.lock().unwrap(), ["request.begin http://e"]);

        future.await.unwrap();
        assert_eq!(log.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_late_subscriber_misses_call_in_flight() {
        let inner = service_fn(|_req: FetchRequest| async move { Ok::<_, String>(String::new()) });
        let (mut service, emitter) = EmitterLayer::new().layer_with_emitter(inner);

        let future = service
            .ready()
            .await
            .unwrap()
            .call(FetchRequest::url("http://f"));

        let log = record(&emitter);
        future.await.unwrap();
        assert!(log.lock().unwrap().is_empty());

        service.oneshot(FetchRequest::url("http://g")).await.unwrap();
        assert_eq!(log.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_subscribers_run_in_registration_order() {
        let inner = service_fn(|_req: FetchRequest| async move { Ok::<_, String>(String::new()) });
        let (service, emitter) = EmitterLayer::new().layer_with_emitter(inner);

        let order = Arc::new(Mutex::new(Vec::new()));
        for n in 0..3 {
            let order = order.clone();
            emitter.on_begin(move |_| order.lock().unwrap().push(n));
        }

        service.oneshot(FetchRequest::url("http://h")).await.unwrap();
        assert_eq!(*order.lock().unwrap(), [0, 1, 2]);
    }

    #[tokio::test]
    async fn test_off_removes_subscription() {
        let inner = service_fn(|_req: FetchRequest| async move { Ok::<_, String>(String::new()) });
        let (service, emitter) = EmitterLayer::new().layer_with_emitter(inner);

        let hits = Arc::new(AtomicU64::new(0));
        let counter = hits.clone();
        let id = emitter.on_begin(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(emitter.subscriber_count(FetchEventKind::Begin), 1);

        assert!(emitter.off(id));
        assert!(!emitter.off(id));
        assert_eq!(emitter.subscriber_count(FetchEventKind::Begin), 0);

        service.oneshot(FetchRequest::url("http://i")).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_concurrent_calls_keep_their_own_ordering() {
        let inner = service_fn(|req: FetchRequest| async move {
            let delay = if req.url_str() == "http://slow" { 30 } else { 1 };
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok::<_, String>(req.url_str().to_string())
        });
        let (service, emitter) = EmitterLayer::new()
            .with_timer(crate::observability::timer::MonotonicClock::new())
            .layer_with_emitter(inner);
        let log = record(&emitter);

        let (slow, fast) = tokio::join!(
            service.clone().oneshot(FetchRequest::url("http://slow")),
            service.clone().oneshot(FetchRequest::url("http://fast")),
        );
        assert_eq!(slow.unwrap(), "http://slow");
        assert_eq!(fast.unwrap(), "http://fast");

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 4);
        for url in ["http://slow", "http://fast"] {
            let begin = log.iter().position(|l| *l == format!("request.begin {url}"));
            let success = log.iter().position(|l| *l == format!("request.success {url}"));
            assert!(begin.unwrap() < success.unwrap());
        }
    }
}
