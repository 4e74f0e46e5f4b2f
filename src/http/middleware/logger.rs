//! Fetch logging.
//!
//! Builds on [`Emitter`]: every lifecycle event is forwarded to a log function
//! as `(message, event)`. The notification channel stays private to the layer.
//! A log function that panics is not guarded.

use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};

use tower::{Layer, Service};

use crate::http::middleware::emitter::{Emitter, EmitterLayer, FetchEvent, FetchEventKind};
use crate::http::request::FetchRequest;
use crate::observability::timer::{SystemClock, TimerSource};

pub const BEGIN_MESSAGE: &str = "beginning fetch";
pub const SUCCESS_MESSAGE: &str = "fetch succeeded";
pub const ERROR_MESSAGE: &str = "fetch errored";

/// Log function receiving a message and the event that produced it.
pub type LogFn<R, E> = Arc<dyn Fn(&str, &FetchEvent<'_, R, E>) + Send + Sync>;

fn message_for(kind: FetchEventKind) -> &'static str {
    match kind {
        FetchEventKind::Begin => BEGIN_MESSAGE,
        FetchEventKind::Success => SUCCESS_MESSAGE,
        FetchEventKind::Error => ERROR_MESSAGE,
    }
}

/// Log function writing `tracing` events.
///
/// Begin and success are logged at `INFO`, errors at `WARN`.
pub fn tracing_log<R, E: fmt::Display>(message: &str, event: &FetchEvent<'_, R, E>) {
    let request = event.request();
    match event {
        FetchEvent::Begin(begin) => tracing::info!(
            method = %request.method(),
            url = %request.url_str(),
            start_ms = begin.start.as_millis() as u64,
            "{}", message
        ),
        FetchEvent::Success(success) => tracing::info!(
            method = %request.method(),
            url = %request.url_str(),
            start_ms = success.start.as_millis() as u64,
            end_ms = success.end.as_millis() as u64,
            duration_ms = success.duration.as_secs_f64() * 1000.0,
            "{}", message
        ),
        FetchEvent::Error(failure) => tracing::warn!(
            method = %request.method(),
            url = %request.url_str(),
            start_ms = failure.start.as_millis() as u64,
            end_ms = failure.end.as_millis() as u64,
            duration_ms = failure.duration.as_secs_f64() * 1000.0,
            error = %failure.error,
            "{}", message
        ),
    }
}

/// Layer producing [`Logger`] services.
pub struct LoggerLayer<R, E> {
    log: LogFn<R, E>,
    timer: Arc<dyn TimerSource>,
}

impl<R, E> LoggerLayer<R, E> {
    pub fn new<F>(log: F) -> Self
    where
        F: Fn(&str, &FetchEvent<'_, R, E>) + Send + Sync + 'static,
    {
        Self {
            log: Arc::new(log),
            timer: Arc::new(SystemClock),
        }
    }

    /// Logger writing through [`tracing_log`].
    pub fn tracing() -> Self
    where
        R: 'static,
        E: fmt::Display + 'static,
    {
        Self::new(tracing_log::<R, E>)
    }

    pub fn with_timer<T: TimerSource>(self, timer: T) -> Self {
        self.with_shared_timer(Arc::new(timer))
    }

    pub fn with_shared_timer(mut self, timer: Arc<dyn TimerSource>) -> Self {
        self.timer = timer;
        self
    }
}

impl<R, E> Clone for LoggerLayer<R, E> {
    fn clone(&self) -> Self {
        Self {
            log: self.log.clone(),
            timer: self.timer.clone(),
        }
    }
}

impl<R, E> fmt::Debug for LoggerLayer<R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerLayer").finish_non_exhaustive()
    }
}

impl<S, R, E> Layer<S> for LoggerLayer<R, E>
where
    S: Service<FetchRequest, Response = R, Error = E>,
    R: 'static,
    E: 'static,
{
    type Service = Logger<S>;

    fn layer(&self, inner: S) -> Self::Service {
        let (service, emitter) = EmitterLayer::new()
            .with_shared_timer(self.timer.clone())
            .layer_with_emitter(inner);

        for kind in FetchEventKind::ALL {
            let log = self.log.clone();
            emitter.on(kind, move |event| log(message_for(kind), event));
        }

        Logger { inner: service }
    }
}

/// Service logging the lifecycle of every call.
pub struct Logger<S>
where
    S: Service<FetchRequest>,
{
    inner: Emitter<S>,
}

impl<S> Clone for Logger<S>
where
    S: Service<FetchRequest> + Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S> fmt::Debug for Logger<S>
where
    S: Service<FetchRequest> + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger").field("inner", &self.inner).finish()
    }
}

impl<S> Service<FetchRequest> for Logger<S>
where
    S: Service<FetchRequest>,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    S::Error: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = <Emitter<S> as Service<FetchRequest>>::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: FetchRequest) -> Self::Future {
        self.inner.call(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tower::{service_fn, ServiceExt};

    type Calls = Arc<Mutex<Vec<(String, FetchEventKind, String)>>>;

    fn recording_layer() -> (LoggerLayer<u16, String>, Calls) {
        let calls: Calls = Arc::new(Mutex::new(Vec::new()));
        let sink = calls.clone();
        let layer = LoggerLayer::new(move |message: &str, event: &FetchEvent<'_, u16, String>| {
            sink.lock().unwrap().push((
                message.to_string(),
                event.kind(),
                event.request().url_str().to_string(),
            ));
        });
        (layer, calls)
    }

    #[tokio::test]
    async fn test_successful_round_trip_logs_twice() {
        let (layer, calls) = recording_layer();
        let service = layer.layer(service_fn(|_req: FetchRequest| async move { Ok::<u16, String>(200) }));

        let status = service.oneshot(FetchRequest::url("http://a")).await.unwrap();

        assert_eq!(status, 200);
        assert_eq!(
            *calls.lock().unwrap(),
            [
                ("beginning fetch".to_string(), FetchEventKind::Begin, "http://a".to_string()),
                ("fetch succeeded".to_string(), FetchEventKind::Success, "http://a".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_failing_round_trip_logs_error() {
        let (layer, calls) = recording_layer();
        let service = layer.layer(service_fn(|_req: FetchRequest| async move {
            Err::<u16, String>("refused".to_string())
        }));

        let error = service.oneshot(FetchRequest::url("http://b")).await.unwrap_err();

        assert_eq!(error, "refused");
        let messages: Vec<_> = calls.lock().unwrap().iter().map(|c| c.0.clone()).collect();
        assert_eq!(messages, ["beginning fetch", "fetch errored"]);
    }

    #[tokio::test]
    async fn test_clones_share_log_function() {
        let (layer, calls) = recording_layer();
        let service = layer.layer(service_fn(|_req: FetchRequest| async move { Ok::<u16, String>(204) }));

        service.clone().oneshot(FetchRequest::url("http://c")).await.unwrap();
        service.oneshot(FetchRequest::url("http://d")).await.unwrap();

        assert_eq!(calls.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_tracing_log_accepts_every_event() {
        let service = LoggerLayer::<u16, String>::tracing().layer(service_fn(|req: FetchRequest| async move {
            if req.url_str().ends_with("fail") {
                Err("nope".to_string())
            } else {
                Ok(200u16)
            }
        }));

        assert!(service.clone().oneshot(FetchRequest::url("http://ok")).await.is_ok());
        assert!(service.oneshot(FetchRequest::url("http://fail")).await.is_err());
    }
}
