//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Decorated fetch:
//!     → timer.rs (start mark, stopwatch per call)
//!     → http::middleware::emitter (begin / success / error events)
//!     → http::middleware::logger → tracing events
//!     → logging.rs (subscriber: filter + pretty/JSON output)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Timer sources are swappable so tests can pin durations

pub mod logging;
pub mod timer;

pub use logging::init_logging;
pub use timer::{Mark, MonotonicClock, Stopwatch, SystemClock, TimerSource};
