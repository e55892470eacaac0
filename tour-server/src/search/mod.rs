//! Price search lifecycle.
//!
//! [`SearchEngine`] owns the single active [`SearchSession`]: it starts the
//! backend search, waits until results should be ready, polls, retries
//! transient failures, and hands finished offers to the aggregation step.
//! Observers see every transition of the current session and nothing from
//! sessions that were superseded or cancelled.

mod config;
mod engine;
mod observer;
mod session;
mod task;

pub use config::SearchConfig;
pub use engine::SearchEngine;
pub use observer::{SessionObserver, Subscription};
pub use session::{SearchSession, SearchStatus};
pub use task::ScheduledTask;
