//! Notification polling guardrails.
//!
//! The UI drives a fixed-interval tick; this type decides whether a
//! tick may actually hit the network. Two guards: a tick is skipped
//! while a previous fetch is still in flight, and skipped when the
//! minimum interval has not elapsed (which also protects against the
//! timer being re-initialized and firing too often). A failed fetch is
//! swallowed so polling never disturbs the rest of the app.

use log::debug;
use shared::Notification;
use std::cell::Cell;
use std::time::{Duration, Instant};

use crate::api::client::ApiError;

/// Default tick interval: 30 seconds.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Hard floor on the effective interval.
const MIN_POLL_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// A previous tick is still running.
    SkippedInFlight,
    /// The minimum interval has not elapsed yet.
    SkippedTooSoon,
    /// Fetch ran and failed; the error was swallowed.
    Failed,
    Fetched(usize),
}

pub struct NotificationPoller {
    min_interval: Duration,
    in_flight: Cell<bool>,
    last_poll: Cell<Option<Instant>>,
}

impl NotificationPoller {
    pub fn new(configured_interval: Duration) -> Self {
        Self {
            min_interval: configured_interval.max(MIN_POLL_INTERVAL),
            in_flight: Cell::new(false),
            last_poll: Cell::new(None),
        }
    }

    /// Run one tick, fetching through `fetch` if the guards allow it.
    /// On success the fetched notifications are handed to `apply`,
    /// which replaces the stored collection wholesale.
    pub fn poll<F, A>(&self, fetch: F, apply: A) -> PollOutcome
    where
        F: FnOnce() -> Result<Vec<Notification>, ApiError>,
        A: FnOnce(Vec<Notification>),
    {
        self.poll_at(Instant::now(), fetch, apply)
    }

    fn poll_at<F, A>(&self, now: Instant, fetch: F, apply: A) -> PollOutcome
    where
        F: FnOnce() -> Result<Vec<Notification>, ApiError>,
        A: FnOnce(Vec<Notification>),
    {
        if self.in_flight.get() {
            return PollOutcome::SkippedInFlight;
        }
        if let Some(last) = self.last_poll.get() {
            if now.duration_since(last) < self.min_interval {
                return PollOutcome::SkippedTooSoon;
            }
        }

        self.last_poll.set(Some(now));
        self.in_flight.set(true);
        let outcome = match fetch() {
            Ok(notifications) => {
                let count = notifications.len();
                apply(notifications);
                PollOutcome::Fetched(count)
            }
            Err(err) => {
                debug!("Notification poll failed ({err}), will retry next tick");
                PollOutcome::Failed
            }
        };
        self.in_flight.set(false);
        outcome
    }
}
