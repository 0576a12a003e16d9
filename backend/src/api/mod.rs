//! Remote API surface: call envelope, transport abstraction,
//! notification polling and submission guards.

pub mod client;
pub mod guard;
pub mod poller;

pub use client::{ApiClient, ApiError, ApiOutcome, ApiRequest, ApiResponse, RemoteTransport};
pub use guard::SubmitGuard;
pub use poller::{NotificationPoller, PollOutcome, DEFAULT_POLL_INTERVAL};
