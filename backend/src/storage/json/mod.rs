//! JSON-file storage backend.
//!
//! Local persistence is a handful of small JSON files in a data
//! directory: the session record and one cycle-override store per
//! user. Writes are atomic (temp file + rename).

pub mod connection;
pub mod cycle_override_repository;
pub mod session_repository;

#[cfg(test)]
pub mod test_utils;

pub use connection::JsonConnection;
pub use cycle_override_repository::CycleOverrideRepository;
pub use session_repository::SessionRepository;
