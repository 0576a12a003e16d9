//! Storage abstraction traits.
//!
//! Domain services talk to these traits, not to concrete files, so the
//! local persistence format can change without touching the cycle
//! resolver or the session handling.

use anyhow::Result;
use shared::{CycleOverride, UserProfile};
use std::collections::{BTreeMap, HashMap};

/// `card id -> "YYYY-MM" -> override`. The inner map is ordered so
/// listings come out chronologically.
pub type CycleOverrideMap = HashMap<String, BTreeMap<String, CycleOverride>>;

/// Per-user close/due overrides, namespaced by the signed-in email.
///
/// A missing or corrupt store must read as empty, never as an error:
/// the worst case for the caller is "no overrides".
pub trait CycleOverrideStorage: Send + Sync {
    fn get_overrides(&self, user_email: &str) -> Result<CycleOverrideMap>;

    fn save_overrides(&self, user_email: &str, overrides: &CycleOverrideMap) -> Result<()>;
}

/// The locally persisted session record, read on startup and cleared
/// on logout.
pub trait SessionStorage: Send + Sync {
    /// `None` when nobody is signed in or the file is unreadable.
    fn load_session(&self) -> Result<Option<UserProfile>>;

    fn store_session(&self, user: &UserProfile) -> Result<()>;

    fn clear_session(&self) -> Result<()>;
}
