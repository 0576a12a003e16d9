//! Local session persistence (`session.json`).
//!
//! The profile of the signed-in user is written after login so the app
//! can restore the session on the next start, and removed on logout.

use anyhow::Result;
use log::{info, warn};
use shared::UserProfile;

use crate::storage::json::connection::JsonConnection;
use crate::storage::traits::SessionStorage;

const SESSION_FILE: &str = "session.json";

#[derive(Debug, Clone)]
pub struct SessionRepository {
    connection: JsonConnection,
}

impl SessionRepository {
    pub fn new(connection: JsonConnection) -> Self {
        Self { connection }
    }
}

impl SessionStorage for SessionRepository {
    fn load_session(&self) -> Result<Option<UserProfile>> {
        let path = self.connection.store_path(SESSION_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&path)?;
        match serde_json::from_str::<UserProfile>(&raw) {
            Ok(user) => Ok(Some(user)),
            Err(err) => {
                warn!("Session file is corrupt ({err}), starting signed out");
                Ok(None)
            }
        }
    }

    fn store_session(&self, user: &UserProfile) -> Result<()> {
        let json = serde_json::to_string_pretty(user)?;
        self.connection.write_atomic(SESSION_FILE, &json)?;
        info!("Stored session for {}", user.email);
        Ok(())
    }

    fn clear_session(&self) -> Result<()> {
        let path = self.connection.store_path(SESSION_FILE);
        if path.exists() {
            std::fs::remove_file(&path)?;
            info!("Cleared stored session");
        }
        Ok(())
    }
}
