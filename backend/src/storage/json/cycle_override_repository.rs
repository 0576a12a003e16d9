//! JSON-file store for per-user billing cycle overrides.
//!
//! One file per signed-in user, `card_cycles_v2_<email>.json`, holding
//! the full `card id -> month -> {close, due}` mapping. The store is
//! independent of the remote spreadsheet: overrides are a local,
//! per-device refinement.

use anyhow::Result;
use log::{debug, warn};

use crate::storage::json::connection::JsonConnection;
use crate::storage::traits::{CycleOverrideMap, CycleOverrideStorage};

#[derive(Debug, Clone)]
pub struct CycleOverrideRepository {
    connection: JsonConnection,
}

impl CycleOverrideRepository {
    pub fn new(connection: JsonConnection) -> Self {
        Self { connection }
    }

    /// One store file per user. Emails are lowercased and filesystem-
    /// hostile characters replaced so the name is always valid.
    fn file_name(user_email: &str) -> String {
        let slug: String = user_email
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        let slug = if slug.is_empty() { "anon".to_string() } else { slug };
        format!("card_cycles_v2_{slug}.json")
    }
}

impl CycleOverrideStorage for CycleOverrideRepository {
    /// A missing file is an empty map; a corrupt file is logged and
    /// also read as empty. The corrupt content is left on disk rather
    /// than auto-repaired, so the user's data is not silently masked.
    fn get_overrides(&self, user_email: &str) -> Result<CycleOverrideMap> {
        let path = self.connection.store_path(&Self::file_name(user_email));
        if !path.exists() {
            return Ok(CycleOverrideMap::default());
        }

        let raw = std::fs::read_to_string(&path)?;
        match serde_json::from_str(&raw) {
            Ok(map) => {
                debug!("Loaded cycle overrides from {:?}", path);
                Ok(map)
            }
            Err(err) => {
                warn!("Cycle override store {:?} is corrupt ({err}), treating as empty", path);
                Ok(CycleOverrideMap::default())
            }
        }
    }

    fn save_overrides(&self, user_email: &str, overrides: &CycleOverrideMap) -> Result<()> {
        let file_name = Self::file_name(user_email);
        let json = serde_json::to_string_pretty(overrides)?;
        self.connection.write_atomic(&file_name, &json)?;
        debug!("Saved {} card override entries to {file_name}", overrides.len());
        Ok(())
    }
}
