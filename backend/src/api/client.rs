//! Remote data API client.
//!
//! The backend is a spreadsheet behind a key-value request/response
//! endpoint. The transport itself is abstracted behind
//! [`RemoteTransport`]; this module owns the call envelope (action,
//! flat params, per-call correlation token), implicit user-email
//! scoping and the read/create/update/delete verbs.
//!
//! Failure contract: a transport-level failure (unreachable, timeout)
//! is an [`ApiError`] and always surfaces to the caller. A server-side
//! rejection is data: `success: false` plus a human-readable message.
//! Rejected reads degrade to an empty row list, matching how every
//! screen treats "nothing came back".

use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

/// Marker param: set to `"true"` to bypass the implicit user-email
/// scoping for one call. Needed when reading the shared-expense table,
/// which spans both partners.
pub const SKIP_USER_EMAIL: &str = "__skipUserEmail";

/// Actions that must never be user-scoped (nobody is signed in yet).
const UNSCOPED_ACTIONS: [&str; 2] = ["login", "register"];

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("error de conexión con el servidor: {0}")]
    Transport(String),
}

/// One outbound call. Params are flat string key-values; empty values
/// are dropped before the call, and unknown keys are ignored by the
/// server by convention.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub action: String,
    pub params: BTreeMap<String, String>,
    /// Random per-call token so concurrent calls cannot cross-resolve.
    pub correlation_token: String,
    pub timestamp_ms: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    /// Row payload for read calls.
    #[serde(rename = "datos", default)]
    pub rows: Option<serde_json::Value>,
}

impl ApiResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    pub fn rejected(message: &str) -> Self {
        Self {
            success: false,
            message: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn with_rows(rows: serde_json::Value) -> Self {
        Self {
            success: true,
            rows: Some(rows),
            ..Self::default()
        }
    }
}

/// Result of a mutation call.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiOutcome {
    pub success: bool,
    pub message: Option<String>,
    pub id: Option<String>,
}

impl From<ApiResponse> for ApiOutcome {
    fn from(response: ApiResponse) -> Self {
        Self {
            success: response.success,
            message: response.message,
            id: response.id,
        }
    }
}

pub trait RemoteTransport: Send + Sync {
    fn call(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError>;
}

pub struct ApiClient<T: RemoteTransport> {
    pub(crate) transport: T,
    user_email: Option<String>,
}

impl<T: RemoteTransport> ApiClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            user_email: None,
        }
    }

    /// Set (or clear) the signed-in user whose email scopes calls.
    pub fn set_user(&mut self, email: Option<String>) {
        self.user_email = email;
    }

    /// Low-level call: builds the envelope, applies user scoping and
    /// drops empty params.
    pub fn call(
        &self,
        action: &str,
        mut params: BTreeMap<String, String>,
    ) -> Result<ApiResponse, ApiError> {
        let skip_scoping = matches!(
            params.remove(SKIP_USER_EMAIL).as_deref(),
            Some("true") | Some("TRUE") | Some("True")
        );

        if !skip_scoping && !UNSCOPED_ACTIONS.contains(&action) {
            if let Some(email) = &self.user_email {
                params
                    .entry("userEmail".to_string())
                    .or_insert_with(|| email.clone());
            }
        }

        params.retain(|_, v| !v.is_empty());

        let request = ApiRequest {
            action: action.to_string(),
            params,
            correlation_token: format!("cb_{}", Uuid::new_v4().simple()),
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
        };
        debug!("API call {} ({} params)", request.action, request.params.len());
        self.transport.call(&request)
    }

    /// Read rows from a table. The shared-expense table always skips
    /// user scoping: its rows span two users and are filtered
    /// client-side by the reconciler.
    pub fn read<R: DeserializeOwned>(
        &self,
        table: &str,
        mut filters: BTreeMap<String, String>,
    ) -> Result<Vec<R>, ApiError> {
        if table == "gastos_compartidos" {
            filters
                .entry(SKIP_USER_EMAIL.to_string())
                .or_insert_with(|| "true".to_string());
        }
        filters.insert("tabla".to_string(), table.to_string());

        let response = self.call("leer", filters)?;
        if !response.success {
            warn!(
                "Read of '{table}' rejected: {}",
                response.message.as_deref().unwrap_or("sin mensaje")
            );
            return Ok(Vec::new());
        }

        let rows = response.rows.unwrap_or(serde_json::Value::Array(Vec::new()));
        match serde_json::from_value(rows) {
            Ok(parsed) => Ok(parsed),
            Err(err) => {
                warn!("Rows of '{table}' are malformed ({err}), treating as empty");
                Ok(Vec::new())
            }
        }
    }

    pub fn create(
        &self,
        table: &str,
        mut fields: BTreeMap<String, String>,
    ) -> Result<ApiOutcome, ApiError> {
        fields.insert("tabla".to_string(), table.to_string());
        Ok(self.call("crear", fields)?.into())
    }

    pub fn update(
        &self,
        table: &str,
        id: &str,
        mut fields: BTreeMap<String, String>,
    ) -> Result<ApiOutcome, ApiError> {
        fields.insert("tabla".to_string(), table.to_string());
        fields.insert("id".to_string(), id.to_string());
        Ok(self.call("actualizar", fields)?.into())
    }

    pub fn delete(&self, table: &str, id: &str) -> Result<ApiOutcome, ApiError> {
        let mut fields = BTreeMap::new();
        fields.insert("tabla".to_string(), table.to_string());
        fields.insert("id".to_string(), id.to_string());
        Ok(self.call("eliminar", fields)?.into())
    }

    /// Unread notifications for the signed-in user.
    pub fn read_notifications(&self) -> Result<Vec<shared::Notification>, ApiError> {
        let mut filters = BTreeMap::new();
        filters.insert("unread".to_string(), "true".to_string());
        self.read("notificaciones", filters)
    }
}
