//! Core of a personal and couple finance tracker.
//!
//! The remote store keeps the account data (incomes, expenses, shared
//! expenses, cards, notifications); this crate owns everything the
//! screens need on top of it: amount and date normalization, billing
//! cycle resolution with per-card overrides, installment expansion,
//! shared-expense reconciliation, projections and the dashboard
//! rollup. Local persistence covers only the session record and the
//! cycle overrides.

use anyhow::Result;
use log::{info, warn};
use shared::{Card, Expense, Income, Notification, SharedExpense, UserProfile};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

pub mod api;
pub mod domain;
pub mod storage;

use api::client::{ApiClient, RemoteTransport};
use api::poller::{NotificationPoller, DEFAULT_POLL_INTERVAL};
use domain::{
    BillingCycleService, DashboardService, ExpenseService, InstallmentService, ProjectionService,
};
use storage::json::{CycleOverrideRepository, SessionRepository};
use storage::traits::SessionStorage;
use storage::JsonConnection;

/// In-memory snapshot of the remote collections. Reloads replace a
/// collection wholesale; nothing merges row-by-row.
#[derive(Debug, Clone, Default)]
pub struct AppData {
    pub incomes: Vec<Income>,
    pub expenses: Vec<Expense>,
    pub shared_expenses: Vec<SharedExpense>,
    pub cards: Vec<Card>,
    pub notifications: Vec<Notification>,
}

/// Result of a full reload. Sources that could not be reached keep
/// their empty default and are listed in `failed_sources`, so one bad
/// table never blanks the whole app.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub data: AppData,
    pub failed_sources: Vec<String>,
}

impl LoadReport {
    pub fn complete(&self) -> bool {
        self.failed_sources.is_empty()
    }
}

/// Service container for one signed-in user.
pub struct Backend<T: RemoteTransport> {
    pub client: Arc<ApiClient<T>>,
    pub session_repository: SessionRepository,
    pub cycle_service: BillingCycleService,
    pub installment_service: InstallmentService,
    pub projection_service: ProjectionService,
    pub dashboard_service: DashboardService,
    pub expense_service: ExpenseService<T>,
    pub notification_poller: NotificationPoller,
    pub user: UserProfile,
}

impl<T: RemoteTransport> Backend<T> {
    /// Read the locally stored session, if any. Called on startup
    /// before any backend exists.
    pub fn stored_session(base_directory: impl AsRef<Path>) -> Result<Option<UserProfile>> {
        let connection = JsonConnection::new(base_directory)?;
        SessionRepository::new(connection).load_session()
    }

    /// Build the service graph for a signed-in user and persist the
    /// session record.
    pub fn sign_in(
        base_directory: impl AsRef<Path>,
        transport: T,
        user: UserProfile,
        partner_email: Option<String>,
    ) -> Result<Self> {
        let connection = JsonConnection::new(base_directory)?;
        let session_repository = SessionRepository::new(connection.clone());
        session_repository.store_session(&user)?;

        let mut client = ApiClient::new(transport);
        client.set_user(Some(user.email.clone()));
        let client = Arc::new(client);

        let cycle_service = BillingCycleService::new(
            CycleOverrideRepository::new(connection),
            user.email.clone(),
        );
        let installment_service =
            InstallmentService::new(cycle_service.clone(), user.currency.clone());
        let projection_service =
            ProjectionService::new(installment_service.clone(), user.email.clone());
        let dashboard_service = DashboardService::new(user.email.clone());
        let expense_service = ExpenseService::new(client.clone(), user.clone(), partner_email);

        info!("Backend ready for {}", user.email);
        Ok(Self {
            client,
            session_repository,
            cycle_service,
            installment_service,
            projection_service,
            dashboard_service,
            expense_service,
            notification_poller: NotificationPoller::new(DEFAULT_POLL_INTERVAL),
            user,
        })
    }

    /// Clear the locally stored session. Remote data is untouched.
    pub fn sign_out(&self) -> Result<()> {
        self.session_repository.clear_session()?;
        info!("Session cleared for {}", self.user.email);
        Ok(())
    }

    /// Reload every remote collection. Each source is fetched
    /// independently; a failing one is logged and reported, the rest
    /// still load.
    pub fn load_all(&self) -> LoadReport {
        let mut report = LoadReport::default();

        report.data.incomes = self.fetch("ingresos", &mut report.failed_sources);
        report.data.expenses = self.fetch("gastos", &mut report.failed_sources);
        report.data.shared_expenses = self.fetch("gastos_compartidos", &mut report.failed_sources);
        report.data.cards = self.fetch("tarjetas", &mut report.failed_sources);
        report.data.notifications = self.fetch("notificaciones", &mut report.failed_sources);

        if !report.complete() {
            warn!(
                "Partial reload, failed sources: {}",
                report.failed_sources.join(", ")
            );
        }
        report
    }

    fn fetch<R: serde::de::DeserializeOwned>(
        &self,
        table: &str,
        failed: &mut Vec<String>,
    ) -> Vec<R> {
        match self.client.read(table, BTreeMap::new()) {
            Ok(rows) => rows,
            Err(err) => {
                warn!("Could not load '{table}': {err}");
                failed.push(table.to_string());
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::test_transport::FakeTransport;
    use crate::api::client::{ApiResponse, SKIP_USER_EMAIL};
    use tempfile::TempDir;

    fn user() -> UserProfile {
        UserProfile {
            id: "u1".into(),
            email: "ana@mail.com".into(),
            name: "Ana".into(),
            currency: "ARS".into(),
        }
    }

    #[test]
    fn sign_in_persists_the_session_and_sign_out_clears_it() {
        let dir = TempDir::new().unwrap();
        let backend =
            Backend::sign_in(dir.path(), FakeTransport::always_ok(), user(), None).unwrap();

        let stored = Backend::<FakeTransport>::stored_session(dir.path()).unwrap();
        assert_eq!(stored.map(|u| u.email), Some("ana@mail.com".to_string()));

        backend.sign_out().unwrap();
        let stored = Backend::<FakeTransport>::stored_session(dir.path()).unwrap();
        assert!(stored.is_none());
    }

    #[test]
    fn load_all_reads_every_table_with_proper_scoping() {
        let dir = TempDir::new().unwrap();
        let transport = FakeTransport::new(|_| {
            Ok(ApiResponse::with_rows(serde_json::json!([])))
        });
        let backend = Backend::sign_in(dir.path(), transport, user(), None).unwrap();

        let report = backend.load_all();
        assert!(report.complete());

        let calls = backend.client.transport.recorded_calls();
        let tables: Vec<&str> = calls
            .iter()
            .map(|c| c.params.get("tabla").unwrap().as_str())
            .collect();
        assert_eq!(
            tables,
            ["ingresos", "gastos", "gastos_compartidos", "tarjetas", "notificaciones"]
        );
        for call in &calls {
            let scoped = call.params.contains_key("userEmail");
            if call.params.get("tabla").unwrap() == "gastos_compartidos" {
                assert!(!scoped);
            } else {
                assert!(scoped);
            }
            assert!(!call.params.contains_key(SKIP_USER_EMAIL));
        }
    }

    #[test]
    fn one_failing_source_does_not_blank_the_rest() {
        let dir = TempDir::new().unwrap();
        let transport = FakeTransport::new(|request| {
            if request.params.get("tabla").map(String::as_str) == Some("tarjetas") {
                Err(crate::api::client::ApiError::Transport("timeout".into()))
            } else {
                Ok(ApiResponse::with_rows(serde_json::json!([
                    {"id": "1", "descripcion": "Luz", "monto": "1000"}
                ])))
            }
        });
        let backend = Backend::sign_in(dir.path(), transport, user(), None).unwrap();

        let report = backend.load_all();
        assert_eq!(report.failed_sources, ["tarjetas"]);
        assert!(report.data.cards.is_empty());
        assert_eq!(report.data.expenses.len(), 1);
    }
}
