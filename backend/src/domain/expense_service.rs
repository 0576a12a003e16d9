//! Expense recording.
//!
//! Writes expense rows to the remote store. A credit purchase in N
//! installments is stored as N month-stepped rows so each one lands in
//! the statement it belongs to. Shared expenses go to the shared table
//! with their credit/installment info encoded into the `estado` column,
//! plus a mirror row written under the partner's scope with the
//! complementary percentage, so both partners see the expense in their
//! own session.

use anyhow::Result;
use chrono::{Datelike, NaiveDate};
use log::{info, warn};
use shared::UserProfile;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::api::client::{ApiClient, RemoteTransport};
use crate::api::guard::SubmitGuard;
use crate::domain::calendar::{make_date, YearMonth};
use crate::domain::metadata::{encode_meta, SharedMeta};
use crate::domain::money::format_money;

const OWN_TABLE: &str = "gastos";
const SHARED_TABLE: &str = "gastos_compartidos";

/// A new expense as entered in the form.
#[derive(Debug, Clone)]
pub struct SaveExpenseCommand {
    pub description: String,
    pub amount: f64,
    pub date: NaiveDate,
    pub category: String,
    /// "fixed", "variable" or "credit".
    pub expense_type: String,
    pub payment_method: String,
    pub card_id: Option<String>,
    pub installments: u32,
    /// `Some(pct)` makes this a shared expense with the given creator
    /// share percentage.
    pub shared_percentage: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SaveExpenseResult {
    pub success: bool,
    pub message: String,
    pub created_ids: Vec<String>,
}

impl SaveExpenseResult {
    fn failure(message: &str) -> Self {
        Self {
            success: false,
            message: message.to_string(),
            created_ids: Vec::new(),
        }
    }
}

pub struct ExpenseService<T: RemoteTransport> {
    client: Arc<ApiClient<T>>,
    guard: SubmitGuard,
    user: UserProfile,
    partner_email: Option<String>,
}

fn field(value: impl ToString) -> String {
    value.to_string()
}

impl<T: RemoteTransport> ExpenseService<T> {
    pub fn new(
        client: Arc<ApiClient<T>>,
        user: UserProfile,
        partner_email: Option<String>,
    ) -> Self {
        Self {
            client,
            guard: SubmitGuard::new(),
            user,
            partner_email,
        }
    }

    /// Save a new expense.
    ///
    /// Returns `Ok(None)` when the submission was dropped because a
    /// previous one is still in flight. A shared expense with no
    /// linked partner fails validation before any remote call.
    pub fn save_expense(&self, command: &SaveExpenseCommand) -> Result<Option<SaveExpenseResult>> {
        let Some(_token) = self.guard.try_begin() else {
            info!("Dropping duplicate expense submission");
            return Ok(None);
        };

        let partner = match (command.shared_percentage, &self.partner_email) {
            (Some(_), None) => {
                return Ok(Some(SaveExpenseResult::failure(
                    "Primero debes vincular una pareja para registrar gastos compartidos.",
                )));
            }
            (Some(_), Some(partner)) => Some(partner.clone()),
            (None, _) => None,
        };

        let is_credit = command.expense_type == "credit";
        let count = command.installments.max(1);

        let result = if is_credit && count > 1 {
            self.save_installment_rows(command, partner.as_deref(), count)?
        } else {
            self.save_single_row(command, partner.as_deref(), count)?
        };

        Ok(Some(result))
    }

    /// One remote row per installment, month-stepped from the purchase
    /// date (day-of-month clamped to each month).
    fn save_installment_rows(
        &self,
        command: &SaveExpenseCommand,
        partner: Option<&str>,
        count: u32,
    ) -> Result<SaveExpenseResult> {
        let per_installment = command.amount / count as f64;
        let first_month = YearMonth::of(command.date);
        let mut created_ids = Vec::new();

        for i in 0..count {
            let number = i + 1;
            let month = first_month.add_months(i as i32);
            let row_date = make_date(month.year, month.month, command.date.day());

            let mut fields = self.base_fields(command, per_installment, row_date);
            fields.insert("cuotas".into(), field(1));
            fields.insert("cuota_actual".into(), field(number));
            fields.insert("cuotas_totales".into(), field(count));
            fields.insert("monto_total".into(), field(command.amount));
            fields.insert("es_cuota".into(), "true".into());

            let outcome = match (command.shared_percentage, partner) {
                (Some(pct), Some(partner)) => {
                    let meta = SharedMeta {
                        expense_type: Some("credit".into()),
                        payment_method: Some(self.payment_method_or(command, "credit")),
                        card_id: command.card_id.clone(),
                        installment_index: Some(number),
                        installment_count: Some(count),
                        purchase_total: Some(command.amount),
                        is_installment: Some(true),
                    };
                    self.create_shared_with_mirror(fields, pct, partner, &meta)?
                }
                _ => self.client.create(OWN_TABLE, fields)?,
            };

            if outcome.success {
                if let Some(id) = outcome.id {
                    created_ids.push(id);
                }
            } else {
                warn!(
                    "Installment {number}/{count} was rejected: {}",
                    outcome.message.as_deref().unwrap_or("sin mensaje")
                );
            }
        }

        Ok(SaveExpenseResult {
            success: true,
            message: format!(
                "Gasto creado en {count} cuotas de {} cada una",
                format_money(per_installment, &self.user.currency)
            ),
            created_ids,
        })
    }

    fn save_single_row(
        &self,
        command: &SaveExpenseCommand,
        partner: Option<&str>,
        count: u32,
    ) -> Result<SaveExpenseResult> {
        let mut fields = self.base_fields(command, command.amount, command.date);
        if command.expense_type == "credit" {
            fields.insert("cuotas".into(), field(count));
        }
        fields.insert("cuota_actual".into(), field(1));
        fields.insert("cuotas_totales".into(), field(count));
        fields.insert("monto_total".into(), field(command.amount));
        fields.insert(
            "es_cuota".into(),
            field(command.expense_type == "credit" && count > 1),
        );

        let outcome = match (command.shared_percentage, partner) {
            (Some(pct), Some(partner)) => {
                let default_method = if command.expense_type == "credit" {
                    "credit"
                } else {
                    "cash"
                };
                let meta = SharedMeta {
                    expense_type: Some(command.expense_type.clone()),
                    payment_method: Some(self.payment_method_or(command, default_method)),
                    card_id: if command.expense_type == "credit" {
                        command.card_id.clone()
                    } else {
                        None
                    },
                    installment_index: Some(1),
                    installment_count: Some(count),
                    purchase_total: Some(command.amount),
                    is_installment: Some(command.expense_type == "credit" && count > 1),
                };
                self.create_shared_with_mirror(fields, pct, partner, &meta)?
            }
            _ => self.client.create(OWN_TABLE, fields)?,
        };

        Ok(SaveExpenseResult {
            success: outcome.success,
            message: outcome
                .message
                .unwrap_or_else(|| "Gasto guardado exitosamente".to_string()),
            created_ids: outcome.id.into_iter().collect(),
        })
    }

    fn base_fields(
        &self,
        command: &SaveExpenseCommand,
        amount: f64,
        date: NaiveDate,
    ) -> BTreeMap<String, String> {
        let mut fields = BTreeMap::new();
        fields.insert("descripcion".into(), command.description.clone());
        fields.insert("monto".into(), field(amount));
        fields.insert("fecha".into(), date.format("%Y-%m-%d").to_string());
        fields.insert("categoria".into(), command.category.clone());
        fields.insert("tipo".into(), command.expense_type.clone());
        fields.insert("metodo_pago".into(), command.payment_method.clone());
        if command.expense_type == "credit" {
            if let Some(card_id) = &command.card_id {
                fields.insert("tarjeta_id".into(), card_id.clone());
            }
        }
        fields
    }

    fn payment_method_or(&self, command: &SaveExpenseCommand, fallback: &str) -> String {
        if command.payment_method.is_empty() {
            fallback.to_string()
        } else {
            command.payment_method.clone()
        }
    }

    /// Create the shared row, then its mirror under the partner's
    /// scope: emails swapped, complementary percentage, same metadata.
    /// A failed mirror write is logged but does not fail the save.
    fn create_shared_with_mirror(
        &self,
        mut fields: BTreeMap<String, String>,
        creator_pct: f64,
        partner: &str,
        meta: &SharedMeta,
    ) -> Result<crate::api::client::ApiOutcome> {
        fields.insert("compartido".into(), "true".into());
        fields.insert("porcentaje_tu".into(), field(creator_pct));
        fields.insert("email_pareja".into(), partner.to_string());
        fields.insert("estado".into(), encode_meta(meta));

        let outcome = self.client.create(SHARED_TABLE, fields.clone())?;

        let mut mirror = fields;
        mirror.insert("tabla".into(), SHARED_TABLE.to_string());
        mirror.insert("userEmail".into(), partner.to_string());
        mirror.insert("email_pareja".into(), self.user.email.clone());
        mirror.insert("porcentaje_tu".into(), field(100.0 - creator_pct));
        let mirror_outcome = self.client.call("crear", mirror)?;
        if !mirror_outcome.success {
            warn!(
                "Mirror row for {partner} was rejected: {}",
                mirror_outcome.message.as_deref().unwrap_or("sin mensaje")
            );
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::test_transport::FakeTransport;
    use crate::api::client::ApiResponse;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn user() -> UserProfile {
        UserProfile {
            id: "u1".into(),
            email: "ana@mail.com".into(),
            name: "Ana".into(),
            currency: "ARS".into(),
        }
    }

    fn client_with_ids() -> Arc<ApiClient<FakeTransport>> {
        let counter = AtomicU32::new(0);
        let transport = FakeTransport::new(move |_| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            Ok(ApiResponse {
                success: true,
                id: Some(format!("row-{n}")),
                ..ApiResponse::default()
            })
        });
        let mut client = ApiClient::new(transport);
        client.set_user(Some("ana@mail.com".to_string()));
        Arc::new(client)
    }

    fn command() -> SaveExpenseCommand {
        SaveExpenseCommand {
            description: "Notebook".into(),
            amount: 1200.0,
            date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            category: "Tecnología".into(),
            expense_type: "credit".into(),
            payment_method: "credit".into(),
            card_id: Some("card-1".into()),
            installments: 6,
            shared_percentage: None,
        }
    }

    #[test]
    fn credit_purchase_creates_one_row_per_installment() {
        let client = client_with_ids();
        let svc = ExpenseService::new(client.clone(), user(), None);

        let result = svc.save_expense(&command()).unwrap().unwrap();
        assert!(result.success);
        assert_eq!(result.created_ids.len(), 6);
        assert!(result.message.contains("6 cuotas"));

        let calls = client.transport.recorded_calls();
        assert_eq!(calls.len(), 6);
        assert_eq!(calls[0].params.get("fecha").unwrap(), "2024-01-31");
        // Day-of-month clamps into February.
        assert_eq!(calls[1].params.get("fecha").unwrap(), "2024-02-29");
        assert_eq!(calls[2].params.get("fecha").unwrap(), "2024-03-31");
        assert_eq!(calls[0].params.get("monto").unwrap(), "200");
        assert_eq!(calls[5].params.get("cuota_actual").unwrap(), "6");
        assert_eq!(calls[0].params.get("monto_total").unwrap(), "1200");
        assert_eq!(calls[0].params.get("tabla").unwrap(), "gastos");
    }

    #[test]
    fn single_payment_expense_is_one_row() {
        let client = client_with_ids();
        let svc = ExpenseService::new(client.clone(), user(), None);

        let mut cmd = command();
        cmd.installments = 1;
        let result = svc.save_expense(&cmd).unwrap().unwrap();
        assert!(result.success);
        assert_eq!(client.transport.recorded_calls().len(), 1);
    }

    #[test]
    fn shared_expense_without_partner_fails_before_any_call() {
        let client = client_with_ids();
        let svc = ExpenseService::new(client.clone(), user(), None);

        let mut cmd = command();
        cmd.shared_percentage = Some(60.0);
        let result = svc.save_expense(&cmd).unwrap().unwrap();
        assert!(!result.success);
        assert!(result.message.contains("vincular una pareja"));
        assert!(client.transport.recorded_calls().is_empty());
    }

    #[test]
    fn shared_expense_writes_mirror_with_swapped_fields() {
        let client = client_with_ids();
        let svc = ExpenseService::new(client.clone(), user(), Some("beto@mail.com".into()));

        let mut cmd = command();
        cmd.installments = 1;
        cmd.shared_percentage = Some(60.0);
        svc.save_expense(&cmd).unwrap().unwrap();

        let calls = client.transport.recorded_calls();
        assert_eq!(calls.len(), 2);

        let own = &calls[0].params;
        assert_eq!(own.get("tabla").unwrap(), "gastos_compartidos");
        assert_eq!(own.get("userEmail").unwrap(), "ana@mail.com");
        assert_eq!(own.get("email_pareja").unwrap(), "beto@mail.com");
        assert_eq!(own.get("porcentaje_tu").unwrap(), "60");
        assert!(own.get("estado").unwrap().starts_with("META:"));

        let mirror = &calls[1].params;
        assert_eq!(mirror.get("userEmail").unwrap(), "beto@mail.com");
        assert_eq!(mirror.get("email_pareja").unwrap(), "ana@mail.com");
        assert_eq!(mirror.get("porcentaje_tu").unwrap(), "40");
        assert_eq!(mirror.get("estado").unwrap(), own.get("estado").unwrap());
    }

    #[test]
    fn shared_credit_installments_mirror_every_row() {
        let client = client_with_ids();
        let svc = ExpenseService::new(client.clone(), user(), Some("beto@mail.com".into()));

        let mut cmd = command();
        cmd.installments = 3;
        cmd.shared_percentage = Some(50.0);
        let result = svc.save_expense(&cmd).unwrap().unwrap();
        assert!(result.success);

        let calls = client.transport.recorded_calls();
        // Three installments, each with its mirror.
        assert_eq!(calls.len(), 6);
        let metas: Vec<&String> = calls
            .iter()
            .map(|c| c.params.get("estado").unwrap())
            .collect();
        assert!(metas.iter().all(|m| m.starts_with("META:")));
        assert!(metas[0].contains("\"cuota_actual\":1"));
        assert!(metas[4].contains("\"cuota_actual\":3"));
    }

    #[test]
    fn duplicate_submission_is_dropped_silently() {
        let client = client_with_ids();
        let svc = ExpenseService::new(client.clone(), user(), None);

        let _held = svc.guard.try_begin().unwrap();
        let result = svc.save_expense(&command()).unwrap();
        assert!(result.is_none());
        assert!(client.transport.recorded_calls().is_empty());
    }
}
