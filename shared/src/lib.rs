//! Wire-facing data types shared across the workspace.
//!
//! The remote store is a spreadsheet whose columns are Spanish
//! (`descripcion`, `monto`, `email_usuario`, ...). Records here keep
//! idiomatic Rust field names and map to the wire names with serde
//! renames. Every cell may arrive as a string, a number or be missing
//! entirely, so the record fields are lossy strings that the domain
//! layer normalizes (`parse_amount` and friends).

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Accept a spreadsheet cell of any scalar JSON type as a string.
///
/// Numbers are rendered with their JSON representation, `null` becomes
/// the empty string. Rejects arrays/objects so a malformed row still
/// fails loudly at the boundary instead of deep inside an aggregator.
fn lossy_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Null => Ok(String::new()),
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Bool(b) => Ok(b.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a scalar cell, got {other}"
        ))),
    }
}

/// Signed-in user profile, as returned by the `login`/`register`
/// actions and persisted in the local session file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, deserialize_with = "lossy_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lossy_string")]
    pub email: String,
    #[serde(default, deserialize_with = "lossy_string")]
    pub name: String,
    /// ISO currency code used for display formatting (defaults to ARS).
    #[serde(default, deserialize_with = "lossy_string")]
    pub currency: String,
}

/// A credit card as configured by the user (`tarjetas` table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    #[serde(default, deserialize_with = "lossy_string")]
    pub id: String,
    #[serde(rename = "banco", default, deserialize_with = "lossy_string")]
    pub bank: String,
    #[serde(rename = "ultimos_4", default, deserialize_with = "lossy_string")]
    pub last_four: String,
    #[serde(rename = "limite", default, deserialize_with = "lossy_string")]
    pub credit_limit: String,
    /// Calendar day-of-month the statement closes (1-31, clamped to the
    /// target month when resolving actual dates).
    #[serde(rename = "dia_cierre", default, deserialize_with = "lossy_string")]
    pub close_day: String,
    /// Calendar day-of-month the payment is due (1-31, clamped).
    #[serde(rename = "dia_vencimiento", default, deserialize_with = "lossy_string")]
    pub due_day: String,
    /// Card network ("visa", "mastercard", ...).
    #[serde(rename = "tipo", default, deserialize_with = "lossy_string")]
    pub network: String,
}

/// A row of the `ingresos` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Income {
    #[serde(default, deserialize_with = "lossy_string")]
    pub id: String,
    #[serde(rename = "descripcion", default, deserialize_with = "lossy_string")]
    pub description: String,
    #[serde(rename = "monto", default, deserialize_with = "lossy_string")]
    pub amount: String,
    #[serde(rename = "fecha", default, deserialize_with = "lossy_string")]
    pub date: String,
    #[serde(rename = "categoria", default, deserialize_with = "lossy_string")]
    pub category: String,
}

/// A row of the `gastos` table (personal expenses).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    #[serde(default, deserialize_with = "lossy_string")]
    pub id: String,
    #[serde(rename = "descripcion", default, deserialize_with = "lossy_string")]
    pub description: String,
    /// Amount of this row. For an installment row this is the monthly
    /// amount, not the purchase total.
    #[serde(rename = "monto", default, deserialize_with = "lossy_string")]
    pub amount: String,
    #[serde(rename = "fecha", default, deserialize_with = "lossy_string")]
    pub date: String,
    #[serde(rename = "categoria", default, deserialize_with = "lossy_string")]
    pub category: String,
    /// Declared kind: "fixed", "variable" or "credit".
    #[serde(rename = "tipo", default, deserialize_with = "lossy_string")]
    pub expense_type: String,
    #[serde(rename = "metodo_pago", default, deserialize_with = "lossy_string")]
    pub payment_method: String,
    #[serde(rename = "tarjeta_id", default, deserialize_with = "lossy_string")]
    pub card_id: String,
    #[serde(rename = "cuotas", default, deserialize_with = "lossy_string")]
    pub installments: String,
    /// 1-based index when this row is a single installment of a larger
    /// purchase.
    #[serde(rename = "cuota_actual", default, deserialize_with = "lossy_string")]
    pub installment_index: String,
    #[serde(rename = "cuotas_totales", default, deserialize_with = "lossy_string")]
    pub installment_count: String,
    /// Original purchase total when the row is an installment.
    #[serde(rename = "monto_total", default, deserialize_with = "lossy_string")]
    pub total_amount: String,
    #[serde(rename = "es_cuota", default, deserialize_with = "lossy_string")]
    pub is_installment: String,
}

/// A row of the `gastos_compartidos` table.
///
/// The table has no dedicated columns for installment/card info, so
/// that data travels inside `status` as an opaque `META:{...}` blob
/// (see the metadata codec in the backend crate). Two rows may mirror
/// the same logical expense, one per partner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SharedExpense {
    #[serde(default, deserialize_with = "lossy_string")]
    pub id: String,
    #[serde(rename = "descripcion", default, deserialize_with = "lossy_string")]
    pub description: String,
    #[serde(rename = "monto", default, deserialize_with = "lossy_string")]
    pub amount: String,
    #[serde(rename = "fecha", default, deserialize_with = "lossy_string")]
    pub date: String,
    #[serde(rename = "categoria", default, deserialize_with = "lossy_string")]
    pub category: String,
    /// Email of the user who recorded the expense (the "owner").
    #[serde(rename = "email_usuario", default, deserialize_with = "lossy_string")]
    pub creator_email: String,
    /// Email of the counterpart.
    #[serde(rename = "email_pareja", default, deserialize_with = "lossy_string")]
    pub partner_email: String,
    /// The creator's share of the total, as a percentage (0-100).
    #[serde(rename = "porcentaje_tu", default, deserialize_with = "lossy_string")]
    pub creator_percentage: String,
    /// Opaque status column, possibly carrying a `META:` blob.
    #[serde(rename = "estado", default, deserialize_with = "lossy_string")]
    pub status: String,
    #[serde(rename = "compartido", default, deserialize_with = "lossy_string")]
    pub shared_flag: String,
    #[serde(rename = "cuota_actual", default, deserialize_with = "lossy_string")]
    pub installment_index: String,
    #[serde(rename = "cuotas_totales", default, deserialize_with = "lossy_string")]
    pub installment_count: String,
    #[serde(rename = "tarjeta_id", default, deserialize_with = "lossy_string")]
    pub card_id: String,
    #[serde(rename = "monto_total", default, deserialize_with = "lossy_string")]
    pub total_amount: String,
}

/// A row of the `notificaciones` table. Read-only summary data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(default, deserialize_with = "lossy_string")]
    pub id: String,
    #[serde(rename = "titulo", default, deserialize_with = "lossy_string")]
    pub title: String,
    #[serde(rename = "mensaje", default, deserialize_with = "lossy_string")]
    pub message: String,
    #[serde(rename = "tipo", default, deserialize_with = "lossy_string")]
    pub kind: String,
    #[serde(rename = "leida", default, deserialize_with = "lossy_string")]
    pub read: String,
    #[serde(rename = "fecha", default, deserialize_with = "lossy_string")]
    pub created_at: String,
}

/// A user-set close/due override for one card in one statement month.
///
/// Persisted locally as `{"close": "2024-02-10", "due": "2024-03-05"}`
/// under `card_cycles_v2_<email>.json`. An override always wins over
/// the dates computed from the card's configured close/due days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleOverride {
    #[serde(rename = "close")]
    pub close_date: NaiveDate,
    #[serde(rename = "due")]
    pub due_date: NaiveDate,
}
