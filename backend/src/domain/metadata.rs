//! Shared-expense metadata codec.
//!
//! The `gastos_compartidos` table has no columns for credit/installment
//! info, so that data rides inside the `estado` column as a marker plus
//! a JSON payload: `META:{"tipo":"credit","cuotas_totales":6,...}`.
//! The metadata is a best-effort overlay; consumers treat its absence
//! as "no extra info", never as an error.

use serde::{Deserialize, Serialize};

pub const META_PREFIX: &str = "META:";

fn is_empty_string(value: &Option<String>) -> bool {
    match value {
        None => true,
        Some(s) => s.is_empty(),
    }
}

/// Structured fields carried inside the `estado` column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SharedMeta {
    #[serde(rename = "tipo", default, skip_serializing_if = "is_empty_string")]
    pub expense_type: Option<String>,
    #[serde(rename = "metodo_pago", default, skip_serializing_if = "is_empty_string")]
    pub payment_method: Option<String>,
    #[serde(rename = "tarjeta_id", default, skip_serializing_if = "is_empty_string")]
    pub card_id: Option<String>,
    /// 1-based installment number of this row.
    #[serde(rename = "cuota_actual", default, skip_serializing_if = "Option::is_none")]
    pub installment_index: Option<u32>,
    #[serde(rename = "cuotas_totales", default, skip_serializing_if = "Option::is_none")]
    pub installment_count: Option<u32>,
    /// Original purchase total (the row's `monto` is per installment).
    #[serde(rename = "monto_total", default, skip_serializing_if = "Option::is_none")]
    pub purchase_total: Option<f64>,
    #[serde(rename = "es_cuota", default, skip_serializing_if = "Option::is_none")]
    pub is_installment: Option<bool>,
}

/// Encode metadata into the opaque status string. Empty fields are
/// dropped; a serialization failure yields the empty string rather
/// than an error.
pub fn encode_meta(meta: &SharedMeta) -> String {
    match serde_json::to_string(meta) {
        Ok(json) => format!("{META_PREFIX}{json}"),
        Err(_) => String::new(),
    }
}

/// Decode a status cell back into metadata.
///
/// Returns `None` when the cell does not start with the marker
/// (case-insensitive) or the payload is not valid JSON. Never fails.
pub fn decode_meta(status: &str) -> Option<SharedMeta> {
    let s = status.trim();
    let prefix = s.get(..META_PREFIX.len())?;
    if !prefix.eq_ignore_ascii_case(META_PREFIX) {
        return None;
    }
    let payload = s[META_PREFIX.len()..].trim();
    if payload.is_empty() {
        return None;
    }
    serde_json::from_str(payload).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_drops_empty_fields() {
        let meta = SharedMeta {
            expense_type: Some("credit".into()),
            payment_method: Some(String::new()),
            card_id: None,
            installment_index: Some(2),
            installment_count: Some(6),
            purchase_total: Some(1200.0),
            is_installment: Some(true),
        };
        let encoded = encode_meta(&meta);
        assert!(encoded.starts_with("META:{"));
        assert!(!encoded.contains("metodo_pago"));
        assert!(!encoded.contains("tarjeta_id"));
        assert!(encoded.contains("\"cuota_actual\":2"));
    }

    #[test]
    fn decode_round_trips() {
        let meta = SharedMeta {
            expense_type: Some("credit".into()),
            payment_method: Some("credit".into()),
            card_id: Some("card-1".into()),
            installment_index: Some(1),
            installment_count: Some(3),
            purchase_total: Some(300.0),
            is_installment: Some(true),
        };
        assert_eq!(decode_meta(&encode_meta(&meta)), Some(meta));
    }

    #[test]
    fn decode_is_case_insensitive_on_the_marker() {
        assert_eq!(
            decode_meta("meta:{\"cuotas_totales\":6}")
                .unwrap()
                .installment_count,
            Some(6)
        );
    }

    #[test]
    fn decode_rejects_non_meta_and_garbage() {
        assert_eq!(decode_meta(""), None);
        assert_eq!(decode_meta("pendiente"), None);
        assert_eq!(decode_meta("META:"), None);
        assert_eq!(decode_meta("META:not json"), None);
        assert_eq!(decode_meta("MET"), None);
    }
}
