//! Shared-expense reconciliation.
//!
//! When a couple records a shared expense, a mirror row is written for
//! each partner so both see it in their own scope. This module answers
//! "which rows belong to me" and "which rows belong to this pair",
//! collapsing mirror duplicates with an explicit tie-break: the row
//! where the viewer is the recorded creator wins.

use shared::SharedExpense;
use std::collections::HashMap;

use crate::domain::metadata::{decode_meta, SharedMeta};
use crate::domain::money::parse_amount;

/// Normalized email comparison key (trimmed, lowercased).
pub fn norm_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// A shared-expense record with its metadata overlay decoded once at
/// the data boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct SharedRow {
    pub record: SharedExpense,
    pub meta: Option<SharedMeta>,
}

impl SharedRow {
    pub fn from_record(record: SharedExpense) -> Self {
        let meta = decode_meta(&record.status);
        Self { record, meta }
    }

    /// Metadata value if present, otherwise the record's own column.
    fn meta_or_column<'a>(&'a self, meta_value: Option<String>, column: &'a str) -> String {
        match meta_value {
            Some(v) if !v.is_empty() => v,
            _ => column.trim().to_string(),
        }
    }

    /// Composite natural key identifying one logical installment of
    /// one logical expense, used to spot mirror rows.
    fn dedup_key(&self) -> String {
        let rec = &self.record;
        let meta = self.meta.clone().unwrap_or_default();
        [
            rec.description.trim().to_lowercase(),
            rec.date.trim().to_string(),
            parse_amount(&rec.amount).to_string(),
            rec.category.trim().to_lowercase(),
            self.meta_or_column(
                meta.installment_index.map(|n| n.to_string()),
                &rec.installment_index,
            ),
            self.meta_or_column(
                meta.installment_count.map(|n| n.to_string()),
                &rec.installment_count,
            ),
            self.meta_or_column(meta.card_id, &rec.card_id),
            self.meta_or_column(
                meta.purchase_total.map(|n| n.to_string()),
                &rec.total_amount,
            ),
        ]
        .join("|")
    }
}

/// Rank used when two rows share a dedup key: the row created by the
/// viewer beats the mirror created by the counterpart.
fn rank_for(row: &SharedRow, viewer: &str) -> u8 {
    if norm_email(&row.record.creator_email) == viewer {
        2
    } else {
        1
    }
}

/// Rows relevant to one user: they appear as creator or counterpart,
/// with mirror duplicates collapsed (creator row preferred).
pub fn view_for_user(rows: &[SharedRow], user_email: &str) -> Vec<SharedRow> {
    let me = norm_email(user_email);

    let mut order: Vec<String> = Vec::new();
    let mut chosen: HashMap<String, (u8, SharedRow)> = HashMap::new();

    for row in rows {
        let creator = norm_email(&row.record.creator_email);
        let partner = norm_email(&row.record.partner_email);
        let mine = (!creator.is_empty() && creator == me)
            || (!partner.is_empty() && partner == me);
        if !mine {
            continue;
        }

        let key = row.dedup_key();
        let rank = rank_for(row, &me);
        match chosen.get(&key) {
            Some((kept_rank, _)) if *kept_rank >= rank => {}
            Some(_) => {
                chosen.insert(key, (rank, row.clone()));
            }
            None => {
                order.push(key.clone());
                chosen.insert(key, (rank, row.clone()));
            }
        }
    }

    order
        .into_iter()
        .filter_map(|key| chosen.remove(&key).map(|(_, row)| row))
        .collect()
}

/// Rows belonging to a pair, in either direction. No deduplication:
/// both mirror rows of one logical expense are returned, and callers
/// summing over this view must account for that.
pub fn view_for_pair(rows: &[SharedRow], email_a: &str, email_b: &str) -> Vec<SharedRow> {
    let a = norm_email(email_a);
    let b = norm_email(email_b);
    rows.iter()
        .filter(|row| {
            let creator = norm_email(&row.record.creator_email);
            let partner = norm_email(&row.record.partner_email);
            (creator == a && partner == b) || (creator == b && partner == a)
        })
        .cloned()
        .collect()
}

/// The record's split percentage is always the creator's share. A
/// blank or unparseable percentage defaults to an even 50/50 split.
pub fn creator_percentage(record: &SharedExpense) -> f64 {
    let raw = record.creator_percentage.trim();
    if raw.is_empty() {
        return 50.0;
    }
    let pct = parse_amount(raw);
    if pct == 0.0 {
        50.0
    } else {
        pct
    }
}

/// Split the record's amount between the viewer and their partner.
/// Returns `(mine, partner)`; the two always sum to the total.
pub fn share_for_viewer(record: &SharedExpense, viewer_email: &str) -> (f64, f64) {
    let total = parse_amount(&record.amount);
    let pct = creator_percentage(record);
    let viewer_is_creator = norm_email(&record.creator_email) == norm_email(viewer_email);
    let my_pct = if viewer_is_creator { pct } else { 100.0 - pct };
    let mine = total * my_pct / 100.0;
    (mine, total - mine)
}
