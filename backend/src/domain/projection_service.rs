//! Forward-looking payment projection.
//!
//! Combines personal and shared expenses into the unified "what do I
//! actually pay each month" list: fixed expenses repeat monthly, credit
//! purchases expand into installments that follow each card's billing
//! cycle, everything else lands in its own month.

use chrono::{Datelike, Local, NaiveDate};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use shared::{Card, Expense};
use std::collections::{HashMap, HashSet};

use crate::domain::calendar::{format_date, make_date, parse_wire_date, YearMonth};
use crate::domain::installment_service::{InstallmentService, PurchasePlan};
use crate::domain::money::parse_amount;
use crate::domain::shared_service::{creator_percentage, norm_email, SharedRow};

/// Classification of an expense record. One function decides this
/// (`classify_kind`) so every consumer agrees on the precedence:
/// shared beats credit beats the declared fixed/variable type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpenseKind {
    Shared,
    Credit,
    Fixed,
    Variable,
}

/// Central classification. A record is credit when its declared type
/// or payment method says so, or when it references a card at all.
pub fn classify_kind(
    is_shared: bool,
    expense_type: &str,
    payment_method: &str,
    card_id: &str,
) -> ExpenseKind {
    if is_shared {
        return ExpenseKind::Shared;
    }
    let declared = expense_type.trim().to_lowercase();
    if declared == "credit"
        || payment_method.trim().to_lowercase() == "credit"
        || !card_id.trim().is_empty()
    {
        return ExpenseKind::Credit;
    }
    if declared == "fixed" {
        ExpenseKind::Fixed
    } else {
        ExpenseKind::Variable
    }
}

/// Month window a projection covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionWindow {
    /// One specific month.
    Month(YearMonth),
    /// Every month of a calendar year.
    Year(i32),
    /// Twelve months starting at the given month.
    NextTwelve(YearMonth),
}

impl ProjectionWindow {
    /// The rolling default window: twelve months from today.
    pub fn default_from_today() -> Self {
        Self::NextTwelve(YearMonth::of(Local::now().date_naive()))
    }

    pub fn months(&self) -> Vec<YearMonth> {
        match *self {
            Self::Month(ym) => vec![ym],
            Self::Year(year) => (1..=12).map(|m| YearMonth::new(year, m)).collect(),
            Self::NextTwelve(from) => (0..12).map(|i| from.add_months(i)).collect(),
        }
    }
}

/// Kind filter applied before expansion. `Variable` rows only show up
/// under `All`, matching the projection screen's filter options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KindFilter {
    #[default]
    All,
    Fixed,
    Credit,
    Shared,
}

impl KindFilter {
    fn keeps(self, kind: ExpenseKind) -> bool {
        match self {
            Self::All => true,
            Self::Fixed => kind == ExpenseKind::Fixed,
            Self::Credit => kind == ExpenseKind::Credit,
            Self::Shared => kind == ExpenseKind::Shared,
        }
    }
}

/// One row of the projection table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledPayment {
    pub description: String,
    pub category: String,
    /// Amount due in this entry's month (for credit rows, the
    /// installment amount, not the purchase total).
    pub total: f64,
    pub my_share: f64,
    pub partner_share: f64,
    /// Display label: "Fijo", "Variable", "Crédito", "Tarjeta" or
    /// "Compartido".
    pub kind_label: String,
    pub date: NaiveDate,
    /// Free-text detail (bank/last-4, close and due dates, installment
    /// counter, split percentages).
    pub annotation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ProjectionTotals {
    pub total: f64,
    pub mine: f64,
    pub partner: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionResult {
    /// Sorted ascending by effective date.
    pub payments: Vec<ScheduledPayment>,
    pub totals: ProjectionTotals,
}

#[derive(Debug, Clone, Copy)]
pub struct ProjectionQuery {
    pub window: ProjectionWindow,
    pub kind: KindFilter,
}

fn format_pct(pct: f64) -> String {
    if pct.fract() == 0.0 {
        format!("{pct:.0}")
    } else {
        format!("{pct}")
    }
}

fn parse_count(primary: &str, fallback: &str) -> u32 {
    let pick = |raw: &str| raw.trim().parse::<u32>().ok().filter(|n| *n > 0);
    pick(primary).or_else(|| pick(fallback)).unwrap_or(1)
}

#[derive(Clone)]
pub struct ProjectionService {
    installments: InstallmentService,
    user_email: String,
}

impl ProjectionService {
    pub fn new(installments: InstallmentService, user_email: impl Into<String>) -> Self {
        Self {
            installments,
            user_email: user_email.into(),
        }
    }

    /// Project expenses over the query window.
    ///
    /// `shared` is expected to already be the viewer's reconciled view
    /// (see `shared_service::view_for_user`); personal expenses are
    /// passed as loaded.
    pub fn project(
        &self,
        expenses: &[Expense],
        shared: &[SharedRow],
        cards: &[Card],
        query: &ProjectionQuery,
    ) -> ProjectionResult {
        let months = query.window.months();
        let month_set: HashSet<YearMonth> = months.iter().copied().collect();
        let cards_by_id: HashMap<&str, &Card> =
            cards.iter().map(|c| (c.id.as_str(), c)).collect();
        let today = Local::now().date_naive();

        let mut payments: Vec<ScheduledPayment> = Vec::new();

        for expense in expenses {
            let kind = classify_kind(
                false,
                &expense.expense_type,
                &expense.payment_method,
                &expense.card_id,
            );
            if !query.kind.keeps(kind) {
                continue;
            }

            let purchase_date = parse_wire_date(&expense.date).unwrap_or(today);
            let count = parse_count(&expense.installment_count, &expense.installments);
            let row_amount = parse_amount(&expense.amount);
            let total_base = match parse_amount(&expense.total_amount) {
                t if t != 0.0 => t,
                _ => row_amount * count as f64,
            };

            match kind {
                ExpenseKind::Credit => self.expand_credit(
                    &mut payments,
                    &month_set,
                    &cards_by_id,
                    expense,
                    purchase_date,
                    count,
                    total_base,
                    total_base,
                    0.0,
                ),
                ExpenseKind::Fixed => {
                    expand_fixed(&mut payments, &months, expense, purchase_date, total_base)
                }
                _ => {
                    if month_set.contains(&YearMonth::of(purchase_date)) {
                        payments.push(ScheduledPayment {
                            description: display_description(&expense.description),
                            category: display_category(&expense.category),
                            total: total_base,
                            my_share: total_base,
                            partner_share: 0.0,
                            kind_label: "Variable".into(),
                            date: purchase_date,
                            annotation: String::new(),
                        });
                    }
                }
            }
        }

        let shared_rows: &[SharedRow] = if query.kind.keeps(ExpenseKind::Shared) {
            shared
        } else {
            &[]
        };
        for row in shared_rows {
            let rec = &row.record;
            let purchase_date = parse_wire_date(&rec.date).unwrap_or(today);
            if !month_set.contains(&YearMonth::of(purchase_date)) {
                continue;
            }

            let total = parse_amount(&rec.amount);
            let pct = creator_percentage(rec);
            let viewer_is_creator =
                norm_email(&rec.creator_email) == norm_email(&self.user_email);
            let my_pct = if viewer_is_creator { pct } else { 100.0 - pct };
            let mine = total * my_pct / 100.0;

            payments.push(ScheduledPayment {
                description: display_description(&rec.description),
                category: display_category(&rec.category),
                total,
                my_share: mine,
                partner_share: total - mine,
                kind_label: "Compartido".into(),
                date: purchase_date,
                annotation: format!(
                    "Compartido ({}% - {}%)",
                    format_pct(my_pct),
                    format_pct(100.0 - my_pct)
                ),
            });
        }

        payments.sort_by_key(|p| p.date);

        let totals = payments.iter().fold(ProjectionTotals::default(), |acc, p| {
            ProjectionTotals {
                total: acc.total + p.total,
                mine: acc.mine + p.my_share,
                partner: acc.partner + p.partner_share,
            }
        });

        debug!(
            "Projected {} payments over {} months",
            payments.len(),
            months.len()
        );

        ProjectionResult { payments, totals }
    }

    #[allow(clippy::too_many_arguments)]
    fn expand_credit(
        &self,
        payments: &mut Vec<ScheduledPayment>,
        month_set: &HashSet<YearMonth>,
        cards_by_id: &HashMap<&str, &Card>,
        expense: &Expense,
        purchase_date: NaiveDate,
        count: u32,
        total: f64,
        mine: f64,
        partner: f64,
    ) {
        let card = cards_by_id.get(expense.card_id.trim()).copied();

        // Without a resolvable card there is no cycle to follow: the
        // whole thing is a single payment in the purchase's own month.
        let Some(card) = card else {
            if !expense.card_id.trim().is_empty() {
                warn!(
                    "Expense {} references unknown card '{}', treating as single payment",
                    expense.id, expense.card_id
                );
            }
            if month_set.contains(&YearMonth::of(purchase_date)) {
                payments.push(ScheduledPayment {
                    description: display_description(&expense.description),
                    category: display_category(&expense.category),
                    total,
                    my_share: mine,
                    partner_share: partner,
                    kind_label: "Crédito".into(),
                    date: purchase_date,
                    annotation: if count > 1 {
                        format!("Cuota 1/{count}")
                    } else {
                        "Pago único".into()
                    },
                });
            }
            return;
        };

        let schedule = self.installments.expand(&PurchasePlan {
            purchase_date,
            card,
            installment_count: count,
            total,
            my_share: Some(mine),
            partner_share: Some(partner),
        });

        for cuota in schedule {
            if !month_set.contains(&YearMonth::of(cuota.due_date)) {
                continue;
            }
            let card_label = if card.bank.is_empty() {
                format!("Tarjeta ****{}", card.last_four)
            } else {
                format!("{} ****{}", card.bank, card.last_four)
            };
            payments.push(ScheduledPayment {
                description: display_description(&expense.description),
                category: display_category(&expense.category),
                total: cuota.amount,
                my_share: cuota.my_share,
                partner_share: cuota.partner_share,
                kind_label: "Tarjeta".into(),
                date: cuota.due_date,
                annotation: [
                    card_label,
                    format!("Cierra: {}", format_date(cuota.close_date)),
                    format!("Vence: {}", format_date(cuota.due_date)),
                    cuota.annotation,
                ]
                .join(" • "),
            });
        }
    }
}

fn expand_fixed(
    payments: &mut Vec<ScheduledPayment>,
    months: &[YearMonth],
    expense: &Expense,
    purchase_date: NaiveDate,
    total_base: f64,
) {
    let anchor_day = purchase_date.day();
    for ym in months {
        let pay_date = make_date(ym.year, ym.month, anchor_day);
        // A fixed expense that starts in the future does not project
        // into months before its first occurrence.
        if pay_date < purchase_date {
            continue;
        }
        payments.push(ScheduledPayment {
            description: display_description(&expense.description),
            category: display_category(&expense.category),
            total: total_base,
            my_share: total_base,
            partner_share: 0.0,
            kind_label: "Fijo".into(),
            date: pay_date,
            annotation: "Mensual".into(),
        });
    }
}

fn display_description(raw: &str) -> String {
    if raw.trim().is_empty() {
        "Gasto".to_string()
    } else {
        raw.to_string()
    }
}

fn display_category(raw: &str) -> String {
    if raw.trim().is_empty() {
        "General".to_string()
    } else {
        raw.to_string()
    }
}
