//! Dashboard KPI computation.
//!
//! Pure aggregation over a snapshot of the loaded data: available
//! money, period income/expense, shared-debt total, per-category
//! breakdown and a trailing income/expense trend. The UI only renders
//! what comes out of here.

use chrono::{Datelike, Local};
use log::debug;
use serde::{Deserialize, Serialize};
use shared::{Expense, Income};

use crate::domain::calendar::{parse_wire_date, YearMonth};
use crate::domain::money::parse_amount;
use crate::domain::shared_service::{share_for_viewer, view_for_pair, SharedRow};

/// Which expenses the dashboard sums.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DashboardScope {
    #[default]
    All,
    Own,
    Shared,
}

#[derive(Debug, Clone, Default)]
pub struct DashboardQuery {
    /// Selected month (1-12); `None` means the current month.
    pub month: Option<u32>,
    /// Selected year; `None` means the current year.
    pub year: Option<i32>,
    pub scope: DashboardScope,
    /// Restrict to one category; `None` keeps all.
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub month: String,
    pub label: String,
    pub income: f64,
    pub expense: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    /// All-time income minus all-time personal expense.
    pub available: f64,
    /// Income recorded in the selected period.
    pub period_income: f64,
    /// Period expense under the query's scope/category filters. Shared
    /// rows contribute the viewer's share, not the full amount.
    pub period_expense: f64,
    /// The viewer's share of the pair's shared expenses this period.
    pub shared_total: f64,
    /// Per-category totals under the same filters, largest first.
    pub by_category: Vec<(String, f64)>,
    /// Trailing six months of income vs. expense.
    pub trend: Vec<TrendPoint>,
}

#[derive(Clone)]
pub struct DashboardService {
    user_email: String,
}

struct PeriodEntry {
    category: String,
    amount: f64,
    own: bool,
}

impl DashboardService {
    pub fn new(user_email: impl Into<String>) -> Self {
        Self {
            user_email: user_email.into(),
        }
    }

    pub fn summarize(
        &self,
        incomes: &[Income],
        expenses: &[Expense],
        shared_all: &[SharedRow],
        partner_email: Option<&str>,
        query: &DashboardQuery,
    ) -> DashboardSummary {
        let now = Local::now().date_naive();
        let selected = YearMonth::new(
            query.year.unwrap_or(now.year()),
            query.month.unwrap_or(now.month()),
        );

        let in_period = |raw_date: &str| {
            parse_wire_date(raw_date).map(YearMonth::of) == Some(selected)
        };

        let total_income: f64 = incomes.iter().map(|i| parse_amount(&i.amount)).sum();
        let total_own_expense: f64 = expenses.iter().map(|e| parse_amount(&e.amount)).sum();
        let available = total_income - total_own_expense;

        let period_income: f64 = incomes
            .iter()
            .filter(|i| in_period(&i.date))
            .map(|i| parse_amount(&i.amount))
            .sum();

        let pair_rows = match partner_email {
            Some(partner) if !partner.trim().is_empty() => {
                view_for_pair(shared_all, &self.user_email, partner)
            }
            _ => Vec::new(),
        };

        let mut entries: Vec<PeriodEntry> = Vec::new();
        for expense in expenses.iter().filter(|e| in_period(&e.date)) {
            entries.push(PeriodEntry {
                category: expense.category.clone(),
                amount: parse_amount(&expense.amount),
                own: true,
            });
        }
        let mut shared_total = 0.0;
        for row in pair_rows.iter().filter(|r| in_period(&r.record.date)) {
            let (mine, _) = share_for_viewer(&row.record, &self.user_email);
            shared_total += mine;
            entries.push(PeriodEntry {
                category: row.record.category.clone(),
                amount: mine,
                own: false,
            });
        }

        entries.retain(|e| match query.scope {
            DashboardScope::All => true,
            DashboardScope::Own => e.own,
            DashboardScope::Shared => !e.own,
        });
        if let Some(category) = query.category.as_deref() {
            entries.retain(|e| e.category == category);
        }

        let period_expense: f64 = entries.iter().map(|e| e.amount).sum();

        let mut by_category: Vec<(String, f64)> = Vec::new();
        for entry in &entries {
            let name = if entry.category.trim().is_empty() {
                "Otros".to_string()
            } else {
                entry.category.clone()
            };
            match by_category.iter_mut().find(|(cat, _)| *cat == name) {
                Some((_, sum)) => *sum += entry.amount,
                None => by_category.push((name, entry.amount)),
            }
        }
        by_category.sort_by(|a, b| b.1.total_cmp(&a.1));

        let trend = self.trend(incomes, expenses, &pair_rows, query, selected);

        debug!(
            "Dashboard for {selected}: income {period_income:.2}, expense {period_expense:.2}"
        );

        DashboardSummary {
            available,
            period_income,
            period_expense,
            shared_total,
            by_category,
            trend,
        }
    }

    /// Income vs. expense for the six months ending at the selected
    /// one. The expense line follows the query's scope and category
    /// filters: personal rows at full amount, shared rows at the
    /// viewer's share.
    fn trend(
        &self,
        incomes: &[Income],
        expenses: &[Expense],
        pair_rows: &[SharedRow],
        query: &DashboardQuery,
        selected: YearMonth,
    ) -> Vec<TrendPoint> {
        let keep_own = query.scope != DashboardScope::Shared;
        let keep_shared = query.scope != DashboardScope::Own;
        let category = query.category.as_deref();
        let in_category = |raw: &str| category.map_or(true, |c| raw == c);

        (0..6)
            .rev()
            .map(|back| {
                let month = selected.add_months(-back);
                let month_of = |raw: &str| parse_wire_date(raw).map(YearMonth::of);
                let income: f64 = incomes
                    .iter()
                    .filter(|i| month_of(&i.date) == Some(month))
                    .map(|i| parse_amount(&i.amount))
                    .sum();
                let mut expense = 0.0;
                if keep_own {
                    expense += expenses
                        .iter()
                        .filter(|e| month_of(&e.date) == Some(month))
                        .filter(|e| in_category(&e.category))
                        .map(|e| parse_amount(&e.amount))
                        .sum::<f64>();
                }
                if keep_shared {
                    expense += pair_rows
                        .iter()
                        .filter(|r| month_of(&r.record.date) == Some(month))
                        .filter(|r| in_category(&r.record.category))
                        .map(|r| share_for_viewer(&r.record, &self.user_email).0)
                        .sum::<f64>();
                }
                TrendPoint {
                    month: month.to_string(),
                    label: month.label(),
                    income,
                    expense,
                }
            })
            .collect()
    }
}
