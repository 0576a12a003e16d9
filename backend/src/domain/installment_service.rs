//! Installment expansion for credit purchases.
//!
//! A purchase in N installments becomes N dated payments, one per
//! consecutive statement month starting at the statement the purchase
//! falls into. The per-installment amount is a plain division of the
//! total; the last installment is not adjusted for rounding.

use chrono::NaiveDate;
use shared::Card;

use crate::domain::calendar::YearMonth;
use crate::domain::cycle_service::BillingCycleService;
use crate::domain::money::format_money;

/// One scheduled installment of a credit purchase. Derived data, never
/// persisted on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct Installment {
    /// 1-based installment number.
    pub number: u32,
    pub count: u32,
    pub statement_month: YearMonth,
    pub close_date: NaiveDate,
    pub due_date: NaiveDate,
    /// Amount of this installment (total / count).
    pub amount: f64,
    /// Balance still owed after paying this installment.
    pub remaining: f64,
    /// Viewer's share of this installment.
    pub my_share: f64,
    /// Counterpart's share of this installment.
    pub partner_share: f64,
    /// Display annotation: "Cuota 2/6 • Pendiente: $ 800,00".
    pub annotation: String,
}

/// Inputs for expanding one purchase.
#[derive(Debug, Clone)]
pub struct PurchasePlan<'a> {
    pub purchase_date: NaiveDate,
    pub card: &'a Card,
    pub installment_count: u32,
    pub total: f64,
    /// Purchase-level shares for a shared purchase. `None` means the
    /// whole installment is the viewer's.
    pub my_share: Option<f64>,
    pub partner_share: Option<f64>,
}

#[derive(Clone)]
pub struct InstallmentService {
    cycles: BillingCycleService,
    currency: String,
}

impl InstallmentService {
    pub fn new(cycles: BillingCycleService, currency: impl Into<String>) -> Self {
        Self {
            cycles,
            currency: currency.into(),
        }
    }

    pub fn cycles(&self) -> &BillingCycleService {
        &self.cycles
    }

    /// Expand a purchase into its installment schedule.
    ///
    /// Always yields `max(1, installment_count)` entries. The share
    /// percentages are purchase-level: each installment carries the
    /// same fraction of the viewer/partner split.
    pub fn expand(&self, plan: &PurchasePlan<'_>) -> Vec<Installment> {
        let count = plan.installment_count.max(1);
        let per_installment = plan.total / count as f64;
        let first_statement = self
            .cycles
            .statement_month_for_purchase(plan.purchase_date, plan.card);

        (0..count)
            .map(|i| {
                let number = i + 1;
                let statement_month = first_statement.add_months(i as i32);
                let cycle = self.cycles.close_and_due_for(plan.card, statement_month);
                let remaining = (plan.total - per_installment * number as f64).max(0.0);
                let my_share = match plan.my_share {
                    Some(mine) => mine / count as f64,
                    None => per_installment,
                };
                let partner_share = match plan.partner_share {
                    Some(partner) => partner / count as f64,
                    None => 0.0,
                };
                Installment {
                    number,
                    count,
                    statement_month,
                    close_date: cycle.close_date,
                    due_date: cycle.due_date,
                    amount: per_installment,
                    remaining,
                    my_share,
                    partner_share,
                    annotation: format!(
                        "Cuota {number}/{count} • Pendiente: {}",
                        format_money(remaining, &self.currency)
                    ),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::json::test_utils::TestEnvironment;
    use crate::storage::json::CycleOverrideRepository;
    use shared::CycleOverride;

    fn card(close_day: &str, due_day: &str) -> Card {
        Card {
            id: "card-1".into(),
            bank: "Galicia".into(),
            last_four: "1234".into(),
            credit_limit: String::new(),
            close_day: close_day.into(),
            due_day: due_day.into(),
            network: "visa".into(),
        }
    }

    fn service(env: &TestEnvironment) -> InstallmentService {
        let repo = CycleOverrideRepository::new(env.connection.clone());
        InstallmentService::new(BillingCycleService::new(repo, "ana@mail.com"), "ARS")
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn six_installments_of_1200_track_remaining_balance() {
        let env = TestEnvironment::new().unwrap();
        let svc = service(&env);
        let tarjeta = card("25", "10");

        let schedule = svc.expand(&PurchasePlan {
            purchase_date: date(2024, 1, 10),
            card: &tarjeta,
            installment_count: 6,
            total: 1200.0,
            my_share: None,
            partner_share: None,
        });

        assert_eq!(schedule.len(), 6);
        let remaining: Vec<f64> = schedule.iter().map(|c| c.remaining).collect();
        assert_eq!(remaining, vec![1000.0, 800.0, 600.0, 400.0, 200.0, 0.0]);
        for cuota in &schedule {
            assert_eq!(cuota.amount, 200.0);
            assert_eq!(cuota.my_share, 200.0);
            assert_eq!(cuota.partner_share, 0.0);
        }
        assert_eq!(schedule[0].statement_month, YearMonth::new(2024, 1));
        assert_eq!(schedule[5].statement_month, YearMonth::new(2024, 6));
        assert_eq!(schedule[0].annotation, "Cuota 1/6 • Pendiente: $ 1.000,00");
    }

    #[test]
    fn purchase_after_close_shifts_the_whole_schedule() {
        let env = TestEnvironment::new().unwrap();
        let svc = service(&env);
        let tarjeta = card("15", "5");

        // Bought March 20, after the March 15 close: first statement is
        // April, so payments fall due May through July.
        let schedule = svc.expand(&PurchasePlan {
            purchase_date: date(2024, 3, 20),
            card: &tarjeta,
            installment_count: 3,
            total: 300.0,
            my_share: None,
            partner_share: None,
        });

        let due_months: Vec<YearMonth> = schedule
            .iter()
            .map(|c| YearMonth::of(c.due_date))
            .collect();
        assert_eq!(
            due_months,
            vec![
                YearMonth::new(2024, 5),
                YearMonth::new(2024, 6),
                YearMonth::new(2024, 7)
            ]
        );
        assert_eq!(schedule[0].due_date, date(2024, 5, 5));
    }

    #[test]
    fn zero_installments_become_a_single_payment() {
        let env = TestEnvironment::new().unwrap();
        let svc = service(&env);
        let tarjeta = card("25", "10");

        let schedule = svc.expand(&PurchasePlan {
            purchase_date: date(2024, 1, 10),
            card: &tarjeta,
            installment_count: 0,
            total: 500.0,
            my_share: None,
            partner_share: None,
        });
        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule[0].amount, 500.0);
        assert_eq!(schedule[0].remaining, 0.0);
    }

    #[test]
    fn shared_purchase_splits_each_installment_by_purchase_level_shares() {
        let env = TestEnvironment::new().unwrap();
        let svc = service(&env);
        let tarjeta = card("25", "10");

        let schedule = svc.expand(&PurchasePlan {
            purchase_date: date(2024, 1, 10),
            card: &tarjeta,
            installment_count: 4,
            total: 1000.0,
            my_share: Some(600.0),
            partner_share: Some(400.0),
        });

        for cuota in &schedule {
            assert!((cuota.my_share - 150.0).abs() < 1e-9);
            assert!((cuota.partner_share - 100.0).abs() < 1e-9);
            assert!((cuota.my_share + cuota.partner_share - cuota.amount).abs() < 1e-9);
        }
    }

    #[test]
    fn installments_honor_monthly_overrides() {
        let env = TestEnvironment::new().unwrap();
        let svc = service(&env);
        let tarjeta = card("25", "10");

        // The February statement was manually moved.
        svc.cycles()
            .set_override(
                "card-1",
                YearMonth::new(2024, 2),
                CycleOverride {
                    close_date: date(2024, 2, 20),
                    due_date: date(2024, 3, 15),
                },
            )
            .unwrap();

        let schedule = svc.expand(&PurchasePlan {
            purchase_date: date(2024, 1, 10),
            card: &tarjeta,
            installment_count: 3,
            total: 300.0,
            my_share: None,
            partner_share: None,
        });

        assert_eq!(schedule[0].due_date, date(2024, 2, 10));
        assert_eq!(schedule[1].close_date, date(2024, 2, 20));
        assert_eq!(schedule[1].due_date, date(2024, 3, 15));
        assert_eq!(schedule[2].due_date, date(2024, 4, 10));
    }

    #[test]
    fn uneven_totals_are_not_rounding_corrected() {
        let env = TestEnvironment::new().unwrap();
        let svc = service(&env);
        let tarjeta = card("25", "10");

        let schedule = svc.expand(&PurchasePlan {
            purchase_date: date(2024, 1, 10),
            card: &tarjeta,
            installment_count: 3,
            total: 100.0,
            my_share: None,
            partner_share: None,
        });

        // 100/3 on every installment; the schedule sum may drift from
        // the total by fractions of a cent and that is accepted.
        for cuota in &schedule {
            assert!((cuota.amount - 100.0 / 3.0).abs() < 1e-9);
        }
        assert_eq!(schedule[2].remaining, 0.0);
    }
}
