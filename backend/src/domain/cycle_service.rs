//! Billing cycle resolution for credit cards.
//!
//! For a card and a statement month the service answers "when does
//! that statement close, and when is it due". A per-user local
//! override (set through the cycle-management UI) always wins; the
//! fallback is computed from the card's configured close/due days,
//! clamped to each month's length. The due date defaults to the month
//! after the close.

use anyhow::Result;
use chrono::NaiveDate;
use log::{info, warn};
use shared::{Card, CycleOverride};

use crate::domain::calendar::{make_date, YearMonth};
use crate::storage::json::CycleOverrideRepository;
use crate::storage::traits::{CycleOverrideMap, CycleOverrideStorage};

/// Resolved close/due dates for one card in one statement month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CyclePlan {
    pub close_date: NaiveDate,
    pub due_date: NaiveDate,
}

/// Card day cells come in as text; a blank or unparseable day falls
/// back to 1, matching the card form's defaults.
fn configured_day(raw: &str) -> u32 {
    match raw.trim().parse::<u32>() {
        Ok(0) | Err(_) => 1,
        Ok(day) => day,
    }
}

#[derive(Clone)]
pub struct BillingCycleService {
    repository: CycleOverrideRepository,
    user_email: String,
}

impl BillingCycleService {
    pub fn new(repository: CycleOverrideRepository, user_email: impl Into<String>) -> Self {
        Self {
            repository,
            user_email: user_email.into(),
        }
    }

    /// Overrides are re-read on every resolution so edits made through
    /// the cycle UI take effect immediately. A failing store degrades
    /// to "no overrides".
    fn overrides(&self) -> CycleOverrideMap {
        match self.repository.get_overrides(&self.user_email) {
            Ok(map) => map,
            Err(err) => {
                warn!("Could not read cycle overrides ({err}), using defaults");
                CycleOverrideMap::default()
            }
        }
    }

    /// Close/due dates for `card` in `statement_month`.
    pub fn close_and_due_for(&self, card: &Card, statement_month: YearMonth) -> CyclePlan {
        if let Some(o) = self
            .overrides()
            .get(&card.id)
            .and_then(|months| months.get(&statement_month.to_string()))
        {
            return CyclePlan {
                close_date: o.close_date,
                due_date: o.due_date,
            };
        }

        let close_date = make_date(
            statement_month.year,
            statement_month.month,
            configured_day(&card.close_day),
        );
        let due_month = statement_month.add_months(1);
        let due_date = make_date(
            due_month.year,
            due_month.month,
            configured_day(&card.due_day),
        );
        CyclePlan {
            close_date,
            due_date,
        }
    }

    /// The statement month a purchase belongs to: its own calendar
    /// month, unless the purchase happened strictly after that month's
    /// close date, in which case it rolls to the next statement.
    pub fn statement_month_for_purchase(&self, purchase_date: NaiveDate, card: &Card) -> YearMonth {
        let month = YearMonth::of(purchase_date);
        let plan = self.close_and_due_for(card, month);
        if purchase_date > plan.close_date {
            month.add_months(1)
        } else {
            month
        }
    }

    /// Set (or replace) the override for a card/month.
    pub fn set_override(
        &self,
        card_id: &str,
        month: YearMonth,
        cycle: CycleOverride,
    ) -> Result<()> {
        let mut map = self.repository.get_overrides(&self.user_email)?;
        map.entry(card_id.to_string())
            .or_default()
            .insert(month.to_string(), cycle);
        self.repository.save_overrides(&self.user_email, &map)?;
        info!("Set cycle override for card {card_id} in {month}");
        Ok(())
    }

    /// Remove the override for a card/month, reverting to the computed
    /// default. Returns whether anything was removed.
    pub fn clear_override(&self, card_id: &str, month: YearMonth) -> Result<bool> {
        let mut map = self.repository.get_overrides(&self.user_email)?;
        let removed = match map.get_mut(card_id) {
            Some(months) => months.remove(&month.to_string()).is_some(),
            None => false,
        };
        if removed {
            if map.get(card_id).is_some_and(|m| m.is_empty()) {
                map.remove(card_id);
            }
            self.repository.save_overrides(&self.user_email, &map)?;
            info!("Cleared cycle override for card {card_id} in {month}");
        }
        Ok(removed)
    }

    /// All overrides stored for a card, in chronological month order.
    /// Feeds the cycle-management listing.
    pub fn overrides_for_card(&self, card_id: &str) -> Vec<(YearMonth, CycleOverride)> {
        self.overrides()
            .get(card_id)
            .map(|months| {
                months
                    .iter()
                    .filter_map(|(ym, o)| ym.parse::<YearMonth>().ok().map(|ym| (ym, *o)))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::json::test_utils::TestEnvironment;

    fn card(close_day: &str, due_day: &str) -> Card {
        Card {
            id: "card-1".into(),
            bank: "Galicia".into(),
            last_four: "1234".into(),
            credit_limit: "500000".into(),
            close_day: close_day.into(),
            due_day: due_day.into(),
            network: "visa".into(),
        }
    }

    fn service(env: &TestEnvironment) -> BillingCycleService {
        let repo = CycleOverrideRepository::new(env.connection.clone());
        BillingCycleService::new(repo, "ana@mail.com")
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn default_cycle_clamps_close_day_to_the_month() {
        let env = TestEnvironment::new().unwrap();
        let svc = service(&env);
        let plan = svc.close_and_due_for(&card("31", "5"), YearMonth::new(2024, 2));
        assert_eq!(plan.close_date, date(2024, 2, 29));
        assert_eq!(plan.due_date, date(2024, 3, 5));
    }

    #[test]
    fn blank_day_configuration_falls_back_to_day_one() {
        let env = TestEnvironment::new().unwrap();
        let svc = service(&env);
        let plan = svc.close_and_due_for(&card("", "0"), YearMonth::new(2024, 6));
        assert_eq!(plan.close_date, date(2024, 6, 1));
        assert_eq!(plan.due_date, date(2024, 7, 1));
    }

    #[test]
    fn override_wins_over_configured_days_until_cleared() {
        let env = TestEnvironment::new().unwrap();
        let svc = service(&env);
        let tarjeta = card("15", "5");
        let month = YearMonth::new(2024, 4);

        svc.set_override(
            "card-1",
            month,
            CycleOverride {
                close_date: date(2024, 4, 20),
                due_date: date(2024, 5, 12),
            },
        )
        .unwrap();

        let plan = svc.close_and_due_for(&tarjeta, month);
        assert_eq!(plan.close_date, date(2024, 4, 20));
        assert_eq!(plan.due_date, date(2024, 5, 12));

        // Other months keep the defaults.
        let other = svc.close_and_due_for(&tarjeta, YearMonth::new(2024, 5));
        assert_eq!(other.close_date, date(2024, 5, 15));

        assert!(svc.clear_override("card-1", month).unwrap());
        let reverted = svc.close_and_due_for(&tarjeta, month);
        assert_eq!(reverted.close_date, date(2024, 4, 15));
        assert_eq!(reverted.due_date, date(2024, 5, 5));

        assert!(!svc.clear_override("card-1", month).unwrap());
    }

    #[test]
    fn purchase_after_close_rolls_to_next_statement() {
        let env = TestEnvironment::new().unwrap();
        let svc = service(&env);
        let tarjeta = card("15", "10");

        assert_eq!(
            svc.statement_month_for_purchase(date(2024, 3, 20), &tarjeta),
            YearMonth::new(2024, 4)
        );
        assert_eq!(
            svc.statement_month_for_purchase(date(2024, 3, 15), &tarjeta),
            YearMonth::new(2024, 3)
        );
        assert_eq!(
            svc.statement_month_for_purchase(date(2024, 3, 2), &tarjeta),
            YearMonth::new(2024, 3)
        );
    }

    #[test]
    fn overrides_for_card_lists_months_in_order() {
        let env = TestEnvironment::new().unwrap();
        let svc = service(&env);
        let o = CycleOverride {
            close_date: date(2024, 6, 18),
            due_date: date(2024, 7, 8),
        };
        svc.set_override("card-1", YearMonth::new(2024, 6), o).unwrap();
        svc.set_override("card-1", YearMonth::new(2024, 2), o).unwrap();
        svc.set_override("card-1", YearMonth::new(2023, 12), o).unwrap();

        let listed: Vec<YearMonth> = svc
            .overrides_for_card("card-1")
            .into_iter()
            .map(|(ym, _)| ym)
            .collect();
        assert_eq!(
            listed,
            vec![
                YearMonth::new(2023, 12),
                YearMonth::new(2024, 2),
                YearMonth::new(2024, 6)
            ]
        );
    }
}
