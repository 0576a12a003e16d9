//! Domain logic: money and date normalization, billing cycles,
//! installment expansion, shared-expense reconciliation, projections
//! and the dashboard rollup.

pub mod calendar;
pub mod cycle_service;
pub mod dashboard_service;
pub mod expense_service;
pub mod installment_service;
pub mod metadata;
pub mod money;
pub mod projection_service;
pub mod shared_service;

pub use calendar::YearMonth;
pub use cycle_service::{BillingCycleService, CyclePlan};
pub use dashboard_service::{DashboardQuery, DashboardScope, DashboardService, DashboardSummary};
pub use expense_service::{ExpenseService, SaveExpenseCommand, SaveExpenseResult};
pub use installment_service::{Installment, InstallmentService, PurchasePlan};
pub use metadata::{decode_meta, encode_meta, SharedMeta};
pub use money::{format_money, parse_amount};
pub use projection_service::{
    ExpenseKind, KindFilter, ProjectionQuery, ProjectionResult, ProjectionService,
    ProjectionWindow, ScheduledPayment,
};
pub use shared_service::SharedRow;
