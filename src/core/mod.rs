mod benefits;
mod engine;
mod report;
pub mod tables;
mod tax;
mod types;

pub use benefits::{adjusted_monthly_benefit, scheduled_benefit_pct, trust_fund_factor};
pub use engine::{required_minimum_distribution, run_claim_strategy, run_comparison};
pub use report::build_strategy_report;
pub use tables::{LookupTables, TableError};
pub use tax::{
    GrossUp, estimate_pre_tax_income_needed, federal_income_tax, taxable_social_security,
};
pub use types::{
    Assumptions, Comparison, FilingStatus, Inputs, ProjectionYear, ReportColumn, ReportRow,
    StrategyProjection, StrategyReport, SummaryRow,
};
