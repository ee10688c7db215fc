use std::fmt;
use std::str::FromStr;

use serde::Serialize;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub enum FilingStatus {
    #[default]
    Single,
    MarriedFilingJointly,
    MarriedFilingSeparately,
    HeadOfHousehold,
}

impl FilingStatus {
    pub fn standard_deduction(self) -> f64 {
        match self {
            FilingStatus::Single => 13_850.0,
            FilingStatus::MarriedFilingJointly => 27_700.0,
            FilingStatus::MarriedFilingSeparately => 13_850.0,
            FilingStatus::HeadOfHousehold => 20_800.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FilingStatus::Single => "Single",
            FilingStatus::MarriedFilingJointly => "Married Filing Jointly",
            FilingStatus::MarriedFilingSeparately => "Married Filing Separately",
            FilingStatus::HeadOfHousehold => "Head of Household",
        }
    }

    /// Unrecognised labels are treated as `Single`, matching the standard-deduction
    /// default used by the calculator.
    pub fn parse_lenient(value: &str) -> Self {
        value.parse().unwrap_or_else(|_| {
            tracing::warn!(filing_status = value, "unknown filing status, using Single");
            FilingStatus::Single
        })
    }
}

impl fmt::Display for FilingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FilingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .trim()
            .to_ascii_lowercase()
            .replace(['-', '_'], " ");
        match normalized.as_str() {
            "single" => Ok(FilingStatus::Single),
            "married filing jointly" | "mfj" => Ok(FilingStatus::MarriedFilingJointly),
            "married filing separately" | "mfs" => Ok(FilingStatus::MarriedFilingSeparately),
            "head of household" | "hoh" => Ok(FilingStatus::HeadOfHousehold),
            _ => Err(format!("unknown filing status: {s}")),
        }
    }
}

/// Fixed modelling assumptions shared by every request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Assumptions {
    /// Year treated as "today"; all amounts are in this year's dollars.
    pub plan_year: i32,
    pub horizon_age: u32,
    pub full_retirement_age: u32,
    pub early_reduction_per_month: f64,
    pub delayed_credit_per_month: f64,
    pub trust_fund_depletion_year: i32,
    pub depleted_benefit_factor: f64,
    pub rmd_start_age: u32,
}

impl Default for Assumptions {
    fn default() -> Self {
        Self {
            plan_year: 2025,
            horizon_age: 95,
            full_retirement_age: 67,
            early_reduction_per_month: 0.00556,
            delayed_credit_per_month: 0.00667,
            trust_fund_depletion_year: 2033,
            depleted_benefit_factor: 0.75,
            rmd_start_age: 73,
        }
    }
}

impl Assumptions {
    pub fn year_for_index(&self, index: usize) -> i32 {
        self.plan_year + index as i32
    }

    /// Column suffix for amounts in plan-year dollars, e.g. `(2025$)`.
    pub fn dollar_tag(&self) -> String {
        format!("({}$)", self.plan_year)
    }
}

#[derive(Debug, Clone)]
pub struct Inputs {
    pub session_id: String,
    pub current_age: u32,
    pub claim_ages: [u32; 2],
    pub fra_monthly_benefit: f64,
    pub inflation_rate: f64,
    pub investment_return: f64,
    pub filing_status: FilingStatus,
    pub retirement_start: f64,
    pub non_retirement_start: f64,
    pub target_after_tax_income: f64,
    pub non_retirement_gain_share: f64,
}

impl Inputs {
    pub fn real_return(&self) -> f64 {
        (1.0 + self.investment_return) / (1.0 + self.inflation_rate) - 1.0
    }
}

/// One simulated year of a claiming strategy, in plan-year dollars.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ProjectionYear {
    pub age: u32,
    pub year: i32,
    pub social_security: f64,
    pub cumulative_social_security: f64,
    pub rmd: f64,
    pub retirement_withdrawal: f64,
    pub non_retirement_withdrawal: f64,
    pub excess_deposit: f64,
    pub shortfall: f64,
    pub estimated_tax: f64,
    pub retirement_balance: f64,
    pub non_retirement_balance: f64,
}

#[derive(Debug, Clone)]
pub struct StrategyProjection {
    pub claim_age: u32,
    pub monthly_benefit: f64,
    pub years: Vec<ProjectionYear>,
}

impl StrategyProjection {
    pub fn final_retirement_balance(&self) -> f64 {
        self.years.last().map_or(0.0, |y| y.retirement_balance)
    }

    pub fn final_non_retirement_balance(&self) -> f64 {
        self.years.last().map_or(0.0, |y| y.non_retirement_balance)
    }

    pub fn total_estimated_tax(&self) -> f64 {
        self.years.iter().map(|y| y.estimated_tax).sum()
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ReportColumn {
    Age,
    Year,
    ScheduledBenefitPct,
    SocialSecurity,
    TaxableSocialSecurity,
    Rmd,
    NonRetirementWithdrawal,
    CapitalGains,
    AdditionalRetirementWithdrawal,
    TotalIncome,
    Agi,
    StandardDeduction,
    TaxableIncome,
    IncomeTax,
    TotalTax,
    AfterTaxIncome,
    TargetAfterTax,
    ExcessDeposited,
    RetirementBalance,
    NonRetirementBalance,
    TotalPortfolio,
    Shortfall,
}

impl ReportColumn {
    pub const ALL: [ReportColumn; 22] = [
        ReportColumn::Age,
        ReportColumn::Year,
        ReportColumn::ScheduledBenefitPct,
        ReportColumn::SocialSecurity,
        ReportColumn::TaxableSocialSecurity,
        ReportColumn::Rmd,
        ReportColumn::NonRetirementWithdrawal,
        ReportColumn::CapitalGains,
        ReportColumn::AdditionalRetirementWithdrawal,
        ReportColumn::TotalIncome,
        ReportColumn::Agi,
        ReportColumn::StandardDeduction,
        ReportColumn::TaxableIncome,
        ReportColumn::IncomeTax,
        ReportColumn::TotalTax,
        ReportColumn::AfterTaxIncome,
        ReportColumn::TargetAfterTax,
        ReportColumn::ExcessDeposited,
        ReportColumn::RetirementBalance,
        ReportColumn::NonRetirementBalance,
        ReportColumn::TotalPortfolio,
        ReportColumn::Shortfall,
    ];

    fn base_label(self) -> &'static str {
        match self {
            ReportColumn::Age => "Age",
            ReportColumn::Year => "Year",
            ReportColumn::ScheduledBenefitPct => "% of Scheduled SS",
            ReportColumn::SocialSecurity => "Social Security",
            ReportColumn::TaxableSocialSecurity => "Taxable SS",
            ReportColumn::Rmd => "RMDs",
            ReportColumn::NonRetirementWithdrawal => "Non-Retirement Withdrawals",
            ReportColumn::CapitalGains => "Capital Gains",
            ReportColumn::AdditionalRetirementWithdrawal => "Additional 401k Withdrawals",
            ReportColumn::TotalIncome => "Total Income",
            ReportColumn::Agi => "AGI",
            ReportColumn::StandardDeduction => "Standard Deduction",
            ReportColumn::TaxableIncome => "Taxable Income",
            ReportColumn::IncomeTax => "Income Tax",
            ReportColumn::TotalTax => "Total Tax",
            ReportColumn::AfterTaxIncome => "After-Tax Income",
            ReportColumn::TargetAfterTax => "Target After-Tax",
            ReportColumn::ExcessDeposited => "Excess Deposited",
            ReportColumn::RetirementBalance => "401k Balance",
            ReportColumn::NonRetirementBalance => "Non-Retirement Balance",
            ReportColumn::TotalPortfolio => "Total Portfolio",
            ReportColumn::Shortfall => "Income Shortfall",
        }
    }

    pub fn is_currency(self) -> bool {
        !matches!(
            self,
            ReportColumn::Age | ReportColumn::Year | ReportColumn::ScheduledBenefitPct
        )
    }

    pub fn is_integer(self) -> bool {
        matches!(self, ReportColumn::Age | ReportColumn::Year)
    }

    pub fn label(self, assumptions: &Assumptions) -> String {
        if self.is_currency() {
            format!("{} {}", self.base_label(), assumptions.dollar_tag())
        } else {
            self.base_label().to_string()
        }
    }
}

/// A master-table row: one year's income, tax and balance breakdown.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReportRow {
    pub age: u32,
    pub year: i32,
    pub scheduled_benefit_pct: f64,
    pub social_security: f64,
    pub taxable_social_security: f64,
    pub rmd: f64,
    pub non_retirement_withdrawal: f64,
    pub capital_gains: f64,
    pub additional_retirement_withdrawal: f64,
    pub total_income: f64,
    pub agi: f64,
    pub standard_deduction: f64,
    pub taxable_income: f64,
    pub income_tax: f64,
    pub total_tax: f64,
    pub after_tax_income: f64,
    pub target_after_tax: f64,
    pub excess_deposited: f64,
    pub retirement_balance: f64,
    pub non_retirement_balance: f64,
    pub total_portfolio: f64,
    pub shortfall: f64,
}

impl ReportRow {
    pub fn value(&self, column: ReportColumn) -> f64 {
        match column {
            ReportColumn::Age => f64::from(self.age),
            ReportColumn::Year => f64::from(self.year),
            ReportColumn::ScheduledBenefitPct => self.scheduled_benefit_pct,
            ReportColumn::SocialSecurity => self.social_security,
            ReportColumn::TaxableSocialSecurity => self.taxable_social_security,
            ReportColumn::Rmd => self.rmd,
            ReportColumn::NonRetirementWithdrawal => self.non_retirement_withdrawal,
            ReportColumn::CapitalGains => self.capital_gains,
            ReportColumn::AdditionalRetirementWithdrawal => self.additional_retirement_withdrawal,
            ReportColumn::TotalIncome => self.total_income,
            ReportColumn::Agi => self.agi,
            ReportColumn::StandardDeduction => self.standard_deduction,
            ReportColumn::TaxableIncome => self.taxable_income,
            ReportColumn::IncomeTax => self.income_tax,
            ReportColumn::TotalTax => self.total_tax,
            ReportColumn::AfterTaxIncome => self.after_tax_income,
            ReportColumn::TargetAfterTax => self.target_after_tax,
            ReportColumn::ExcessDeposited => self.excess_deposited,
            ReportColumn::RetirementBalance => self.retirement_balance,
            ReportColumn::NonRetirementBalance => self.non_retirement_balance,
            ReportColumn::TotalPortfolio => self.total_portfolio,
            ReportColumn::Shortfall => self.shortfall,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SummaryRow {
    #[serde(rename = "Claiming Age")]
    pub claim_age: u32,
    #[serde(rename = "Monthly Benefit")]
    pub monthly_benefit: f64,
    #[serde(rename = "Final 401k Balance")]
    pub final_retirement_balance: f64,
    #[serde(rename = "Final Non-Retirement")]
    pub final_non_retirement_balance: f64,
    #[serde(rename = "Final Portfolio Total")]
    pub final_portfolio_total: f64,
    #[serde(rename = "Total Taxes Paid")]
    pub total_taxes_paid: f64,
}

impl SummaryRow {
    pub const HEADERS: [&'static str; 6] = [
        "Claiming Age",
        "Monthly Benefit",
        "Final 401k Balance",
        "Final Non-Retirement",
        "Final Portfolio Total",
        "Total Taxes Paid",
    ];

    pub fn values(&self) -> [f64; 6] {
        [
            f64::from(self.claim_age),
            self.monthly_benefit,
            self.final_retirement_balance,
            self.final_non_retirement_balance,
            self.final_portfolio_total,
            self.total_taxes_paid,
        ]
    }
}

#[derive(Debug, Clone)]
pub struct StrategyReport {
    pub projection: StrategyProjection,
    pub rows: Vec<ReportRow>,
    pub summary: SummaryRow,
}

#[derive(Debug, Clone)]
pub struct Comparison {
    pub assumptions: Assumptions,
    pub strategies: [StrategyReport; 2],
}
