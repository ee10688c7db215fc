use super::benefits::scheduled_benefit_pct;
use super::tables::LookupTables;
use super::tax::{federal_income_tax, taxable_social_security};
use super::types::{
    Assumptions, Inputs, ProjectionYear, ReportRow, StrategyProjection, StrategyReport, SummaryRow,
};

pub fn build_strategy_report(
    inputs: &Inputs,
    assumptions: &Assumptions,
    tables: &LookupTables,
    projection: StrategyProjection,
) -> StrategyReport {
    let rows = projection
        .years
        .iter()
        .enumerate()
        .map(|(index, year)| master_row(inputs, assumptions, tables, index, year))
        .collect();
    let summary = summarize(&projection);
    StrategyReport {
        projection,
        rows,
        summary,
    }
}

/// Recompute a year's tax from the withdrawals actually taken, splitting
/// savings withdrawals into gain and returned basis.
fn master_row(
    inputs: &Inputs,
    assumptions: &Assumptions,
    tables: &LookupTables,
    index: usize,
    year: &ProjectionYear,
) -> ReportRow {
    let standard_deduction = inputs.filing_status.standard_deduction();
    let gain_share = inputs.non_retirement_gain_share;

    let rmd = year.rmd;
    let additional_retirement_withdrawal = if index == 0 {
        0.0
    } else {
        (year.retirement_withdrawal - rmd).max(0.0)
    };
    let non_retirement_withdrawal = year.non_retirement_withdrawal;
    let capital_gains = non_retirement_withdrawal * gain_share;
    let cost_basis = non_retirement_withdrawal * (1.0 - gain_share);

    let social_security = year.social_security;
    let taxable_social_security = if social_security > 0.0 {
        let provisional_income =
            rmd + additional_retirement_withdrawal + cost_basis + social_security * 0.5;
        taxable_social_security(social_security, provisional_income)
    } else {
        0.0
    };

    let agi = rmd + additional_retirement_withdrawal + taxable_social_security + capital_gains;
    let taxable_income = (agi - standard_deduction).max(0.0);
    let income_tax = federal_income_tax(&tables.tax, taxable_income);
    let total_tax = income_tax;

    let total_income =
        social_security + rmd + non_retirement_withdrawal + additional_retirement_withdrawal;
    let after_tax_income = total_income - total_tax;
    let target_after_tax = inputs.target_after_tax_income;

    ReportRow {
        age: year.age,
        year: year.year,
        scheduled_benefit_pct: scheduled_benefit_pct(assumptions, year.year),
        social_security,
        taxable_social_security,
        rmd,
        non_retirement_withdrawal,
        capital_gains,
        additional_retirement_withdrawal,
        total_income,
        agi,
        standard_deduction,
        taxable_income,
        income_tax,
        total_tax,
        after_tax_income,
        target_after_tax,
        excess_deposited: (after_tax_income - target_after_tax).max(0.0),
        retirement_balance: year.retirement_balance,
        non_retirement_balance: year.non_retirement_balance,
        total_portfolio: year.retirement_balance + year.non_retirement_balance,
        shortfall: year.shortfall,
    }
}

fn summarize(projection: &StrategyProjection) -> SummaryRow {
    let final_retirement_balance = projection.final_retirement_balance();
    let final_non_retirement_balance = projection.final_non_retirement_balance();
    SummaryRow {
        claim_age: projection.claim_age,
        monthly_benefit: projection.monthly_benefit,
        final_retirement_balance,
        final_non_retirement_balance,
        final_portfolio_total: final_retirement_balance + final_non_retirement_balance,
        total_taxes_paid: projection.total_estimated_tax(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tables::{RmdSchedule, TaxBracket, TaxSchedule};
    use crate::core::types::{FilingStatus, ReportColumn};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_inputs() -> Inputs {
        Inputs {
            session_id: "test".to_string(),
            current_age: 72,
            claim_ages: [67, 70],
            fra_monthly_benefit: 2_000.0,
            inflation_rate: 0.02,
            investment_return: 0.05,
            filing_status: FilingStatus::Single,
            retirement_start: 1_000_000.0,
            non_retirement_start: 250_000.0,
            target_after_tax_income: 50_000.0,
            non_retirement_gain_share: 0.25,
        }
    }

    fn ten_percent_tables() -> LookupTables {
        LookupTables {
            tax: TaxSchedule::Brackets(vec![TaxBracket {
                lower: 0.0,
                upper: 1_000_000.0,
                rate: 0.10,
            }]),
            rmd: RmdSchedule::Fallback,
        }
    }

    fn projection_of(years: Vec<ProjectionYear>) -> StrategyProjection {
        StrategyProjection {
            claim_age: 67,
            monthly_benefit: 2_000.0,
            years,
        }
    }

    #[test]
    fn splits_401k_withdrawal_into_rmd_and_additional() {
        let year = ProjectionYear {
            age: 75,
            year: 2028,
            social_security: 24_000.0,
            rmd: 20_000.0,
            retirement_withdrawal: 30_000.0,
            non_retirement_withdrawal: 8_000.0,
            retirement_balance: 900_000.0,
            non_retirement_balance: 200_000.0,
            ..ProjectionYear::default()
        };
        let report = build_strategy_report(
            &sample_inputs(),
            &Assumptions::default(),
            &ten_percent_tables(),
            projection_of(vec![ProjectionYear::default(), year]),
        );
        let row = report.rows[1];

        assert_approx(row.rmd, 20_000.0);
        assert_approx(row.additional_retirement_withdrawal, 10_000.0);
        assert_approx(row.capital_gains, 2_000.0);
        // provisional = 20k + 10k + 6k basis + 12k = 48k -> 3_000 + 4k * 0.85
        assert_approx(row.taxable_social_security, 6_400.0);
        assert_approx(row.agi, 20_000.0 + 10_000.0 + 6_400.0 + 2_000.0);
        assert_approx(row.taxable_income, row.agi - 13_850.0);
        assert_approx(row.income_tax, row.taxable_income * 0.10);
        assert_approx(row.total_tax, row.income_tax);
        assert_approx(row.total_income, 24_000.0 + 20_000.0 + 8_000.0 + 10_000.0);
        assert_approx(row.after_tax_income, row.total_income - row.total_tax);
        assert_approx(row.excess_deposited, row.after_tax_income - 50_000.0);
        assert_approx(row.total_portfolio, 1_100_000.0);
        assert_approx(row.scheduled_benefit_pct, 100.0);
    }

    #[test]
    fn no_social_security_means_no_taxable_social_security() {
        let year = ProjectionYear {
            age: 66,
            year: 2035,
            retirement_withdrawal: 10_000.0,
            ..ProjectionYear::default()
        };
        let report = build_strategy_report(
            &sample_inputs(),
            &Assumptions::default(),
            &ten_percent_tables(),
            projection_of(vec![ProjectionYear::default(), year]),
        );
        let row = report.rows[1];
        assert_approx(row.taxable_social_security, 0.0);
        assert_approx(row.additional_retirement_withdrawal, 10_000.0);
        assert_approx(row.taxable_income, 0.0);
        assert_approx(row.excess_deposited, 0.0);
        assert_approx(row.scheduled_benefit_pct, 75.0);
    }

    #[test]
    fn summary_reports_final_balances_and_total_estimated_tax() {
        let years = vec![
            ProjectionYear {
                retirement_balance: 10.0,
                non_retirement_balance: 5.0,
                ..ProjectionYear::default()
            },
            ProjectionYear {
                estimated_tax: 3.0,
                retirement_balance: 7.0,
                non_retirement_balance: 2.0,
                ..ProjectionYear::default()
            },
            ProjectionYear {
                estimated_tax: 4.0,
                retirement_balance: 6.0,
                non_retirement_balance: 1.0,
                ..ProjectionYear::default()
            },
        ];
        let report = build_strategy_report(
            &sample_inputs(),
            &Assumptions::default(),
            &ten_percent_tables(),
            projection_of(years),
        );
        assert_eq!(report.summary.claim_age, 67);
        assert_approx(report.summary.final_retirement_balance, 6.0);
        assert_approx(report.summary.final_non_retirement_balance, 1.0);
        assert_approx(report.summary.final_portfolio_total, 7.0);
        assert_approx(report.summary.total_taxes_paid, 7.0);
    }

    #[test]
    fn column_labels_carry_plan_year_dollars() {
        let assumptions = Assumptions::default();
        let labels = ReportColumn::ALL
            .iter()
            .map(|c| c.label(&assumptions))
            .collect::<Vec<_>>();
        assert_eq!(labels[0], "Age");
        assert_eq!(labels[2], "% of Scheduled SS");
        assert_eq!(labels[3], "Social Security (2025$)");
        assert_eq!(labels[18], "401k Balance (2025$)");
        assert_eq!(labels[20], "Total Portfolio (2025$)");
    }
}
