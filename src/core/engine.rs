use super::benefits::{adjusted_monthly_benefit, annual_benefit_received};
use super::report::build_strategy_report;
use super::tables::{LookupTables, RmdSchedule};
use super::tax::estimate_pre_tax_income_needed;
use super::types::{Assumptions, Comparison, Inputs, ProjectionYear, StrategyProjection};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Withdrawals {
    retirement: f64,
    non_retirement: f64,
    excess_deposit: f64,
    shortfall: f64,
}

/// Run both claiming strategies and assemble their master tables.
pub fn run_comparison(
    inputs: &Inputs,
    assumptions: &Assumptions,
    tables: &LookupTables,
) -> Comparison {
    let strategies = inputs.claim_ages.map(|claim_age| {
        let projection = run_claim_strategy(inputs, assumptions, tables, claim_age);
        build_strategy_report(inputs, assumptions, tables, projection)
    });
    Comparison {
        assumptions: *assumptions,
        strategies,
    }
}

/// Simulate one claiming strategy from the current age through the horizon age.
///
/// Year 0 only records the starting balances. From year 1 on, the after-tax
/// income target is grossed up for tax, Social Security covers what it can and
/// the rest comes from the RMD, then the 401k, then non-retirement savings.
pub fn run_claim_strategy(
    inputs: &Inputs,
    assumptions: &Assumptions,
    tables: &LookupTables,
    claim_age: u32,
) -> StrategyProjection {
    let monthly_benefit =
        adjusted_monthly_benefit(assumptions, inputs.fra_monthly_benefit, claim_age);
    let standard_deduction = inputs.filing_status.standard_deduction();
    let growth = 1.0 + inputs.real_return();

    let ages = inputs.current_age..=assumptions.horizon_age;
    let mut years: Vec<ProjectionYear> = Vec::with_capacity(ages.clone().count());
    let mut cumulative_social_security = 0.0;

    for (index, age) in ages.enumerate() {
        let year = assumptions.year_for_index(index);
        let social_security =
            annual_benefit_received(assumptions, monthly_benefit, claim_age, age, year);
        cumulative_social_security += social_security;

        let Some(prior) = years.last().copied() else {
            years.push(ProjectionYear {
                age,
                year,
                social_security,
                cumulative_social_security,
                retirement_balance: inputs.retirement_start,
                non_retirement_balance: inputs.non_retirement_start,
                ..ProjectionYear::default()
            });
            continue;
        };

        let gross_up = estimate_pre_tax_income_needed(
            &tables.tax,
            standard_deduction,
            inputs.target_after_tax_income,
            social_security,
        );
        let need = (gross_up.pre_tax_income - social_security).max(0.0);

        // RMDs are set on nominal balances; convert there and back.
        let price_index = (1.0 + inputs.inflation_rate).powi(index as i32);
        let rmd = required_minimum_distribution(
            assumptions,
            &tables.rmd,
            age,
            prior.retirement_balance * price_index,
        ) / price_index;

        let draw = plan_withdrawals(
            need,
            rmd,
            prior.retirement_balance,
            prior.non_retirement_balance,
        );

        years.push(ProjectionYear {
            age,
            year,
            social_security,
            cumulative_social_security,
            rmd,
            retirement_withdrawal: draw.retirement,
            non_retirement_withdrawal: draw.non_retirement,
            excess_deposit: draw.excess_deposit,
            shortfall: draw.shortfall,
            estimated_tax: gross_up.tax,
            retirement_balance: (prior.retirement_balance * growth - draw.retirement).max(0.0),
            non_retirement_balance: (prior.non_retirement_balance * growth
                - draw.non_retirement
                + draw.excess_deposit)
                .max(0.0),
        });
    }

    StrategyProjection {
        claim_age,
        monthly_benefit,
        years,
    }
}

pub fn required_minimum_distribution(
    assumptions: &Assumptions,
    schedule: &RmdSchedule,
    age: u32,
    balance: f64,
) -> f64 {
    if age < assumptions.rmd_start_age {
        return 0.0;
    }
    balance / schedule.divisor(age)
}

fn plan_withdrawals(
    need: f64,
    rmd: f64,
    retirement_prior: f64,
    non_retirement_prior: f64,
) -> Withdrawals {
    let mut draw = Withdrawals {
        retirement: rmd,
        ..Withdrawals::default()
    };

    if rmd > need {
        draw.excess_deposit = rmd - need;
        return draw;
    }

    let mut remaining = need - rmd;
    if remaining > 0.0 && retirement_prior > rmd {
        let extra = remaining.min(retirement_prior - rmd);
        draw.retirement += extra;
        remaining -= extra;
    }
    if remaining > 0.0 && non_retirement_prior > 0.0 {
        let from_savings = remaining.min(non_retirement_prior);
        draw.non_retirement = from_savings;
        remaining -= from_savings;
    }
    draw.shortfall = remaining.max(0.0);
    draw
}
