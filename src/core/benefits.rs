use super::types::Assumptions;

/// Monthly benefit when claiming at `claim_age`, given the benefit payable at
/// full retirement age.
pub fn adjusted_monthly_benefit(assumptions: &Assumptions, fra_benefit: f64, claim_age: u32) -> f64 {
    let fra = assumptions.full_retirement_age;
    let factor = if claim_age < fra {
        let months_early = f64::from((fra - claim_age) * 12);
        1.0 - months_early * assumptions.early_reduction_per_month
    } else if claim_age > fra {
        let months_late = f64::from((claim_age - fra) * 12);
        1.0 + months_late * assumptions.delayed_credit_per_month
    } else {
        1.0
    };
    fra_benefit * factor
}

/// Share of scheduled benefits payable in `year` once the trust fund is depleted.
pub fn trust_fund_factor(assumptions: &Assumptions, year: i32) -> f64 {
    if year >= assumptions.trust_fund_depletion_year {
        assumptions.depleted_benefit_factor
    } else {
        1.0
    }
}

pub fn scheduled_benefit_pct(assumptions: &Assumptions, year: i32) -> f64 {
    trust_fund_factor(assumptions, year) * 100.0
}

/// Annual Social Security received at `age` in `year`; zero before the claim age.
pub fn annual_benefit_received(
    assumptions: &Assumptions,
    monthly_benefit: f64,
    claim_age: u32,
    age: u32,
    year: i32,
) -> f64 {
    if age < claim_age {
        return 0.0;
    }
    monthly_benefit * 12.0 * trust_fund_factor(assumptions, year)
}
