use super::tables::TaxSchedule;

const PROVISIONAL_BASE_THRESHOLD: f64 = 32_000.0;
const PROVISIONAL_UPPER_THRESHOLD: f64 = 44_000.0;
/// Fixed amount from the 50% tier added to the 85% tier: half of 6,000, or
/// 3,000.
const FIFTY_PERCENT_TIER_CARRY: f64 = 6_000.0 * 0.5;
const GROSS_UP_SEED: f64 = 1.3;
const GROSS_UP_ITERATIONS: usize = 5;

pub fn federal_income_tax(schedule: &TaxSchedule, taxable_income: f64) -> f64 {
    match schedule {
        TaxSchedule::Flat(rate) => taxable_income * rate,
        TaxSchedule::Brackets(brackets) => {
            let mut tax = 0.0;
            for bracket in brackets {
                if taxable_income <= bracket.lower {
                    break;
                }
                let in_bracket =
                    (taxable_income - bracket.lower).min(bracket.upper - bracket.lower);
                tax += in_bracket * bracket.rate;
            }
            tax
        }
    }
}

/// Portion of a Social Security benefit that is taxable at the given
/// provisional income.
pub fn taxable_social_security(benefit: f64, provisional_income: f64) -> f64 {
    if provisional_income <= PROVISIONAL_BASE_THRESHOLD {
        0.0
    } else if provisional_income <= PROVISIONAL_UPPER_THRESHOLD {
        (benefit * 0.5).min((provisional_income - PROVISIONAL_BASE_THRESHOLD) * 0.5)
    } else {
        (benefit * 0.85).min(
            FIFTY_PERCENT_TIER_CARRY + (provisional_income - PROVISIONAL_UPPER_THRESHOLD) * 0.85,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrossUp {
    pub pre_tax_income: f64,
    pub tax: f64,
}

/// Pre-tax income needed so that `target_after_tax` remains after federal tax,
/// given `ss_income` of Social Security. Fixed-point iteration seeded at 130%
/// of the target.
pub fn estimate_pre_tax_income_needed(
    schedule: &TaxSchedule,
    standard_deduction: f64,
    target_after_tax: f64,
    ss_income: f64,
) -> GrossUp {
    let mut pre_tax_income = target_after_tax * GROSS_UP_SEED;
    let mut tax = 0.0;
    for _ in 0..GROSS_UP_ITERATIONS {
        let other_income = pre_tax_income - ss_income;
        let provisional_income = ss_income * 0.5 + other_income;
        let taxable_ss = taxable_social_security(ss_income, provisional_income);
        let taxable_income = (other_income + taxable_ss - standard_deduction).max(0.0);
        tax = federal_income_tax(schedule, taxable_income);
        pre_tax_income = target_after_tax + tax;
    }
    GrossUp {
        pre_tax_income,
        tax,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tables::TaxBracket;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn two_brackets() -> TaxSchedule {
        TaxSchedule::Brackets(vec![
            TaxBracket {
                lower: 0.0,
                upper: 10_275.0,
                rate: 0.10,
            },
            TaxBracket {
                lower: 10_275.0,
                upper: 41_775.0,
                rate: 0.12,
            },
        ])
    }

    #[test]
    fn brackets_apply_progressively() {
        // 10_275 * 10% + (20_000 - 10_275) * 12% = 1_027.5 + 1_167
        assert_approx(federal_income_tax(&two_brackets(), 20_000.0), 2_194.5);
        assert_approx(federal_income_tax(&two_brackets(), 0.0), 0.0);
    }

    #[test]
    fn income_above_last_bracket_is_capped_at_last_upper_bound() {
        let tax = federal_income_tax(&two_brackets(), 100_000.0);
        assert_approx(tax, 1_027.5 + 31_500.0 * 0.12);
    }

    #[test]
    fn flat_fallback_taxes_everything_at_rate() {
        assert_approx(
            federal_income_tax(&TaxSchedule::fallback(), 20_000.0),
            20_000.0 * 0.24,
        );
    }

    #[test]
    fn taxable_social_security_tiers() {
        assert_approx(taxable_social_security(24_000.0, 30_000.0), 0.0);
        // 50% tier: min(12_000, (40_000 - 32_000) / 2)
        assert_approx(taxable_social_security(24_000.0, 40_000.0), 4_000.0);
        // 85% tier: min(20_400, 3_000 + 6_000 * 0.85)
        assert_approx(taxable_social_security(24_000.0, 50_000.0), 8_100.0);
        assert_approx(taxable_social_security(24_000.0, 200_000.0), 20_400.0);
    }

    #[test]
    fn upper_tier_starts_from_three_thousand() {
        assert_approx(FIFTY_PERCENT_TIER_CARRY, 3_000.0);
        assert_approx(taxable_social_security(100_000.0, 44_000.0), 6_000.0);
        assert_approx(taxable_social_security(100_000.0, 44_100.0), 3_085.0);
    }

    #[test]
    fn gross_up_exceeds_target_by_the_tax() {
        let result = estimate_pre_tax_income_needed(&two_brackets(), 13_850.0, 50_000.0, 20_000.0);
        assert!(result.pre_tax_income > 50_000.0);
        assert_approx(result.pre_tax_income, 50_000.0 + result.tax);
    }

    #[test]
    fn gross_up_with_zero_tax_returns_target() {
        let no_tax = TaxSchedule::Flat(0.0);
        let result = estimate_pre_tax_income_needed(&no_tax, 13_850.0, 50_000.0, 0.0);
        assert_approx(result.pre_tax_income, 50_000.0);
        assert_approx(result.tax, 0.0);
    }

    #[test]
    fn gross_up_below_standard_deduction_is_untaxed() {
        let result = estimate_pre_tax_income_needed(&TaxSchedule::fallback(), 27_700.0, 10_000.0, 0.0);
        assert_approx(result.tax, 0.0);
        assert_approx(result.pre_tax_income, 10_000.0);
    }
}
