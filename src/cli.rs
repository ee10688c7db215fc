use std::path::PathBuf;

use chrono::{Datelike, NaiveDate};
use clap::{Args, Parser, Subcommand};

use crate::core::{Assumptions, FilingStatus, Inputs};
use crate::export::validate_session_id;

pub const MIN_CLAIM_AGE: u32 = 62;
pub const MAX_CLAIM_AGE: u32 = 100;

#[derive(Parser, Debug)]
#[command(
    name = "claimcmp",
    about = "Compare two Social Security claiming ages by projecting retirement drawdown"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the HTTP API and companion page
    Serve(ServeArgs),
    /// Run one comparison, write the spreadsheet and print the JSON summary
    Analyze(AnalyzeArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[arg(long, help = "Bind host, overrides SS_HOST")]
    pub host: Option<String>,
    #[arg(long, help = "Bind port, overrides SS_PORT")]
    pub port: Option<u16>,
    #[arg(long, help = "Directory holding the tax bracket and RMD tables, overrides SS_DATA_DIR")]
    pub data_dir: Option<PathBuf>,
    #[arg(long, help = "Directory spreadsheets are written to, overrides SS_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,
    #[command(flatten)]
    pub assumptions: AssumptionArgs,
}

#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub analysis: AnalysisArgs,
    #[arg(long, help = "Directory holding the tax bracket and RMD tables")]
    pub data_dir: Option<PathBuf>,
    #[arg(long, help = "Directory the spreadsheet is written to")]
    pub output_dir: Option<PathBuf>,
    #[command(flatten)]
    pub assumptions: AssumptionArgs,
}

#[derive(Args, Debug, Clone)]
pub struct AnalysisArgs {
    #[arg(long, help = "Names the spreadsheet file; a random id is used when omitted")]
    pub session_id: Option<String>,
    #[arg(long, default_value = "1960-01-01", help = "Birthdate as YYYY-MM-DD")]
    pub birthdate: String,
    #[arg(long, default_value_t = 65, help = "Claiming age for model 1")]
    pub age_model1: u32,
    #[arg(long, default_value_t = 70, help = "Claiming age for model 2")]
    pub age_model2: u32,
    #[arg(
        long,
        default_value_t = 3_000.0,
        help = "Monthly benefit at full retirement age, from the Social Security statement"
    )]
    pub fra_benefit: f64,
    #[arg(long, default_value_t = 0.04, help = "Expected annual inflation as a decimal")]
    pub inflation_rate: f64,
    #[arg(
        long,
        default_value_t = 0.05,
        help = "Expected annual investment return as a decimal"
    )]
    pub investment_return: f64,
    #[arg(
        long,
        default_value = "Single",
        help = "Single, Married Filing Jointly, Married Filing Separately or Head of Household"
    )]
    pub filing_status: String,
    #[arg(long = "initial-401k", default_value_t = 1_000_000.0)]
    pub initial_401k: f64,
    #[arg(long, default_value_t = 500_000.0)]
    pub other_non_retirement_savings: f64,
    #[arg(
        long,
        default_value_t = 108_000.0,
        help = "Annual after-tax income target"
    )]
    pub target_income: f64,
    #[arg(
        long,
        default_value_t = 0.5,
        help = "Share of each non-retirement withdrawal that is capital gain, as a decimal"
    )]
    pub non_retirement_gain_percentage: f64,
}

impl Default for AnalysisArgs {
    fn default() -> Self {
        Self {
            session_id: None,
            birthdate: "1960-01-01".to_string(),
            age_model1: 65,
            age_model2: 70,
            fra_benefit: 3_000.0,
            inflation_rate: 0.04,
            investment_return: 0.05,
            filing_status: FilingStatus::Single.label().to_string(),
            initial_401k: 1_000_000.0,
            other_non_retirement_savings: 500_000.0,
            target_income: 108_000.0,
            non_retirement_gain_percentage: 0.5,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct AssumptionArgs {
    #[arg(long, default_value_t = 2025, help = "Year treated as today; amounts are in its dollars")]
    pub plan_year: i32,
    #[arg(long, default_value_t = 95, help = "Last age projected")]
    pub horizon_age: u32,
    #[arg(long, default_value_t = 67)]
    pub full_retirement_age: u32,
    #[arg(long, default_value_t = 0.00556, help = "Benefit reduction per month claimed early")]
    pub early_reduction_per_month: f64,
    #[arg(long, default_value_t = 0.00667, help = "Benefit increase per month claimed late")]
    pub delayed_credit_per_month: f64,
    #[arg(long, default_value_t = 2033)]
    pub trust_fund_depletion_year: i32,
    #[arg(
        long,
        default_value_t = 0.75,
        help = "Share of scheduled benefits paid from the depletion year on"
    )]
    pub depleted_benefit_factor: f64,
    #[arg(long, default_value_t = 73)]
    pub rmd_start_age: u32,
}

impl Default for AssumptionArgs {
    fn default() -> Self {
        let defaults = Assumptions::default();
        Self {
            plan_year: defaults.plan_year,
            horizon_age: defaults.horizon_age,
            full_retirement_age: defaults.full_retirement_age,
            early_reduction_per_month: defaults.early_reduction_per_month,
            delayed_credit_per_month: defaults.delayed_credit_per_month,
            trust_fund_depletion_year: defaults.trust_fund_depletion_year,
            depleted_benefit_factor: defaults.depleted_benefit_factor,
            rmd_start_age: defaults.rmd_start_age,
        }
    }
}

pub fn build_assumptions(args: &AssumptionArgs) -> Result<Assumptions, String> {
    if !(MIN_CLAIM_AGE..=MAX_CLAIM_AGE).contains(&args.full_retirement_age) {
        return Err(format!(
            "--full-retirement-age must be between {MIN_CLAIM_AGE} and {MAX_CLAIM_AGE}"
        ));
    }

    if args.horizon_age == 0 || args.horizon_age > 120 {
        return Err("--horizon-age must be between 1 and 120".to_string());
    }

    for (name, rate) in [
        ("--early-reduction-per-month", args.early_reduction_per_month),
        ("--delayed-credit-per-month", args.delayed_credit_per_month),
    ] {
        if !(0.0..=0.05).contains(&rate) {
            return Err(format!("{name} must be between 0 and 0.05"));
        }
    }

    if !(0.0..=1.0).contains(&args.depleted_benefit_factor) {
        return Err("--depleted-benefit-factor must be between 0 and 1".to_string());
    }

    Ok(Assumptions {
        plan_year: args.plan_year,
        horizon_age: args.horizon_age,
        full_retirement_age: args.full_retirement_age,
        early_reduction_per_month: args.early_reduction_per_month,
        delayed_credit_per_month: args.delayed_credit_per_month,
        trust_fund_depletion_year: args.trust_fund_depletion_year,
        depleted_benefit_factor: args.depleted_benefit_factor,
        rmd_start_age: args.rmd_start_age,
    })
}

/// Age in the plan year, counted from the birth year alone.
pub fn current_age_from_birthdate(birthdate: &str, plan_year: i32) -> Result<u32, String> {
    let date = NaiveDate::parse_from_str(birthdate.trim(), "%Y-%m-%d")
        .map_err(|e| format!("--birthdate must be YYYY-MM-DD ({e})"))?;
    u32::try_from(plan_year - date.year())
        .map_err(|_| "--birthdate must not be after the plan year".to_string())
}

pub fn build_inputs(args: AnalysisArgs, assumptions: &Assumptions) -> Result<Inputs, String> {
    let session_id = match args.session_id {
        Some(id) => {
            validate_session_id(&id).map_err(|e| format!("--session-id: {e}"))?;
            id
        }
        None => uuid::Uuid::new_v4().to_string(),
    };

    let current_age = current_age_from_birthdate(&args.birthdate, assumptions.plan_year)?;
    if current_age > assumptions.horizon_age {
        return Err(format!(
            "current age {current_age} is past the horizon age {}",
            assumptions.horizon_age
        ));
    }

    for (name, age) in [
        ("--age-model1", args.age_model1),
        ("--age-model2", args.age_model2),
    ] {
        if !(MIN_CLAIM_AGE..=MAX_CLAIM_AGE).contains(&age) {
            return Err(format!(
                "{name} must be between {MIN_CLAIM_AGE} and {MAX_CLAIM_AGE}"
            ));
        }
    }

    if !args.fra_benefit.is_finite() || args.fra_benefit < 0.0 {
        return Err("--fra-benefit must be >= 0".to_string());
    }

    for (name, rate) in [
        ("--inflation-rate", args.inflation_rate),
        ("--investment-return", args.investment_return),
    ] {
        if !rate.is_finite() || rate <= -1.0 {
            return Err(format!("{name} must be > -1"));
        }
    }

    for (name, amount) in [
        ("--initial-401k", args.initial_401k),
        (
            "--other-non-retirement-savings",
            args.other_non_retirement_savings,
        ),
        ("--target-income", args.target_income),
    ] {
        if !amount.is_finite() || amount < 0.0 {
            return Err(format!("{name} must be >= 0"));
        }
    }

    if !(0.0..=1.0).contains(&args.non_retirement_gain_percentage) {
        return Err("--non-retirement-gain-percentage must be between 0 and 1".to_string());
    }

    Ok(Inputs {
        session_id,
        current_age,
        claim_ages: [args.age_model1, args.age_model2],
        fra_monthly_benefit: args.fra_benefit,
        inflation_rate: args.inflation_rate,
        investment_return: args.investment_return,
        filing_status: FilingStatus::parse_lenient(&args.filing_status),
        retirement_start: args.initial_401k,
        non_retirement_start: args.other_non_retirement_savings,
        target_after_tax_income: args.target_income,
        non_retirement_gain_share: args.non_retirement_gain_percentage,
    })
}
