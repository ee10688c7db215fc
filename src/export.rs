//! XLSX export of a claiming-strategy comparison.
//!
//! One sheet per strategy holding its master table, plus a summary sheet.
//! Header cells wrap; columns denominated in plan-year dollars get a currency
//! number format.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};

use crate::core::{Assumptions, Comparison, ReportColumn, StrategyReport, SummaryRow};

pub const SPREADSHEET_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const SUMMARY_SHEET_NAME: &str = "Summary Comparison";

const MAX_SESSION_ID_LEN: usize = 64;
const MAX_SHEET_NAME_LEN: usize = 31;
const CURRENCY_FORMAT: &str = "$#,##0";
const COLUMN_WIDTH: f64 = 16.0;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("session id must be 1-64 characters of [A-Za-z0-9_-], got {0:?}")]
    InvalidSessionId(String),
    #[error("failed to prepare output directory {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write spreadsheet: {0}")]
    Xlsx(#[from] XlsxError),
}

pub fn validate_session_id(session_id: &str) -> Result<(), ExportError> {
    let valid = !session_id.is_empty()
        && session_id.len() <= MAX_SESSION_ID_LEN
        && session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ExportError::InvalidSessionId(session_id.to_string()))
    }
}

pub fn spreadsheet_file_name(session_id: &str) -> Result<String, ExportError> {
    validate_session_id(session_id)?;
    Ok(format!("social_security_analysis_{session_id}.xlsx"))
}

pub fn spreadsheet_path(output_dir: &Path, session_id: &str) -> Result<PathBuf, ExportError> {
    Ok(output_dir.join(spreadsheet_file_name(session_id)?))
}

/// Sheet names for the two strategies; equal claim ages get a `(2)` suffix on
/// the second sheet so the names stay unique. Names never exceed Excel's
/// 31-character limit.
pub fn strategy_sheet_names(claim_ages: [u32; 2]) -> [String; 2] {
    let first = format!("Claim SS benefits at age {}", claim_ages[0]);
    let mut second = format!("Claim SS benefits at age {}", claim_ages[1]);
    if first == second {
        let suffix = if second.len() + 4 <= MAX_SHEET_NAME_LEN {
            " (2)"
        } else {
            "(2)"
        };
        second.truncate(MAX_SHEET_NAME_LEN.saturating_sub(suffix.len()));
        second.push_str(suffix);
    }
    [first, second]
}

pub fn build_workbook(comparison: &Comparison) -> Result<Workbook, ExportError> {
    let header_format = Format::new().set_bold().set_text_wrap();
    let currency_format = Format::new().set_num_format(CURRENCY_FORMAT);

    let claim_ages = comparison
        .strategies
        .each_ref()
        .map(|s| s.projection.claim_age);
    let sheet_names = strategy_sheet_names(claim_ages);

    let mut workbook = Workbook::new();
    for (strategy, name) in comparison.strategies.iter().zip(sheet_names.iter()) {
        let sheet = workbook.add_worksheet();
        sheet.set_name(name)?;
        write_strategy_sheet(
            sheet,
            &comparison.assumptions,
            strategy,
            &header_format,
            &currency_format,
        )?;
    }

    let summary = workbook.add_worksheet();
    summary.set_name(SUMMARY_SHEET_NAME)?;
    let rows = comparison.strategies.each_ref().map(|s| s.summary);
    write_summary_sheet(summary, &rows, &header_format)?;

    Ok(workbook)
}

fn write_strategy_sheet(
    sheet: &mut Worksheet,
    assumptions: &Assumptions,
    strategy: &StrategyReport,
    header_format: &Format,
    currency_format: &Format,
) -> Result<(), XlsxError> {
    for (col, column) in ReportColumn::ALL.iter().enumerate() {
        let col = col as u16;
        sheet.write_string_with_format(0, col, column.label(assumptions), header_format)?;
        sheet.set_column_width(col, COLUMN_WIDTH)?;
    }

    for (index, row) in strategy.rows.iter().enumerate() {
        let sheet_row = index as u32 + 1;
        for (col, column) in ReportColumn::ALL.iter().enumerate() {
            let col = col as u16;
            let value = row.value(*column);
            if column.is_currency() {
                sheet.write_number_with_format(sheet_row, col, value, currency_format)?;
            } else {
                sheet.write_number(sheet_row, col, value)?;
            }
        }
    }
    Ok(())
}

fn write_summary_sheet(
    sheet: &mut Worksheet,
    rows: &[SummaryRow],
    header_format: &Format,
) -> Result<(), XlsxError> {
    for (col, header) in SummaryRow::HEADERS.iter().enumerate() {
        let col = col as u16;
        sheet.write_string_with_format(0, col, *header, header_format)?;
        sheet.set_column_width(col, COLUMN_WIDTH)?;
    }
    for (index, row) in rows.iter().enumerate() {
        let sheet_row = index as u32 + 1;
        for (col, value) in row.values().into_iter().enumerate() {
            sheet.write_number(sheet_row, col as u16, value)?;
        }
    }
    Ok(())
}

/// Write the comparison to `<output_dir>/social_security_analysis_<session_id>.xlsx`.
pub fn write_spreadsheet(
    comparison: &Comparison,
    output_dir: &Path,
    session_id: &str,
) -> Result<PathBuf, ExportError> {
    let path = spreadsheet_path(output_dir, session_id)?;
    fs::create_dir_all(output_dir).map_err(|source| ExportError::Io {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let mut workbook = build_workbook(comparison)?;
    workbook.save(&path)?;
    tracing::info!(path = %path.display(), "spreadsheet written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FilingStatus, Inputs, LookupTables, run_comparison};

    fn sample_inputs(claim_ages: [u32; 2]) -> Inputs {
        Inputs {
            session_id: "abc-123".to_string(),
            current_age: 65,
            claim_ages,
            fra_monthly_benefit: 3_000.0,
            inflation_rate: 0.04,
            investment_return: 0.05,
            filing_status: FilingStatus::Single,
            retirement_start: 1_000_000.0,
            non_retirement_start: 500_000.0,
            target_after_tax_income: 108_000.0,
            non_retirement_gain_share: 0.5,
        }
    }

    #[test]
    fn session_ids_are_restricted_to_safe_file_name_characters() {
        assert!(validate_session_id("3f2b-4c_9").is_ok());
        assert!(validate_session_id("").is_err());
        assert!(validate_session_id("../etc/passwd").is_err());
        assert!(validate_session_id("a b").is_err());
        assert!(validate_session_id(&"x".repeat(65)).is_err());
    }

    #[test]
    fn file_name_embeds_session_id() {
        assert_eq!(
            spreadsheet_file_name("abc").expect("valid id"),
            "social_security_analysis_abc.xlsx"
        );
    }

    #[test]
    fn equal_claim_ages_get_distinct_sheet_names() {
        assert_eq!(
            strategy_sheet_names([65, 70]),
            [
                "Claim SS benefits at age 65".to_string(),
                "Claim SS benefits at age 70".to_string()
            ]
        );
        let [first, second] = strategy_sheet_names([67, 67]);
        assert_ne!(first, second);
        assert_eq!(second, "Claim SS benefits at age 67 (2)");

        let [first, second] = strategy_sheet_names([100, 100]);
        assert_ne!(first, second);
        assert_eq!(first, "Claim SS benefits at age 100");
        assert_eq!(second, "Claim SS benefits at age 100(2)");
    }

    #[test]
    fn sheet_names_fit_excel_limit_for_every_claim_age_pair() {
        for a in 62..=100 {
            for b in 62..=100 {
                let [first, second] = strategy_sheet_names([a, b]);
                assert!(first.len() <= MAX_SHEET_NAME_LEN, "{first}");
                assert!(second.len() <= MAX_SHEET_NAME_LEN, "{second}");
                assert_ne!(first, second);
            }
        }
    }

    #[test]
    fn workbook_builds_when_both_claim_ages_are_the_maximum() {
        let comparison = run_comparison(
            &sample_inputs([100, 100]),
            &Assumptions::default(),
            &LookupTables::fallback(),
        );
        let mut workbook = build_workbook(&comparison).expect("workbook builds");
        let bytes = workbook.save_to_buffer().expect("workbook serializes");
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn workbook_serializes_to_xlsx_bytes() {
        let comparison = run_comparison(
            &sample_inputs([67, 67]),
            &Assumptions::default(),
            &LookupTables::fallback(),
        );
        let mut workbook = build_workbook(&comparison).expect("workbook builds");
        let bytes = workbook.save_to_buffer().expect("workbook serializes");
        assert!(bytes.starts_with(b"PK"), "xlsx is a zip archive");
    }

    #[test]
    fn write_spreadsheet_creates_file_in_output_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let output_dir = dir.path().join("exports");
        let comparison = run_comparison(
            &sample_inputs([65, 70]),
            &Assumptions::default(),
            &LookupTables::fallback(),
        );

        let path = write_spreadsheet(&comparison, &output_dir, "abc-123").expect("export succeeds");
        assert_eq!(path, output_dir.join("social_security_analysis_abc-123.xlsx"));
        let metadata = fs::metadata(&path).expect("file exists");
        assert!(metadata.len() > 0);
    }

    #[test]
    fn write_spreadsheet_rejects_unsafe_session_id() {
        let dir = tempfile::tempdir().expect("tempdir");
        let comparison = run_comparison(
            &sample_inputs([65, 70]),
            &Assumptions::default(),
            &LookupTables::fallback(),
        );
        let err = write_spreadsheet(&comparison, dir.path(), "../escape").expect_err("must reject");
        assert!(matches!(err, ExportError::InvalidSessionId(_)));
    }
}
