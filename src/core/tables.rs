//! Tax-bracket and RMD-divisor lookup tables.
//!
//! Both tables are plain comma-separated text files in a data directory.
//! A missing file is not an error: the calculator falls back to a flat tax
//! rate and a simple RMD divisor instead.

use std::collections::BTreeMap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

pub const DEFAULT_DATA_DIR: &str = "data";
pub const TAX_BRACKETS_FILE: &str = "tax_brackets_2024.txt";
pub const RMD_TABLE_FILE: &str = "irs_uniform_lifetime_table.txt";

/// Age key used for the open-ended `120+` row of the lifetime table.
const RMD_TABLE_MAX_AGE: u32 = 120;

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("failed to open {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("invalid value {value:?} in {}", path.display())]
    InvalidValue { path: PathBuf, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaxBracket {
    pub lower: f64,
    pub upper: f64,
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaxSchedule {
    Brackets(Vec<TaxBracket>),
    Flat(f64),
}

impl TaxSchedule {
    pub const FALLBACK_RATE: f64 = 0.24;

    pub fn fallback() -> Self {
        TaxSchedule::Flat(Self::FALLBACK_RATE)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RmdSchedule {
    Table(BTreeMap<u32, f64>),
    Fallback,
}

impl RmdSchedule {
    pub fn divisor(&self, age: u32) -> f64 {
        match self {
            RmdSchedule::Table(divisors) => divisors
                .get(&age)
                .or_else(|| divisors.get(&RMD_TABLE_MAX_AGE))
                .copied()
                .unwrap_or_else(|| fallback_divisor(age)),
            RmdSchedule::Fallback => fallback_divisor(age),
        }
    }
}

fn fallback_divisor(age: u32) -> f64 {
    (90.0 - f64::from(age)).max(1.0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct LookupTables {
    pub tax: TaxSchedule,
    pub rmd: RmdSchedule,
}

impl LookupTables {
    pub fn fallback() -> Self {
        Self {
            tax: TaxSchedule::fallback(),
            rmd: RmdSchedule::Fallback,
        }
    }

    /// Load both tables from `dir`, substituting fallbacks for missing files.
    pub fn load(dir: &Path) -> Result<Self, TableError> {
        let tax_path = dir.join(TAX_BRACKETS_FILE);
        let tax = match open_table(&tax_path)? {
            Some(reader) => TaxSchedule::Brackets(read_tax_brackets(reader, &tax_path)?),
            None => {
                tracing::warn!(
                    path = %tax_path.display(),
                    rate = TaxSchedule::FALLBACK_RATE,
                    "tax bracket file not found, using flat rate"
                );
                TaxSchedule::fallback()
            }
        };

        let rmd_path = dir.join(RMD_TABLE_FILE);
        let rmd = match open_table(&rmd_path)? {
            Some(reader) => RmdSchedule::Table(read_rmd_divisors(reader, &rmd_path)?),
            None => {
                tracing::warn!(
                    path = %rmd_path.display(),
                    "RMD table not found, using 90-minus-age divisor"
                );
                RmdSchedule::Fallback
            }
        };

        Ok(Self { tax, rmd })
    }
}

fn open_table(path: &Path) -> Result<Option<csv::Reader<File>>, TableError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(TableError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    Ok(Some(table_reader(file)))
}

fn table_reader<R: io::Read>(rdr: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .comment(Some(b'#'))
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(rdr)
}

fn parse_number(field: &str, path: &Path) -> Result<f64, TableError> {
    field
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| TableError::InvalidValue {
            path: path.to_path_buf(),
            value: field.to_string(),
        })
}

/// Rows must have exactly three fields `lower,upper,rate`; anything else is skipped.
pub fn read_tax_brackets<R: io::Read>(
    mut reader: csv::Reader<R>,
    path: &Path,
) -> Result<Vec<TaxBracket>, TableError> {
    let mut brackets = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|source| TableError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        if record.len() != 3 {
            continue;
        }
        brackets.push(TaxBracket {
            lower: parse_number(&record[0], path)?,
            upper: parse_number(&record[1], path)?,
            rate: parse_number(&record[2], path)?,
        });
    }
    Ok(brackets)
}

pub fn read_rmd_divisors<R: io::Read>(
    mut reader: csv::Reader<R>,
    path: &Path,
) -> Result<BTreeMap<u32, f64>, TableError> {
    let mut divisors = BTreeMap::new();
    for result in reader.records() {
        let record = result.map_err(|source| TableError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        if record.len() < 2 {
            continue;
        }
        let age = match &record[0] {
            "120+" => RMD_TABLE_MAX_AGE,
            raw => raw.parse::<u32>().map_err(|_| TableError::InvalidValue {
                path: path.to_path_buf(),
                value: raw.to_string(),
            })?,
        };
        let divisor = parse_number(&record[1], path)?;
        if divisor <= 0.0 {
            return Err(TableError::InvalidValue {
                path: path.to_path_buf(),
                value: record[1].to_string(),
            });
        }
        divisors.insert(age, divisor);
    }
    Ok(divisors)
}
