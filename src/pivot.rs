use crate::entry::AccountCode;
use crate::error::{FinancialReportError, Result};
use crate::language::AccountNameTranslator;
use crate::utils::format_period;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Div, Mul, Sub};

pub const LTM_SUFFIX: &str = " (ltm)";

/// Ordered so that merging columns keeps the most specific kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Quarterly,
    Annual,
    TrailingTwelveMonths,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodColumn {
    pub period_end: NaiveDate,
    pub kind: ColumnKind,
}

impl PeriodColumn {
    /// `YYYY-MM-DD`, suffixed with ` (ltm)` for trailing-twelve-month columns.
    pub fn label(&self) -> String {
        match self.kind {
            ColumnKind::TrailingTwelveMonths => {
                format!("{}{}", format_period(self.period_end), LTM_SUFFIX)
            }
            _ => format_period(self.period_end),
        }
    }
}

/// A single pivot cell.
///
/// `Missing` marks a source account that does not exist for the period and
/// wins over everything in arithmetic. `Unavailable` marks a result that has
/// no finite value, such as a ratio over a zero denominator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Cell {
    Value(f64),
    Missing,
    Unavailable,
}

impl Cell {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Value(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable)
    }

    fn finite(value: f64) -> Self {
        if value.is_finite() {
            Self::Value(value)
        } else {
            Self::Unavailable
        }
    }

    fn combine(self, other: Self, op: impl FnOnce(f64, f64) -> Self) -> Self {
        match (self, other) {
            (Self::Missing, _) | (_, Self::Missing) => Self::Missing,
            (Self::Unavailable, _) | (_, Self::Unavailable) => Self::Unavailable,
            (Self::Value(a), Self::Value(b)) => op(a, b),
        }
    }
}

impl Add for Cell {
    type Output = Cell;

    fn add(self, rhs: Cell) -> Cell {
        self.combine(rhs, |a, b| Cell::finite(a + b))
    }
}

impl Sub for Cell {
    type Output = Cell;

    fn sub(self, rhs: Cell) -> Cell {
        self.combine(rhs, |a, b| Cell::finite(a - b))
    }
}

impl Mul<f64> for Cell {
    type Output = Cell;

    fn mul(self, rhs: f64) -> Cell {
        self.combine(Cell::Value(rhs), |a, b| Cell::finite(a * b))
    }
}

impl Div for Cell {
    type Output = Cell;

    fn div(self, rhs: Cell) -> Cell {
        self.combine(rhs, |a, b| {
            if b == 0.0 {
                Cell::Unavailable
            } else {
                Cell::finite(a / b)
            }
        })
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => write!(f, "{}", v),
            Self::Missing => f.write_str("-"),
            Self::Unavailable => f.write_str("NaN"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotRow {
    /// Account code for statement reports, indicator name for indicator tables
    pub key: String,
    pub label: Option<String>,
    pub is_fixed: Option<bool>,
    pub cells: Vec<Cell>,
}

/// Rows by key, columns by period end (ascending).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PivotTable {
    pub columns: Vec<PeriodColumn>,
    pub rows: Vec<PivotRow>,
}

impl PivotTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_labels(&self) -> Vec<String> {
        self.columns.iter().map(PeriodColumn::label).collect()
    }

    pub fn column_index(&self, label: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.label() == label)
    }

    pub fn period_index(&self, period_end: NaiveDate) -> Option<usize> {
        self.columns.iter().position(|c| c.period_end == period_end)
    }

    pub fn row(&self, key: &str) -> Option<&PivotRow> {
        self.rows.iter().find(|r| r.key == key)
    }

    pub fn value(&self, row_key: &str, column_label: &str) -> Option<Cell> {
        let idx = self.column_index(column_label)?;
        self.row(row_key).and_then(|r| r.cells.get(idx).copied())
    }

    pub fn value_at(&self, row_key: &str, period_end: NaiveDate) -> Option<Cell> {
        let idx = self.period_index(period_end)?;
        self.row(row_key).and_then(|r| r.cells.get(idx).copied())
    }

    /// Keeps rows whose account code has at most `depth` segments (0 keeps all).
    /// Rows with keys that are not account codes are dropped for any non-zero depth.
    pub fn filter_depth(&self, depth: u8) -> Result<PivotTable> {
        validate_depth(depth)?;
        if depth == 0 {
            return Ok(self.clone());
        }
        let rows = self
            .rows
            .iter()
            .filter(|row| {
                AccountCode::parse(&row.key).is_some_and(|code| code.depth() <= depth as usize)
            })
            .cloned()
            .collect();
        Ok(PivotTable {
            columns: self.columns.clone(),
            rows,
        })
    }

    /// Keeps only the last `n` columns; `0` keeps everything.
    pub fn last_columns(&self, n: usize) -> PivotTable {
        if n == 0 || n >= self.columns.len() {
            return self.clone();
        }
        let skip = self.columns.len() - n;
        PivotTable {
            columns: self.columns[skip..].to_vec(),
            rows: self
                .rows
                .iter()
                .map(|row| PivotRow {
                    cells: row.cells.iter().skip(skip).copied().collect(),
                    ..row.clone()
                })
                .collect(),
        }
    }

    /// Replaces row labels through the translator. Untranslated labels carry a marker.
    pub fn translate_labels(&self, translator: &AccountNameTranslator) -> PivotTable {
        let rows = self
            .rows
            .iter()
            .map(|row| PivotRow {
                label: row
                    .label
                    .as_deref()
                    .map(|label| translator.translate(label).into_label()),
                ..row.clone()
            })
            .collect();
        PivotTable {
            columns: self.columns.clone(),
            rows,
        }
    }

    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

pub(crate) fn validate_depth(depth: u8) -> Result<()> {
    if depth > 4 {
        return Err(FinancialReportError::invalid_argument(
            "depth",
            depth,
            "expected 0 (full detail) or 1 to 4 code segments",
        ));
    }
    Ok(())
}
