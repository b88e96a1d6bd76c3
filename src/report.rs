use crate::dedup::filing_precedence;
use crate::entry::{AccountCode, AccountingEntry};
use crate::error::{FinancialReportError, Result};
use crate::pivot::{validate_depth, Cell, ColumnKind, PeriodColumn, PivotRow, PivotTable};
use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Statement family selectable in a report request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementFamily {
    Assets,
    Cash,
    CurrentAssets,
    NonCurrentAssets,
    Liabilities,
    Debt,
    CurrentLiabilities,
    NonCurrentLiabilities,
    LiabilitiesAndEquity,
    Equity,
    Income,
    EarningsPerShare,
    ComprehensiveIncome,
    ChangesInEquity,
    CashFlow,
    AddedValue,
    /// Exact account codes, e.g. `["3.01", "3.05"]`
    Custom(Vec<AccountCode>),
}

impl StatementFamily {
    pub const NAMED: [StatementFamily; 16] = [
        Self::Assets,
        Self::Cash,
        Self::CurrentAssets,
        Self::NonCurrentAssets,
        Self::Liabilities,
        Self::Debt,
        Self::CurrentLiabilities,
        Self::NonCurrentLiabilities,
        Self::LiabilitiesAndEquity,
        Self::Equity,
        Self::Income,
        Self::EarningsPerShare,
        Self::ComprehensiveIncome,
        Self::ChangesInEquity,
        Self::CashFlow,
        Self::AddedValue,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Assets => "assets",
            Self::Cash => "cash",
            Self::CurrentAssets => "current_assets",
            Self::NonCurrentAssets => "non_current_assets",
            Self::Liabilities => "liabilities",
            Self::Debt => "debt",
            Self::CurrentLiabilities => "current_liabilities",
            Self::NonCurrentLiabilities => "non_current_liabilities",
            Self::LiabilitiesAndEquity => "liabilities_and_equity",
            Self::Equity => "equity",
            Self::Income => "income",
            Self::EarningsPerShare => "earnings_per_share",
            Self::ComprehensiveIncome => "comprehensive_income",
            Self::ChangesInEquity => "changes_in_equity",
            Self::CashFlow => "cash_flow",
            Self::AddedValue => "added_value",
            Self::Custom(_) => "custom",
        }
    }

    /// Code prefixes selecting the family. Empty for custom lists, which match exactly.
    pub fn prefixes(&self) -> &'static [&'static str] {
        match self {
            Self::Assets => &["1"],
            Self::Cash => &["1.01.01", "1.01.02"],
            Self::CurrentAssets => &["1.01"],
            Self::NonCurrentAssets => &["1.02"],
            Self::Liabilities => &["2.01", "2.02"],
            Self::Debt => &["2.01.04", "2.02.01"],
            Self::CurrentLiabilities => &["2.01"],
            Self::NonCurrentLiabilities => &["2.02"],
            Self::LiabilitiesAndEquity => &["2"],
            Self::Equity => &["2.03"],
            Self::Income => &["3"],
            Self::EarningsPerShare => &["3.99.01.01", "3.99.02.01"],
            Self::ComprehensiveIncome => &["4"],
            Self::ChangesInEquity => &["5"],
            Self::CashFlow => &["6"],
            Self::AddedValue => &["7"],
            Self::Custom(_) => &[],
        }
    }

    pub fn matches(&self, code: &AccountCode) -> bool {
        match self {
            Self::Custom(codes) => codes.contains(code),
            _ => self
                .prefixes()
                .iter()
                .any(|prefix| code.is_within(&AccountCode::from(*prefix))),
        }
    }
}

impl fmt::Display for StatementFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StatementFamily {
    type Err = FinancialReportError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        Self::NAMED
            .iter()
            .find(|family| family.name() == wanted)
            .cloned()
            .ok_or_else(|| {
                FinancialReportError::invalid_argument(
                    "statement",
                    s,
                    format!(
                        "unknown statement family, expected one of: {}",
                        Self::NAMED
                            .iter()
                            .map(StatementFamily::name)
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                )
            })
    }
}

/// Resolves a unit divisor: a positive number or one of `thousand`, `million`, `billion`.
pub fn parse_unit(unit: &str) -> Result<f64> {
    let divisor = match unit.trim().to_lowercase().as_str() {
        "unit" | "one" => 1.0,
        "thousand" => 1_000.0,
        "million" => 1_000_000.0,
        "billion" => 1_000_000_000.0,
        other => other.parse::<f64>().map_err(|_| {
            FinancialReportError::invalid_argument(
                "unit_divisor",
                unit,
                "expected a positive number or thousand/million/billion",
            )
        })?,
    };
    validate_unit(divisor)?;
    Ok(divisor)
}

fn validate_unit(divisor: f64) -> Result<()> {
    if !divisor.is_finite() || divisor <= 0.0 {
        return Err(FinancialReportError::invalid_argument(
            "unit_divisor",
            divisor,
            "must be a finite number greater than zero",
        ));
    }
    Ok(())
}

fn default_unit() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRequest {
    pub statement: StatementFamily,
    /// 0 shows every account, N keeps codes with at most N segments
    #[serde(default)]
    pub depth: u8,
    #[serde(default = "default_unit")]
    pub unit_divisor: f64,
    /// Show only the last N period columns; 0 shows all
    #[serde(default)]
    pub num_years: usize,
}

impl ReportRequest {
    pub fn new(statement: StatementFamily) -> Self {
        Self {
            statement,
            depth: 0,
            unit_divisor: default_unit(),
            num_years: 0,
        }
    }

    pub fn with_depth(mut self, depth: u8) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_unit_divisor(mut self, unit_divisor: f64) -> Self {
        self.unit_divisor = unit_divisor;
        self
    }

    pub fn with_num_years(mut self, num_years: usize) -> Self {
        self.num_years = num_years;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if let StatementFamily::Custom(codes) = &self.statement {
            if codes.is_empty() {
                return Err(FinancialReportError::invalid_argument(
                    "statement",
                    "custom([])",
                    "custom statement requires at least one account code",
                ));
            }
            if let Some(bad) = codes.iter().find(|c| AccountCode::parse(c.as_str()).is_none()) {
                return Err(FinancialReportError::invalid_argument(
                    "statement",
                    format!("custom([{:?}])", bad.as_str()),
                    "account codes must be non-empty dot-delimited segments",
                ));
            }
        }
        validate_depth(self.depth)?;
        validate_unit(self.unit_divisor)
    }
}

struct RowAccumulator<'a> {
    /// Entry whose name and fixed flag label the row (latest period end)
    labelled_by: &'a AccountingEntry,
    cells: BTreeMap<NaiveDate, &'a AccountingEntry>,
}

/// LTM rows outrank filed annual rows, which outrank filed quarterly rows.
fn cell_precedence(a: &AccountingEntry, b: &AccountingEntry) -> Ordering {
    (a.is_ltm(), a.is_annual)
        .cmp(&(b.is_ltm(), b.is_annual))
        .then_with(|| filing_precedence(a, b))
}

fn column_kind(entry: &AccountingEntry) -> ColumnKind {
    if entry.is_ltm() {
        ColumnKind::TrailingTwelveMonths
    } else if entry.is_annual {
        ColumnKind::Annual
    } else {
        ColumnKind::Quarterly
    }
}

/// Pivots the normalized entries of one company/method into a statement report.
///
/// The request is validated before anything else is touched. Values are
/// divided by the unit except per-share codes; cells with no entry are zero.
/// Parent accounts are never derived from their children.
pub fn build_report(entries: &[AccountingEntry], request: &ReportRequest) -> Result<PivotTable> {
    pivot_entries(entries, request, Cell::Value(0.0))
}

/// Same pivot as [`build_report`], but cells with no entry stay `Cell::Missing`.
///
/// Indicator sources are built this way so an account left out of a column
/// (e.g. an omitted LTM account) is never read as a zero.
pub fn build_sparse_report(
    entries: &[AccountingEntry],
    request: &ReportRequest,
) -> Result<PivotTable> {
    pivot_entries(entries, request, Cell::Missing)
}

fn pivot_entries(
    entries: &[AccountingEntry],
    request: &ReportRequest,
    empty_cell: Cell,
) -> Result<PivotTable> {
    request.validate()?;

    let family: Vec<&AccountingEntry> = entries
        .iter()
        .filter(|e| request.statement.matches(&e.account_code))
        .collect();

    // Columns come from the whole family so depth filtering never changes them
    let mut columns: BTreeMap<NaiveDate, ColumnKind> = BTreeMap::new();
    for entry in &family {
        let kind = column_kind(entry);
        columns
            .entry(entry.period_end)
            .and_modify(|k| *k = (*k).max(kind))
            .or_insert(kind);
    }

    let mut rows: BTreeMap<&AccountCode, RowAccumulator<'_>> = BTreeMap::new();
    for entry in family
        .iter()
        .copied()
        .filter(|e| request.depth == 0 || e.account_code.depth() <= request.depth as usize)
    {
        let row = rows.entry(&entry.account_code).or_insert_with(|| RowAccumulator {
            labelled_by: entry,
            cells: BTreeMap::new(),
        });

        let newer_label = entry
            .period_end
            .cmp(&row.labelled_by.period_end)
            .then_with(|| filing_precedence(entry, row.labelled_by));
        if newer_label == Ordering::Greater {
            row.labelled_by = entry;
        }

        row.cells
            .entry(entry.period_end)
            .and_modify(|current| {
                if cell_precedence(entry, current) == Ordering::Greater {
                    *current = entry;
                }
            })
            .or_insert(entry);
    }

    let columns: Vec<PeriodColumn> = columns
        .into_iter()
        .map(|(period_end, kind)| PeriodColumn { period_end, kind })
        .collect();

    let rows: Vec<PivotRow> = rows
        .into_iter()
        .map(|(code, acc)| PivotRow {
            key: code.to_string(),
            label: Some(acc.labelled_by.account_name.clone()),
            is_fixed: Some(acc.labelled_by.is_fixed_account),
            cells: columns
                .iter()
                .map(|column| {
                    acc.cells
                        .get(&column.period_end)
                        .map(|entry| Cell::Value(scaled_value(entry, request.unit_divisor)))
                        .unwrap_or(empty_cell)
                })
                .collect(),
        })
        .collect();

    debug!(
        "Built {} report: {} rows x {} columns",
        request.statement,
        rows.len(),
        columns.len()
    );

    Ok(PivotTable { columns, rows }.last_columns(request.num_years))
}

fn scaled_value(entry: &AccountingEntry, unit_divisor: f64) -> f64 {
    if entry.account_code.is_per_share() {
        entry.value
    } else {
        entry.value / unit_divisor
    }
}
