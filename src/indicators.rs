use crate::error::{FinancialReportError, Result};
use crate::pivot::{Cell, ColumnKind, PeriodColumn, PivotRow, PivotTable};
use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Operating indicators, in output row order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    Revenues,
    OperatingCashFlow,
    Ebitda,
    Ebit,
    NetIncome,
    TotalCash,
    TotalDebt,
    NetDebt,
    WorkingCapital,
    InvestedCapital,
    ReturnOnAssets,
    ReturnOnCapital,
    ReturnOnEquity,
    GrossMargin,
    EbitdaMargin,
    OperatingMargin,
    NetMargin,
}

impl Indicator {
    pub const ALL: [Indicator; 17] = [
        Self::Revenues,
        Self::OperatingCashFlow,
        Self::Ebitda,
        Self::Ebit,
        Self::NetIncome,
        Self::TotalCash,
        Self::TotalDebt,
        Self::NetDebt,
        Self::WorkingCapital,
        Self::InvestedCapital,
        Self::ReturnOnAssets,
        Self::ReturnOnCapital,
        Self::ReturnOnEquity,
        Self::GrossMargin,
        Self::EbitdaMargin,
        Self::OperatingMargin,
        Self::NetMargin,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Revenues => "revenues",
            Self::OperatingCashFlow => "operating_cash_flow",
            Self::Ebitda => "ebitda",
            Self::Ebit => "ebit",
            Self::NetIncome => "net_income",
            Self::TotalCash => "total_cash",
            Self::TotalDebt => "total_debt",
            Self::NetDebt => "net_debt",
            Self::WorkingCapital => "working_capital",
            Self::InvestedCapital => "invested_capital",
            Self::ReturnOnAssets => "return_on_assets",
            Self::ReturnOnCapital => "return_on_capital",
            Self::ReturnOnEquity => "return_on_equity",
            Self::GrossMargin => "gross_margin",
            Self::EbitdaMargin => "ebitda_margin",
            Self::OperatingMargin => "operating_margin",
            Self::NetMargin => "net_margin",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Revenues => "Revenues",
            Self::OperatingCashFlow => "Operating cash flow",
            Self::Ebitda => "EBIT plus depreciation and amortization",
            Self::Ebit => "Earnings before interest and taxes",
            Self::NetIncome => "Net income",
            Self::TotalCash => "Cash and short-term investments",
            Self::TotalDebt => "Short and long-term loans",
            Self::NetDebt => "Total debt minus total cash",
            Self::WorkingCapital => "Current assets minus current liabilities",
            Self::InvestedCapital => "Debt plus equity minus cash",
            Self::ReturnOnAssets => "After-tax EBIT over prior total assets",
            Self::ReturnOnCapital => "After-tax EBIT over prior invested capital",
            Self::ReturnOnEquity => "Net income over prior equity",
            Self::GrossMargin => "Gross profit over revenues",
            Self::EbitdaMargin => "EBITDA over revenues",
            Self::OperatingMargin => "After-tax EBIT over revenues",
            Self::NetMargin => "Net income over revenues",
        }
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub const REVENUES: &str = "3.01";
pub const GROSS_PROFIT: &str = "3.03";
pub const EBIT: &str = "3.05";
pub const NET_INCOME: &str = "3.11";
pub const DEPRECIATION_AMORTIZATION: &str = "6.01.01.04";
pub const OPERATING_CASH_FLOW: &str = "6.01";
pub const TOTAL_ASSETS: &str = "1";
pub const EQUITY: &str = "2.03";
pub const CASH: [&str; 2] = ["1.01.01", "1.01.02"];
pub const CURRENT_ASSETS: &str = "1.01";
pub const CURRENT_LIABILITIES: &str = "2.01";
pub const DEBT: [&str; 2] = ["2.01.04", "2.02.01"];

/// Full-depth statement pivots the indicators are read from.
#[derive(Debug, Clone, Copy)]
pub struct IndicatorSources<'a> {
    pub assets: &'a PivotTable,
    pub liabilities_and_equity: &'a PivotTable,
    pub income: &'a PivotTable,
    pub cash_flow: Option<&'a PivotTable>,
}

impl<'a> IndicatorSources<'a> {
    fn tables(&self) -> impl Iterator<Item = &'a PivotTable> {
        [
            Some(self.assets),
            Some(self.liabilities_and_equity),
            Some(self.income),
            self.cash_flow,
        ]
        .into_iter()
        .flatten()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorOptions {
    pub tax_rate: f64,
    /// Divide returns by book values at the end of the prior column
    pub use_prior_period: bool,
    pub unit_divisor: f64,
    /// Show only the last N columns; 0 shows all
    pub num_years: usize,
}

impl Default for IndicatorOptions {
    fn default() -> Self {
        Self {
            tax_rate: 0.34,
            use_prior_period: true,
            unit_divisor: 1.0,
            num_years: 0,
        }
    }
}

impl IndicatorOptions {
    pub fn with_tax_rate(mut self, tax_rate: f64) -> Self {
        self.tax_rate = tax_rate;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.tax_rate) {
            return Err(FinancialReportError::invalid_argument(
                "tax_rate",
                self.tax_rate,
                "must be within [0, 1]",
            ));
        }
        if !self.unit_divisor.is_finite() || self.unit_divisor <= 0.0 {
            return Err(FinancialReportError::invalid_argument(
                "unit_divisor",
                self.unit_divisor,
                "must be a finite number greater than zero",
            ));
        }
        Ok(())
    }
}

/// One series per source account, aligned to the merged columns.
struct SeriesReader<'a> {
    sources: Vec<&'a PivotTable>,
    columns: Vec<PeriodColumn>,
}

impl<'a> SeriesReader<'a> {
    fn new(sources: &IndicatorSources<'a>) -> Self {
        let mut merged: BTreeMap<NaiveDate, ColumnKind> = BTreeMap::new();
        for table in sources.tables() {
            for column in &table.columns {
                merged
                    .entry(column.period_end)
                    .and_modify(|kind| *kind = (*kind).max(column.kind))
                    .or_insert(column.kind);
            }
        }
        Self {
            sources: sources.tables().collect(),
            columns: merged
                .into_iter()
                .map(|(period_end, kind)| PeriodColumn { period_end, kind })
                .collect(),
        }
    }

    /// Absent accounts and absent periods read as `Cell::Missing`.
    fn account(&self, code: &str) -> Vec<Cell> {
        let found = self
            .sources
            .iter()
            .find_map(|table| table.row(code).map(|row| (*table, row)));
        self.columns
            .iter()
            .map(|column| match found {
                Some((table, row)) => table
                    .period_index(column.period_end)
                    .and_then(|idx| row.cells.get(idx).copied())
                    .unwrap_or(Cell::Missing),
                None => Cell::Missing,
            })
            .collect()
    }

    fn sum(&self, codes: &[&str]) -> Vec<Cell> {
        let mut series = codes.iter().map(|code| self.account(code));
        let first = series.next().unwrap_or_else(|| vec![Cell::Missing; self.columns.len()]);
        series.fold(first, |acc, next| zip_with(&acc, &next, |a, b| a + b))
    }
}

fn zip_with(a: &[Cell], b: &[Cell], op: impl Fn(Cell, Cell) -> Cell) -> Vec<Cell> {
    a.iter().zip(b).map(|(x, y)| op(*x, *y)).collect()
}

fn scale(series: &[Cell], factor: f64) -> Vec<Cell> {
    series.iter().map(|cell| *cell * factor).collect()
}

/// Shifts a balance series one column to the right; the first column keeps its own value.
fn prior_values(series: &[Cell], use_prior_period: bool) -> Vec<Cell> {
    if !use_prior_period {
        return series.to_vec();
    }
    series
        .iter()
        .enumerate()
        .map(|(idx, cell)| if idx == 0 { *cell } else { series[idx - 1] })
        .collect()
}

/// Derives the operating indicators table from statement pivots.
///
/// Return measures divide by book values from the end of the prior column
/// when `use_prior_period` is set. Source accounts that do not exist yield
/// `Cell::Missing`; divisions by zero yield `Cell::Unavailable`.
pub fn compute_indicators(
    sources: &IndicatorSources<'_>,
    options: &IndicatorOptions,
) -> Result<PivotTable> {
    options.validate()?;

    let reader = SeriesReader::new(sources);
    let after_tax = 1.0 - options.tax_rate;

    let revenues = reader.account(REVENUES);
    let gross_profit = reader.account(GROSS_PROFIT);
    let ebit = reader.account(EBIT);
    let depreciation_amortization = reader.account(DEPRECIATION_AMORTIZATION);
    let ebitda = zip_with(&ebit, &depreciation_amortization, |a, b| a + b);
    let operating_cash_flow = reader.account(OPERATING_CASH_FLOW);
    let net_income = reader.account(NET_INCOME);
    let total_assets = reader.account(TOTAL_ASSETS);
    let equity = reader.account(EQUITY);
    let total_cash = reader.sum(&CASH);
    let current_assets = reader.account(CURRENT_ASSETS);
    let current_liabilities = reader.account(CURRENT_LIABILITIES);
    let working_capital = zip_with(&current_assets, &current_liabilities, |a, b| a - b);
    let total_debt = reader.sum(&DEBT);
    let net_debt = zip_with(&total_debt, &total_cash, |a, b| a - b);
    let invested_capital = zip_with(
        &zip_with(&total_debt, &equity, |a, b| a + b),
        &total_cash,
        |a, b| a - b,
    );

    let total_assets_p = prior_values(&total_assets, options.use_prior_period);
    let equity_p = prior_values(&equity, options.use_prior_period);
    let invested_capital_p = prior_values(&invested_capital, options.use_prior_period);
    let nopat = scale(&ebit, after_tax);

    let mut series: BTreeMap<Indicator, Vec<Cell>> = BTreeMap::new();
    series.insert(Indicator::ReturnOnAssets, zip_with(&nopat, &total_assets_p, |a, b| a / b));
    series.insert(
        Indicator::ReturnOnCapital,
        zip_with(&nopat, &invested_capital_p, |a, b| a / b),
    );
    series.insert(Indicator::ReturnOnEquity, zip_with(&net_income, &equity_p, |a, b| a / b));
    series.insert(Indicator::GrossMargin, zip_with(&gross_profit, &revenues, |a, b| a / b));
    series.insert(Indicator::EbitdaMargin, zip_with(&ebitda, &revenues, |a, b| a / b));
    series.insert(Indicator::OperatingMargin, zip_with(&nopat, &revenues, |a, b| a / b));
    series.insert(Indicator::NetMargin, zip_with(&net_income, &revenues, |a, b| a / b));
    series.insert(Indicator::Revenues, revenues);
    series.insert(Indicator::OperatingCashFlow, operating_cash_flow);
    series.insert(Indicator::Ebitda, ebitda);
    series.insert(Indicator::Ebit, ebit);
    series.insert(Indicator::NetIncome, net_income);
    series.insert(Indicator::TotalCash, total_cash);
    series.insert(Indicator::TotalDebt, total_debt);
    series.insert(Indicator::NetDebt, net_debt);
    series.insert(Indicator::WorkingCapital, working_capital);
    series.insert(Indicator::InvestedCapital, invested_capital);

    let rows = Indicator::ALL
        .iter()
        .map(|indicator| PivotRow {
            key: indicator.name().to_string(),
            label: Some(indicator.description().to_string()),
            is_fixed: None,
            cells: series.remove(indicator).unwrap_or_default(),
        })
        .collect();

    debug!(
        "Computed {} indicators over {} columns (tax rate {})",
        Indicator::ALL.len(),
        reader.columns.len(),
        options.tax_rate
    );

    Ok(PivotTable {
        columns: reader.columns,
        rows,
    }
    .last_columns(options.num_years))
}
