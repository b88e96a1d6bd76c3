use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Statement family encoded by the first segment of an account code.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum StatementKind {
    #[schemars(description = "Balance sheet assets (code prefix 1)")]
    Assets,
    #[schemars(description = "Balance sheet liabilities and shareholders' equity (code prefix 2)")]
    LiabilitiesAndEquity,
    #[schemars(description = "Income statement (code prefix 3)")]
    Income,
    #[schemars(description = "Comprehensive income (code prefix 4)")]
    ComprehensiveIncome,
    #[schemars(description = "Changes in equity (code prefix 5)")]
    EquityChanges,
    #[schemars(description = "Cash flow, indirect method (code prefix 6)")]
    CashFlow,
    #[schemars(description = "Added value (code prefix 7)")]
    AddedValue,
}

impl StatementKind {
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "1" => Some(Self::Assets),
            "2" => Some(Self::LiabilitiesAndEquity),
            "3" => Some(Self::Income),
            "4" => Some(Self::ComprehensiveIncome),
            "5" => Some(Self::EquityChanges),
            "6" => Some(Self::CashFlow),
            "7" => Some(Self::AddedValue),
            _ => None,
        }
    }

    /// Flow statements accumulate year to date; everything else is a point-in-time balance.
    pub fn is_flow(self) -> bool {
        matches!(self, Self::Income | Self::CashFlow)
    }
}

/// Hierarchical, dot-delimited account code such as `"1.01.02"`.
///
/// Ordering compares segment by segment, numerically where both segments are
/// numbers, so `"1.02" < "1.10"` and a parent sorts before its children.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct AccountCode(String);

impl AccountCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().trim().to_string())
    }

    /// Like [`AccountCode::new`] but rejects empty codes and empty segments.
    pub fn parse(code: &str) -> Option<Self> {
        let code = Self::new(code);
        if code.0.is_empty() || code.segments().any(str::is_empty) {
            return None;
        }
        Some(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    pub fn statement(&self) -> Option<StatementKind> {
        self.segments().next().and_then(StatementKind::from_segment)
    }

    pub fn is_flow(&self) -> bool {
        self.statement().is_some_and(StatementKind::is_flow)
    }

    /// Per-share figures (`3.99...`) are never rescaled.
    pub fn is_per_share(&self) -> bool {
        self.is_within_str("3.99")
    }

    /// Segment-aware prefix test: `"1.01.02"` is within `"1.01"`, `"1.010"` is not.
    pub fn is_within(&self, prefix: &AccountCode) -> bool {
        self.is_within_str(prefix.as_str())
    }

    fn is_within_str(&self, prefix: &str) -> bool {
        match self.0.strip_prefix(prefix) {
            Some(rest) => rest.is_empty() || rest.starts_with('.'),
            None => false,
        }
    }
}

impl Ord for AccountCode {
    fn cmp(&self, other: &Self) -> Ordering {
        let mut left = self.segments();
        let mut right = other.segments();
        loop {
            match (left.next(), right.next()) {
                (None, None) => return Ordering::Equal,
                (None, Some(_)) => return Ordering::Less,
                (Some(_), None) => return Ordering::Greater,
                (Some(a), Some(b)) => {
                    let ord = match (a.parse::<u64>(), b.parse::<u64>()) {
                        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
                        _ => a.cmp(b),
                    };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
            }
        }
    }
}

impl PartialOrd for AccountCode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for AccountCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountCode {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl From<String> for AccountCode {
    fn from(code: String) -> Self {
        Self::new(code)
    }
}

/// Column position of a row inside one filing: current year or comparative year.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum PeriodOrder {
    Last,
    Previous,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Default, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum EntryOrigin {
    /// Value as filed with the regulator
    #[default]
    Filed,
    /// Synthetic trailing-twelve-month row produced by the LTM adjuster
    TrailingTwelveMonths,
}

/// Accounting method for investments in subsidiaries. The two methods are
/// independent datasets throughout the pipeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AccountingMethod {
    Consolidated,
    Separate,
}

impl AccountingMethod {
    pub fn from_consolidated(is_consolidated: bool) -> Self {
        if is_consolidated {
            Self::Consolidated
        } else {
            Self::Separate
        }
    }

    pub fn is_consolidated(self) -> bool {
        self == Self::Consolidated
    }
}

impl fmt::Display for AccountingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Consolidated => f.write_str("consolidated"),
            Self::Separate => f.write_str("separate"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AccountingEntry {
    #[schemars(description = "Stable regulator identifier of the company")]
    pub company_id: u32,

    #[schemars(description = "Secondary (fiscal) identifier of the company")]
    pub fiscal_id: String,

    #[schemars(description = "True for year-end statements, false for interim/quarterly")]
    pub is_annual: bool,

    #[schemars(description = "Consolidated (true) or separate (false) statements")]
    pub is_consolidated: bool,

    #[schemars(description = "Increases with each restatement of the same filing")]
    pub report_version: u16,

    #[schemars(description = "As-of date of the filing this row came from")]
    pub period_reference: NaiveDate,

    #[schemars(description = "Start of the accumulation period. Absent for point-in-time statements.")]
    pub period_begin: Option<NaiveDate>,

    pub period_end: NaiveDate,

    pub period_order: PeriodOrder,

    pub account_code: AccountCode,

    pub account_name: String,

    #[schemars(description = "Standardized (true) or company-specific (false) account")]
    pub is_fixed_account: bool,

    #[schemars(description = "Value in base currency units. Per-share codes (3.99) are unscaled.")]
    pub value: f64,

    #[serde(default)]
    pub equity_statement_column: Option<String>,

    #[serde(default)]
    pub origin: EntryOrigin,
}

impl AccountingEntry {
    pub fn method(&self) -> AccountingMethod {
        AccountingMethod::from_consolidated(self.is_consolidated)
    }

    pub fn is_flow(&self) -> bool {
        self.account_code.is_flow()
    }

    pub fn is_ltm(&self) -> bool {
        self.origin == EntryOrigin::TrailingTwelveMonths
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(Vec<AccountingEntry>)
    }

    /// JSON schema of an ingestion batch (an array of entries).
    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::generate_json_schema())
    }
}

#[cfg(test)]
pub(crate) fn sample_entry(
    code: &str,
    is_annual: bool,
    period_begin: Option<NaiveDate>,
    period_end: NaiveDate,
    period_reference: NaiveDate,
    value: f64,
) -> AccountingEntry {
    AccountingEntry {
        company_id: 9512,
        fiscal_id: "33.000.167/0001-01".to_string(),
        is_annual,
        is_consolidated: true,
        report_version: 1,
        period_reference,
        period_begin,
        period_end,
        period_order: if period_end == period_reference {
            PeriodOrder::Last
        } else {
            PeriodOrder::Previous
        },
        account_code: AccountCode::new(code),
        account_name: format!("Account {}", code),
        is_fixed_account: true,
        value,
        equity_statement_column: None,
        origin: EntryOrigin::Filed,
    }
}

#[cfg(test)]
pub(crate) fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}
