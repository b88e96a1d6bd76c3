//! # Financial Report Builder
//!
//! A library for turning raw, versioned company filings into normalized
//! financial statements and operating indicators.
//!
//! ## Core Concepts
//!
//! - **Accounting entries**: One row per company, account and period, as filed. A company
//!   may restate a filing several times and each filing repeats the prior year as a comparative
//! - **Deduplication**: Every account/period keeps only its most authoritative filing
//! - **Quarter pruning**: Only the latest quarter and the same quarter a year earlier survive
//! - **LTM adjustment**: Year-to-date income and cash flow figures become trailing twelve months
//! - **Reports**: Period-column pivots of one statement family, with depth and unit controls
//! - **Indicators**: EBITDA, margins and returns on prior-period book values
//!
//! ## Example
//!
//! ```rust,ignore
//! use financial_report_builder::*;
//!
//! let dataset = Dataset::from_json_file("filings.json")?;
//!
//! let request = ReportRequest::new(StatementFamily::Income)
//!     .with_depth(2)
//!     .with_unit_divisor(parse_unit("million")?);
//! let income = dataset.build_report(9512, true, &request)?;
//! println!("{}", income.to_json()?);
//!
//! let indicators = dataset.build_indicators(9512, true, 0.34)?;
//! let roic = indicators.value("return_on_capital", "2023-09-30 (ltm)");
//! ```

pub mod dataset;
pub mod dedup;
pub mod entry;
pub mod error;
pub mod indicators;
pub mod ingestion;
pub mod language;
pub mod ltm;
pub mod pipeline;
pub mod pivot;
pub mod pruner;
pub mod report;
pub mod utils;

pub use dataset::{CompanyInfo, Dataset, DatasetHandle, DatasetSummary};
pub use dedup::{deduplicate, filing_precedence, EntryKey};
pub use entry::{
    AccountCode, AccountingEntry, AccountingMethod, EntryOrigin, PeriodOrder, StatementKind,
};
pub use error::{FinancialReportError, Result};
pub use indicators::{compute_indicators, Indicator, IndicatorOptions, IndicatorSources};
pub use ingestion::{normalize_raw_rows, RawStatementRow};
pub use language::{AccountNameTranslator, Translation, UNTRANSLATED_MARKER};
pub use ltm::{adjust_ltm, LtmAdjustment, LtmComponent, OmittedAccount};
pub use pipeline::{
    normalize_entries, retain_reporting_periods, NormalizationPipeline, NormalizedEntries,
    PipelineSummary,
};
pub use pivot::{Cell, ColumnKind, PeriodColumn, PivotRow, PivotTable, LTM_SUFFIX};
pub use pruner::{last_quarter_by_company, prune_quarters};
pub use report::{build_report, build_sparse_report, parse_unit, ReportRequest, StatementFamily};
pub use utils::*;
