use crate::entry::{AccountingEntry, AccountingMethod};
use crate::error::{FinancialReportError, Result};
use crate::indicators::{compute_indicators, IndicatorOptions, IndicatorSources};
use crate::pipeline::{normalize_entries, PipelineSummary};
use crate::pivot::PivotTable;
use crate::report::{build_report, build_sparse_report, ReportRequest, StatementFamily};
use chrono::NaiveDate;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

type PartitionKey = (u32, AccountingMethod);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyInfo {
    pub company_id: u32,
    pub fiscal_id: String,
    pub method: AccountingMethod,
    pub accounting_rows: usize,
    pub first_annual: Option<NaiveDate>,
    pub last_annual: Option<NaiveDate>,
    pub last_quarter: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub accounting_entries: usize,
    /// Distinct filings (company, annual/quarterly, reference date)
    pub number_of_reports: usize,
    pub first_report: Option<NaiveDate>,
    pub last_report: Option<NaiveDate>,
    pub number_of_companies: usize,
    pub pipeline: PipelineSummary,
}

/// Immutable, normalized snapshot of every company in a batch.
///
/// Built once through the normalization pipeline and then only read, so a
/// snapshot can be shared across threads behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    partitions: BTreeMap<PartitionKey, Vec<AccountingEntry>>,
    fiscal_ids: BTreeMap<String, u32>,
    pipeline: PipelineSummary,
}

impl Dataset {
    pub fn from_entries(entries: Vec<AccountingEntry>) -> Self {
        let normalized = normalize_entries(entries);

        let mut partitions: BTreeMap<PartitionKey, Vec<AccountingEntry>> = BTreeMap::new();
        let mut fiscal_ids = BTreeMap::new();
        for entry in normalized.entries {
            fiscal_ids
                .entry(entry.fiscal_id.trim().to_string())
                .or_insert(entry.company_id);
            partitions
                .entry((entry.company_id, entry.method()))
                .or_default()
                .push(entry);
        }

        info!(
            "Dataset built: {} companies, {} partitions, {} entries",
            fiscal_ids.len(),
            partitions.len(),
            normalized.summary.output_rows
        );

        Self {
            partitions,
            fiscal_ids,
            pipeline: normalized.summary,
        }
    }

    /// Reads a JSON array of entries (the schema of [`AccountingEntry::schema_as_json`]).
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self> {
        let entries: Vec<AccountingEntry> = serde_json::from_reader(reader)?;
        Ok(Self::from_entries(entries))
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_json_reader(BufReader::new(file))
    }

    fn partition(&self, company_id: u32, is_consolidated: bool) -> Result<&[AccountingEntry]> {
        let method = AccountingMethod::from_consolidated(is_consolidated);
        self.partitions
            .get(&(company_id, method))
            .map(Vec::as_slice)
            .ok_or(FinancialReportError::NotFound { company_id, method })
    }

    pub fn entries(&self, company_id: u32, is_consolidated: bool) -> Result<&[AccountingEntry]> {
        self.partition(company_id, is_consolidated)
    }

    pub fn build_report(
        &self,
        company_id: u32,
        is_consolidated: bool,
        request: &ReportRequest,
    ) -> Result<PivotTable> {
        request.validate()?;
        let entries = self.partition(company_id, is_consolidated)?;
        build_report(entries, request)
    }

    pub fn build_indicators(
        &self,
        company_id: u32,
        is_consolidated: bool,
        tax_rate: f64,
    ) -> Result<PivotTable> {
        let options = IndicatorOptions::default().with_tax_rate(tax_rate);
        self.build_indicators_with(company_id, is_consolidated, &options)
    }

    pub fn build_indicators_with(
        &self,
        company_id: u32,
        is_consolidated: bool,
        options: &IndicatorOptions,
    ) -> Result<PivotTable> {
        options.validate()?;
        let entries = self.partition(company_id, is_consolidated)?;

        let statement = |family: StatementFamily| {
            build_sparse_report(
                entries,
                &ReportRequest::new(family).with_unit_divisor(options.unit_divisor),
            )
        };
        let assets = statement(StatementFamily::Assets)?;
        let liabilities_and_equity = statement(StatementFamily::LiabilitiesAndEquity)?;
        let income = statement(StatementFamily::Income)?;
        let cash_flow = statement(StatementFamily::CashFlow)?;

        let sources = IndicatorSources {
            assets: &assets,
            liabilities_and_equity: &liabilities_and_equity,
            income: &income,
            cash_flow: (!cash_flow.is_empty()).then_some(&cash_flow),
        };
        compute_indicators(&sources, options)
    }

    pub fn company_info(&self, company_id: u32, is_consolidated: bool) -> Result<CompanyInfo> {
        let entries = self.partition(company_id, is_consolidated)?;
        let annual = entries.iter().filter(|e| e.is_annual).map(|e| e.period_end);
        let quarterly = entries.iter().filter(|e| !e.is_annual).map(|e| e.period_end);

        Ok(CompanyInfo {
            company_id,
            fiscal_id: entries
                .first()
                .map(|e| e.fiscal_id.clone())
                .unwrap_or_default(),
            method: AccountingMethod::from_consolidated(is_consolidated),
            accounting_rows: entries.len(),
            first_annual: annual.clone().min(),
            last_annual: annual.max(),
            last_quarter: quarterly.max(),
        })
    }

    /// Accepts a regulator id (`"9512"`) or a fiscal id (`"33.000.167/0001-01"`).
    pub fn resolve_company(&self, identifier: &str) -> Result<u32> {
        let identifier = identifier.trim();
        if let Ok(company_id) = identifier.parse::<u32>() {
            if self.partitions.keys().any(|(id, _)| *id == company_id) {
                return Ok(company_id);
            }
        }
        self.fiscal_ids
            .get(identifier)
            .copied()
            .ok_or_else(|| FinancialReportError::UnknownCompany(identifier.to_string()))
    }

    pub fn companies(&self) -> Vec<u32> {
        self.partitions
            .keys()
            .map(|(id, _)| *id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn summary(&self) -> DatasetSummary {
        let all = || self.partitions.values().flatten();
        let reports: BTreeSet<(u32, bool, NaiveDate)> = all()
            .filter(|e| !e.is_ltm())
            .map(|e| (e.company_id, e.is_annual, e.period_reference))
            .collect();

        DatasetSummary {
            accounting_entries: all().count(),
            number_of_reports: reports.len(),
            first_report: all().map(|e| e.period_reference).min(),
            last_report: all().map(|e| e.period_reference).max(),
            number_of_companies: self.companies().len(),
            pipeline: self.pipeline.clone(),
        }
    }
}

/// Shared, reloadable access to the current [`Dataset`].
///
/// Readers take an `Arc` snapshot and keep it for the whole request; a
/// refresh swaps the pointer without touching snapshots already handed out.
#[derive(Debug, Default)]
pub struct DatasetHandle {
    current: RwLock<Arc<Dataset>>,
}

impl DatasetHandle {
    pub fn new(dataset: Dataset) -> Self {
        Self {
            current: RwLock::new(Arc::new(dataset)),
        }
    }

    pub fn snapshot(&self) -> Arc<Dataset> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Installs a new snapshot and returns the previous one.
    pub fn refresh(&self, dataset: Dataset) -> Arc<Dataset> {
        let next = Arc::new(dataset);
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        info!(
            "Dataset refreshed: {} companies",
            next.companies().len()
        );
        std::mem::replace(&mut *current, next)
    }
}
