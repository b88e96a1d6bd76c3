use crate::entry::{AccountCode, AccountingEntry, EntryOrigin, PeriodOrder};
use crate::error::{FinancialReportError, Result};
use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};

/// One statement line as published by the regulator, with its locale codes.
///
/// Field names follow the regulator's column headers so a row deserializes
/// straight from the published layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawStatementRow {
    #[serde(rename = "CD_CVM")]
    pub company_id: u32,
    #[serde(rename = "CNPJ_CIA")]
    pub fiscal_id: String,
    /// `DFP` (annual) or `ITR` (quarterly)
    #[serde(rename = "TIPO")]
    pub filing_kind: String,
    #[serde(rename = "VERSAO")]
    pub report_version: u16,
    #[serde(rename = "DT_REFER")]
    pub period_reference: String,
    #[serde(rename = "DT_INI_EXERC", default)]
    pub period_begin: Option<String>,
    #[serde(rename = "DT_FIM_EXERC")]
    pub period_end: String,
    /// `ÚLTIMO` or `PENÚLTIMO`
    #[serde(rename = "ORDEM_EXERC")]
    pub period_order: String,
    /// e.g. `DF Consolidado - Balanço Patrimonial Ativo`
    #[serde(rename = "GRUPO_DFP")]
    pub statement_group: String,
    #[serde(rename = "CD_CONTA")]
    pub account_code: String,
    #[serde(rename = "DS_CONTA")]
    pub account_name: String,
    /// `S` or `N`
    #[serde(rename = "ST_CONTA_FIXA")]
    pub fixed_account_flag: String,
    /// `MIL` or `UNIDADE`
    #[serde(rename = "ESCALA_MOEDA")]
    pub currency_scale: String,
    #[serde(rename = "VL_CONTA")]
    pub value: f64,
    #[serde(rename = "COLUNA_DF", default)]
    pub equity_statement_column: Option<String>,
}

fn invalid(field: &'static str, value: &str) -> FinancialReportError {
    FinancialReportError::InvalidRawField {
        field,
        value: value.to_string(),
    }
}

fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| invalid(field, value))
}

fn parse_filing_kind(value: &str) -> Result<bool> {
    match value.trim() {
        "DFP" => Ok(true),
        "ITR" => Ok(false),
        _ => Err(invalid("filing_kind", value)),
    }
}

fn parse_period_order(value: &str) -> Result<PeriodOrder> {
    match value.trim() {
        "ÚLTIMO" => Ok(PeriodOrder::Last),
        "PENÚLTIMO" => Ok(PeriodOrder::Previous),
        _ => Err(invalid("period_order", value)),
    }
}

fn parse_statement_group(value: &str) -> Result<bool> {
    let group = value.trim();
    if group.starts_with("DF Consolidado") {
        Ok(true)
    } else if group.starts_with("DF Individual") {
        Ok(false)
    } else {
        Err(invalid("statement_group", value))
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim() {
        "S" => Ok(true),
        "N" => Ok(false),
        _ => Err(invalid("fixed_account_flag", value)),
    }
}

fn currency_multiplier(value: &str) -> Result<f64> {
    match value.trim() {
        "MIL" => Ok(1_000.0),
        "UNIDADE" => Ok(1.0),
        _ => Err(invalid("currency_scale", value)),
    }
}

/// Share-class spellings that differ only in casing or padding.
fn harmonize_account_name(name: &str) -> String {
    match name {
        "\u{a0}ON\u{a0}" | "On" => "ON".to_string(),
        _ => name.to_string(),
    }
}

fn normalize_row(row: &RawStatementRow) -> Result<AccountingEntry> {
    let account_code =
        AccountCode::parse(&row.account_code).ok_or_else(|| invalid("account_code", &row.account_code))?;

    let period_begin = match row.period_begin.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(date) => Some(parse_date("period_begin", date)?),
    };

    let multiplier = currency_multiplier(&row.currency_scale)?;
    // Per-share figures are published unscaled
    let value = if account_code.is_per_share() {
        row.value
    } else {
        row.value * multiplier
    };

    Ok(AccountingEntry {
        company_id: row.company_id,
        fiscal_id: row.fiscal_id.trim().to_string(),
        is_annual: parse_filing_kind(&row.filing_kind)?,
        is_consolidated: parse_statement_group(&row.statement_group)?,
        report_version: row.report_version,
        period_reference: parse_date("period_reference", &row.period_reference)?,
        period_begin,
        period_end: parse_date("period_end", &row.period_end)?,
        period_order: parse_period_order(&row.period_order)?,
        account_code,
        account_name: harmonize_account_name(&row.account_name),
        is_fixed_account: parse_flag(&row.fixed_account_flag)?,
        value,
        equity_statement_column: row
            .equity_statement_column
            .as_deref()
            .map(str::trim)
            .filter(|column| !column.is_empty())
            .map(str::to_string),
        origin: EntryOrigin::Filed,
    })
}

/// Maps raw regulator rows into [`AccountingEntry`] values.
///
/// Fails on the first row carrying a code outside the known vocabularies.
pub fn normalize_raw_rows(rows: &[RawStatementRow]) -> Result<Vec<AccountingEntry>> {
    let entries = rows.iter().map(normalize_row).collect::<Result<Vec<_>>>()?;
    debug!("Normalized {} raw statement rows", entries.len());
    Ok(entries)
}
