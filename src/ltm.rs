use crate::dedup::filing_precedence;
use crate::entry::{AccountCode, AccountingEntry, AccountingMethod, EntryOrigin, PeriodOrder};
use crate::utils::{max_date, one_year_before};
use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One of the three source rows an LTM figure is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LtmComponent {
    CurrentQuarter,
    LastAnnual,
    PreviousYearQuarter,
}

/// A flow account for which no LTM row could be produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OmittedAccount {
    pub company_id: u32,
    pub method: AccountingMethod,
    pub account_code: AccountCode,
    pub missing: Vec<LtmComponent>,
}

#[derive(Debug, Clone, Default)]
pub struct LtmAdjustment {
    pub entries: Vec<AccountingEntry>,
    pub synthetic_rows: usize,
    /// Accounts left out of the LTM column because a source row was missing.
    pub omitted_accounts: Vec<OmittedAccount>,
}

/// Replaces quarterly flow entries (income, cash flow) with trailing-twelve-month rows.
///
/// For every company/method whose latest quarter is newer than its latest
/// annual close, each flow account gets
/// `current quarter + (last annual - same quarter one year earlier)`.
/// Otherwise only the annual flow entries are kept. Balance sheet and other
/// stock entries are passed through untouched.
pub fn adjust_ltm(entries: Vec<AccountingEntry>) -> LtmAdjustment {
    let mut groups: BTreeMap<(u32, bool), Vec<AccountingEntry>> = BTreeMap::new();
    for entry in entries {
        groups
            .entry((entry.company_id, entry.is_consolidated))
            .or_default()
            .push(entry);
    }

    let mut adjustment = LtmAdjustment::default();
    for ((company_id, is_consolidated), group) in groups {
        let method = AccountingMethod::from_consolidated(is_consolidated);
        adjust_group(company_id, method, group, &mut adjustment);
    }

    debug!(
        "LTM adjustment produced {} synthetic rows, {} accounts omitted",
        adjustment.synthetic_rows,
        adjustment.omitted_accounts.len()
    );

    adjustment
}

fn adjust_group(
    company_id: u32,
    method: AccountingMethod,
    group: Vec<AccountingEntry>,
    adjustment: &mut LtmAdjustment,
) {
    let last_annual = max_date(group.iter().filter(|e| e.is_annual).map(|e| e.period_end));
    let last_quarter = max_date(group.iter().filter(|e| !e.is_annual).map(|e| e.period_end));

    let (flows, stocks): (Vec<AccountingEntry>, Vec<AccountingEntry>) =
        group.into_iter().partition(AccountingEntry::is_flow);
    adjustment.entries.extend(stocks);

    let last_quarter = match (last_annual, last_quarter) {
        (_, None) => None,
        (Some(annual), Some(quarter)) if annual >= quarter => None,
        (_, Some(quarter)) => Some(quarter),
    };

    let Some(last_quarter) = last_quarter else {
        adjustment
            .entries
            .extend(flows.into_iter().filter(|e| e.is_annual));
        return;
    };

    let ltm_rows = build_ltm_rows(company_id, method, &flows, last_annual, last_quarter, adjustment);
    adjustment.synthetic_rows += ltm_rows.len();
    adjustment
        .entries
        .extend(flows.into_iter().filter(|e| e.is_annual));
    adjustment.entries.extend(ltm_rows);
}

fn build_ltm_rows(
    company_id: u32,
    method: AccountingMethod,
    flows: &[AccountingEntry],
    last_annual: Option<NaiveDate>,
    last_quarter: NaiveDate,
    adjustment: &mut LtmAdjustment,
) -> Vec<AccountingEntry> {
    let previous_end = one_year_before(last_quarter);

    let codes: BTreeSet<&AccountCode> = flows
        .iter()
        .filter(|e| {
            let is_current = !e.is_annual && e.period_end == last_quarter;
            let is_previous = !e.is_annual && Some(e.period_end) == previous_end;
            let is_last_annual = e.is_annual && Some(e.period_end) == last_annual;
            is_current || is_previous || is_last_annual
        })
        .map(|e| &e.account_code)
        .collect();

    let mut rows = Vec::new();
    for code in codes {
        let of_code = || flows.iter().filter(move |e| &e.account_code == code);

        let current = earliest_begin(of_code().filter(|e| !e.is_annual && e.period_end == last_quarter));
        let annual = earliest_begin(of_code().filter(|e| e.is_annual && Some(e.period_end) == last_annual));
        let previous = select_previous_year_quarter(
            of_code()
                .filter(|e| !e.is_annual && Some(e.period_end) == previous_end)
                .collect(),
            last_quarter,
        );

        match (current, annual, previous, previous_end) {
            (Some(current), Some(annual), Some(previous), Some(previous_end)) => {
                // Previous-year quarter is negated and summed with the other two
                let value = current.value + -previous.value + annual.value;
                rows.push(AccountingEntry {
                    is_annual: false,
                    period_begin: Some(previous_end),
                    period_end: last_quarter,
                    period_order: PeriodOrder::Last,
                    value,
                    origin: EntryOrigin::TrailingTwelveMonths,
                    ..current.clone()
                });
            }
            (current, annual, previous, _) => {
                let mut missing = Vec::new();
                if current.is_none() {
                    missing.push(LtmComponent::CurrentQuarter);
                }
                if annual.is_none() {
                    missing.push(LtmComponent::LastAnnual);
                }
                if previous.is_none() {
                    missing.push(LtmComponent::PreviousYearQuarter);
                }
                debug!(
                    "Company {} ({}): no LTM row for {}, missing {:?}",
                    company_id, method, code, missing
                );
                adjustment.omitted_accounts.push(OmittedAccount {
                    company_id,
                    method,
                    account_code: code.clone(),
                    missing,
                });
            }
        }
    }

    rows
}

/// Year-to-date rows start earliest; quarter-only columns of the same filing start later.
fn earliest_begin<'a>(
    entries: impl IntoIterator<Item = &'a AccountingEntry>,
) -> Option<&'a AccountingEntry> {
    entries.into_iter().min_by(|a, b| {
        a.period_begin
            .cmp(&b.period_begin)
            .then_with(|| filing_precedence(b, a))
    })
}

/// Prefers the comparative column of the current filing (`period_reference ==
/// last_quarter`) and falls back to whichever filing survived deduplication.
fn select_previous_year_quarter(
    candidates: Vec<&AccountingEntry>,
    last_quarter: NaiveDate,
) -> Option<&AccountingEntry> {
    let from_current_filing: Vec<&AccountingEntry> = candidates
        .iter()
        .copied()
        .filter(|e| e.period_reference == last_quarter)
        .collect();

    if from_current_filing.is_empty() {
        earliest_begin(candidates)
    } else {
        earliest_begin(from_current_filing)
    }
}
