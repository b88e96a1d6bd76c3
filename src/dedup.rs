use crate::entry::{AccountCode, AccountingEntry};
use chrono::NaiveDate;
use log::debug;
use std::cmp::Ordering;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// Identity of an accounting fact. Two entries sharing a key are versions of
/// the same value and only one of them survives deduplication.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct EntryKey {
    pub company_id: u32,
    pub is_consolidated: bool,
    pub is_annual: bool,
    pub account_code: AccountCode,
    pub period_begin: Option<NaiveDate>,
    pub period_end: NaiveDate,
    pub equity_statement_column: Option<String>,
}

impl EntryKey {
    pub fn of(entry: &AccountingEntry) -> Self {
        Self {
            company_id: entry.company_id,
            is_consolidated: entry.is_consolidated,
            is_annual: entry.is_annual,
            account_code: entry.account_code.clone(),
            period_begin: entry.period_begin,
            period_end: entry.period_end,
            equity_statement_column: entry.equity_statement_column.clone(),
        }
    }
}

/// Orders two versions of the same fact; the greater one is authoritative.
///
/// Later filings win, then higher report versions. Anything still tied is
/// broken by the remaining fields so the winner never depends on input order.
pub fn filing_precedence(a: &AccountingEntry, b: &AccountingEntry) -> Ordering {
    a.period_reference
        .cmp(&b.period_reference)
        .then_with(|| a.report_version.cmp(&b.report_version))
        .then_with(|| a.value.total_cmp(&b.value))
        .then_with(|| a.account_name.cmp(&b.account_name))
        .then_with(|| a.is_fixed_account.cmp(&b.is_fixed_account))
        .then_with(|| a.fiscal_id.cmp(&b.fiscal_id))
        .then_with(|| a.period_order.cmp(&b.period_order))
        .then_with(|| a.origin.cmp(&b.origin))
}

/// Collapses restated and repeated filings into one entry per [`EntryKey`].
///
/// The output is sorted by key and is a fixed point: deduplicating it again
/// returns it unchanged.
pub fn deduplicate(entries: Vec<AccountingEntry>) -> Vec<AccountingEntry> {
    let input_len = entries.len();
    let mut survivors: BTreeMap<EntryKey, AccountingEntry> = BTreeMap::new();

    for entry in entries {
        match survivors.entry(EntryKey::of(&entry)) {
            Entry::Vacant(slot) => {
                slot.insert(entry);
            }
            Entry::Occupied(mut slot) => {
                if filing_precedence(&entry, slot.get()) == Ordering::Greater {
                    slot.insert(entry);
                }
            }
        }
    }

    debug!(
        "Deduplicated {} entries into {} ({} superseded)",
        input_len,
        survivors.len(),
        input_len - survivors.len()
    );

    survivors.into_values().collect()
}
