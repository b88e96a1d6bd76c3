use crate::entry::AccountingEntry;
use crate::utils::one_year_before;
use chrono::NaiveDate;
use log::debug;
use std::collections::BTreeMap;

/// Latest quarterly `period_end` per company.
pub fn last_quarter_by_company(entries: &[AccountingEntry]) -> BTreeMap<u32, NaiveDate> {
    let mut last: BTreeMap<u32, NaiveDate> = BTreeMap::new();
    for entry in entries.iter().filter(|e| !e.is_annual) {
        last.entry(entry.company_id)
            .and_modify(|d| *d = (*d).max(entry.period_end))
            .or_insert(entry.period_end);
    }
    last
}

/// Keeps every annual entry and, per company, only the quarterly entries of
/// the most recent interim period and of the same period one year earlier.
pub fn prune_quarters(entries: Vec<AccountingEntry>) -> Vec<AccountingEntry> {
    let last_quarters = last_quarter_by_company(&entries);
    let input_len = entries.len();

    let kept: Vec<AccountingEntry> = entries
        .into_iter()
        .filter(|entry| {
            if entry.is_annual {
                return true;
            }
            match last_quarters.get(&entry.company_id) {
                Some(&last) => {
                    entry.period_end == last || Some(entry.period_end) == one_year_before(last)
                }
                None => false,
            }
        })
        .collect();

    debug!(
        "Pruned {} stale quarterly entries ({} kept)",
        input_len - kept.len(),
        kept.len()
    );

    kept
}
