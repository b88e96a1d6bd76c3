use crate::dedup::deduplicate;
use crate::entry::AccountingEntry;
use crate::ltm::{adjust_ltm, OmittedAccount};
use crate::pruner::prune_quarters;
use crate::utils::max_date;
use chrono::NaiveDate;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineSummary {
    pub input_rows: usize,
    pub duplicates_removed: usize,
    pub quarterly_rows_pruned: usize,
    pub ltm_rows: usize,
    pub omitted_ltm_accounts: Vec<OmittedAccount>,
    pub output_rows: usize,
}

#[derive(Debug, Clone, Default)]
pub struct NormalizedEntries {
    pub entries: Vec<AccountingEntry>,
    pub summary: PipelineSummary,
}

pub struct NormalizationPipeline;

impl NormalizationPipeline {
    /// Deduplicate -> prune quarters -> LTM adjust -> keep reporting periods.
    pub fn run(entries: Vec<AccountingEntry>) -> NormalizedEntries {
        let mut summary = PipelineSummary {
            input_rows: entries.len(),
            ..Default::default()
        };

        let deduplicated = deduplicate(entries);
        summary.duplicates_removed = summary.input_rows - deduplicated.len();

        let before_pruning = deduplicated.len();
        let pruned = prune_quarters(deduplicated);
        summary.quarterly_rows_pruned = before_pruning - pruned.len();

        let adjustment = adjust_ltm(pruned);
        summary.ltm_rows = adjustment.synthetic_rows;
        summary.omitted_ltm_accounts = adjustment.omitted_accounts;

        let entries = retain_reporting_periods(adjustment.entries);
        summary.output_rows = entries.len();

        info!(
            "Normalized {} entries into {} ({} duplicates, {} stale quarterly rows, {} LTM rows)",
            summary.input_rows,
            summary.output_rows,
            summary.duplicates_removed,
            summary.quarterly_rows_pruned,
            summary.ltm_rows
        );

        NormalizedEntries { entries, summary }
    }
}

pub fn normalize_entries(entries: Vec<AccountingEntry>) -> NormalizedEntries {
    NormalizationPipeline::run(entries)
}

/// Drops quarterly rows that no report column shows.
///
/// Per company/method a quarterly entry survives only when it belongs to the
/// latest quarter and that quarter is newer than the latest annual close.
/// The prior-year comparatives kept for the LTM computation go away here.
pub fn retain_reporting_periods(entries: Vec<AccountingEntry>) -> Vec<AccountingEntry> {
    let mut bounds: BTreeMap<(u32, bool), (Option<NaiveDate>, Option<NaiveDate>)> = BTreeMap::new();
    for entry in &entries {
        let (annual, quarter) = bounds
            .entry((entry.company_id, entry.is_consolidated))
            .or_default();
        let slot = if entry.is_annual { annual } else { quarter };
        *slot = max_date(slot.iter().copied().chain([entry.period_end]));
    }

    let before = entries.len();
    let kept: Vec<AccountingEntry> = entries
        .into_iter()
        .filter(|entry| {
            if entry.is_annual {
                return true;
            }
            match bounds.get(&(entry.company_id, entry.is_consolidated)) {
                Some((last_annual, Some(last_quarter))) => {
                    entry.period_end == *last_quarter
                        && last_annual.map_or(true, |annual| *last_quarter > annual)
                }
                _ => false,
            }
        })
        .collect();

    debug!("Retained {} of {} entries for reporting", kept.len(), before);
    kept
}
