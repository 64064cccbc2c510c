use std::collections::BTreeMap;

use crate::error::{Diagnostic, DiagnosticKind};
use crate::model::{Decision, DecisionState, RunSummary};

/// Group-level counts the engine tracks itself; everything else is derived
/// from the decision log and diagnostics.
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupCounts {
    pub total: usize,
    pub skipped: usize,
}

/// Compute summary statistics for a run.
pub fn compute_summary(
    groups: GroupCounts,
    decisions: &[Decision],
    diagnostics: &[Diagnostic],
    records: usize,
) -> RunSummary {
    let mut method_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut matched = 0;
    let mut unmatched = 0;
    let mut superseded = 0;

    for d in decisions {
        match d.state {
            DecisionState::Matched => matched += 1,
            DecisionState::Superseded => {
                matched += 1;
                superseded += 1;
            }
            DecisionState::Unmatched => unmatched += 1,
            DecisionState::Skipped => {}
        }
        if let Some(method) = d.method {
            *method_counts.entry(method.to_string()).or_insert(0) += 1;
        }
    }

    let count = |kind: DiagnosticKind| diagnostics.iter().filter(|d| d.kind == kind).count();
    // Receipts that could not even be read from disk never reach the
    // decision log, so unreadable counts come from diagnostics.
    let unreadable = count(DiagnosticKind::UnreadableReceipt);

    RunSummary {
        groups_total: groups.total,
        groups_skipped: groups.skipped,
        receipts_total: matched + unmatched + unreadable,
        matched,
        unmatched,
        unreadable,
        superseded,
        hash_mismatches: count(DiagnosticKind::HashMismatch),
        duplicate_slugs: count(DiagnosticKind::DuplicateSlug),
        file_errors: count(DiagnosticKind::FileIo),
        records,
        method_counts,
    }
}
