use std::collections::BTreeMap;

use crate::assemble::{assemble, Accumulator, GroupContext};
use crate::config::ProofConfig;
use crate::error::{Diagnostic, DiagnosticKind, ReconError};
use crate::index::{file_stem, CandidateIndex, ContentHasher};
use crate::matcher::match_in_group;
use crate::model::{Aggregates, Decision, DecisionState, GroupInput, MatchMethod, RunMeta, RunOutcome};
use crate::normalize::{parse_receipt, ReceiptSchema};
use crate::summary::{compute_summary, GroupCounts};
use crate::version::{base_slug, resolve_version};

/// Run the pipeline over pre-scanned groups. Returns proof records, the
/// decision log and diagnostics. No filesystem output happens here.
///
/// Only a `reject` duplicate-slug conflict fails the run; everything else is
/// reported as a diagnostic.
pub fn run(
    config: &ProofConfig,
    groups: &[GroupInput],
    hasher: &dyn ContentHasher,
) -> Result<RunOutcome, ReconError> {
    run_with_diagnostics(config, groups, hasher, Vec::new())
}

/// [`run`], seeded with diagnostics raised while the groups were scanned so
/// they are logged and counted with the rest of the run.
pub fn run_with_diagnostics(
    config: &ProofConfig,
    groups: &[GroupInput],
    hasher: &dyn ContentHasher,
    scanned: Vec<Diagnostic>,
) -> Result<RunOutcome, ReconError> {
    let schema = ReceiptSchema::default().with_extra_keys(&config.receipt.extra_keys);
    let mut acc = Accumulator::new(config.duplicate_slugs);
    let mut decisions = Vec::new();
    let mut diagnostics = Vec::new();
    for d in scanned {
        push(&mut diagnostics, d);
    }
    let mut counts = GroupCounts {
        total: groups.len(),
        skipped: 0,
    };

    if groups.is_empty() {
        push(
            &mut diagnostics,
            Diagnostic::warning(
                DiagnosticKind::MissingInput,
                "",
                &config.input_dir,
                "no group directories found",
            ),
        );
    }

    for group in groups {
        let group_acc = Accumulator::new(config.duplicate_slugs);
        match process_group(config, &schema, group, hasher, group_acc, &mut decisions, &mut diagnostics) {
            Some(group_acc) => {
                for d in acc.merge(group_acc) {
                    push(&mut diagnostics, d);
                }
            }
            None => counts.skipped += 1,
        }
    }

    let aggregates = acc.finalize()?;
    mark_superseded(&mut decisions, &aggregates);
    let summary = compute_summary(counts, &decisions, &diagnostics, aggregates.proofs.len());
    log::info!(
        "{} receipts, {} matched, {} records",
        summary.receipts_total,
        summary.matched,
        summary.records
    );

    Ok(RunOutcome {
        meta: RunMeta {
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        decisions,
        diagnostics,
        aggregates,
    })
}

/// Process one group into its own accumulator. `None` means the group was
/// skipped for missing input.
fn process_group(
    config: &ProofConfig,
    schema: &ReceiptSchema,
    group: &GroupInput,
    hasher: &dyn ContentHasher,
    mut acc: Accumulator,
    decisions: &mut Vec<Decision>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<Accumulator> {
    let label = group.label.as_str();
    if group.receipts.is_empty() || group.documents.is_empty() {
        let missing = if group.receipts.is_empty() { "receipts" } else { "documents" };
        push(
            diagnostics,
            Diagnostic::warning(
                DiagnosticKind::MissingInput,
                label,
                label,
                format!("no {missing}; group skipped"),
            ),
        );
        return None;
    }

    log::info!(
        "[{label}] {} documents, {} receipts",
        group.documents.len(),
        group.receipts.len()
    );

    let mut index_diags = Vec::new();
    let index = CandidateIndex::build(label, &group.documents, hasher, &mut index_diags);
    for d in index_diags {
        push(diagnostics, d);
    }

    let base = base_slug(label);
    let ctx = GroupContext {
        label,
        base_slug: &base,
        attestations: &group.attestations,
        screenshots: &group.screenshots,
    };

    let mut receipts: Vec<_> = group.receipts.iter().collect();
    receipts.sort_by(|a, b| a.name.cmp(&b.name));

    for source in receipts {
        let receipt = match parse_receipt(schema, source) {
            Ok(r) => r,
            Err(msg) => {
                push(
                    diagnostics,
                    Diagnostic::warning(DiagnosticKind::UnreadableReceipt, label, &source.name, msg),
                );
                record(
                    decisions,
                    Decision {
                        group: label.to_string(),
                        receipt: source.name.clone(),
                        state: DecisionState::Skipped,
                        method: None,
                        document: None,
                        slug: None,
                    },
                );
                continue;
            }
        };

        let matched = match_in_group(&receipt, &index, group.documents.len(), group.receipts.len());
        let Some(document) = matched.document else {
            push(
                diagnostics,
                Diagnostic::warning(
                    DiagnosticKind::UnmatchedReceipt,
                    label,
                    &source.name,
                    "no document matched by name or hash",
                ),
            );
            record(
                decisions,
                Decision {
                    group: label.to_string(),
                    receipt: source.name.clone(),
                    state: DecisionState::Unmatched,
                    method: Some(MatchMethod::Unmatched),
                    document: None,
                    slug: None,
                },
            );
            continue;
        };

        let version = resolve_version(file_stem(&document.file.name), label, &config.default_version);
        let (proof, mismatch) = assemble(&receipt, &source.path, document, &version, &ctx, config);
        if let Some(d) = mismatch {
            push(diagnostics, d);
        }

        record(
            decisions,
            Decision {
                group: label.to_string(),
                receipt: source.name.clone(),
                state: DecisionState::Matched,
                method: Some(matched.method),
                document: Some(document.file.name.clone()),
                slug: Some(proof.slug.clone()),
            },
        );
        if let Some(d) = acc.fold(proof) {
            push(diagnostics, d);
        }
    }

    Some(acc)
}

/// Flag matched decisions whose record is not the one the aggregates kept
/// for its slug.
fn mark_superseded(decisions: &mut [Decision], aggregates: &Aggregates) {
    let kept: BTreeMap<&str, (&str, &str)> = aggregates
        .proofs
        .iter()
        .map(|p| (p.slug.as_str(), (p.group.as_str(), p.sources.receipt_name.as_str())))
        .collect();
    for d in decisions.iter_mut().filter(|d| d.state == DecisionState::Matched) {
        let Some(slug) = d.slug.as_deref() else { continue };
        if kept.get(slug) != Some(&(d.group.as_str(), d.receipt.as_str())) {
            d.state = DecisionState::Superseded;
            log::debug!("{d}");
        }
    }
}

fn push(diagnostics: &mut Vec<Diagnostic>, diagnostic: Diagnostic) {
    diagnostic.emit();
    diagnostics.push(diagnostic);
}

fn record(decisions: &mut Vec<Decision>, decision: Decision) {
    log::debug!("{decision}");
    decisions.push(decision);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DuplicateSlugPolicy;
    use crate::index::testing::{doc, hash_of, TableHasher};
    use crate::model::{AnnexFile, ReceiptSource};

    fn receipt(group: &str, name: &str, body: &str) -> ReceiptSource {
        ReceiptSource {
            path: format!("{group}/{name}").into(),
            name: name.into(),
            body: body.into(),
        }
    }

    fn report_group() -> GroupInput {
        GroupInput {
            label: "Report".into(),
            documents: vec![doc("Report", "Report.pdf", 1)],
            receipts: vec![receipt("Report", "Report_receipt.json", r#"{"id": "p-1"}"#)],
            ..GroupInput::default()
        }
    }

    #[test]
    fn single_pair_matches_by_name() {
        let hasher = TableHasher::default().with("Report/Report.pdf", &hash_of('a'));
        let outcome = run(&ProofConfig::default(), &[report_group()], &hasher).unwrap();

        assert_eq!(outcome.summary.matched, 1);
        assert_eq!(outcome.aggregates.proofs.len(), 1);
        let record = &outcome.aggregates.proofs[0].record;
        assert_eq!(record.composite_slug(), "report_v1-0");
        assert_eq!(record.attestation.proof_id.as_deref(), Some("p-1"));
        assert_eq!(record.anchoring.txid, None);
        assert_eq!(record.anchoring.block_height, None);
        assert_eq!(record.dates.anchored_utc, None);
        assert_eq!(outcome.decisions[0].method, Some(MatchMethod::Name));
        assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn group_without_receipts_is_skipped() {
        let group = GroupInput {
            receipts: vec![],
            ..report_group()
        };
        let outcome = run(&ProofConfig::default(), &[group], &TableHasher::default()).unwrap();
        assert_eq!(outcome.summary.groups_skipped, 1);
        assert_eq!(outcome.diagnostics[0].kind, DiagnosticKind::MissingInput);
        assert_eq!(outcome.summary.records, 0);
    }

    #[test]
    fn no_groups_is_missing_input() {
        let outcome = run(&ProofConfig::default(), &[], &TableHasher::default()).unwrap();
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(outcome.diagnostics[0].kind, DiagnosticKind::MissingInput);
    }

    #[test]
    fn unreadable_and_unmatched_receipts_are_logged() {
        let group = GroupInput {
            label: "G".into(),
            documents: vec![doc("G", "A.pdf", 1)],
            receipts: vec![
                receipt("G", "broken.json", "{not json"),
                receipt("G", "list.json", "[1, 2]"),
                receipt("G", "Other.json", "{}"),
            ],
            ..GroupInput::default()
        };
        let hasher = TableHasher::default().with("G/A.pdf", &hash_of('a'));
        let outcome = run(&ProofConfig::default(), &[group], &hasher).unwrap();

        let states: Vec<_> = outcome.decisions.iter().map(|d| (d.receipt.as_str(), d.state)).collect();
        assert_eq!(
            states,
            vec![
                ("Other.json", DecisionState::Unmatched),
                ("broken.json", DecisionState::Skipped),
                ("list.json", DecisionState::Skipped),
            ]
        );
        assert_eq!(outcome.summary.unreadable, 2);
        assert_eq!(outcome.summary.unmatched, 1);
        assert_eq!(outcome.summary.records, 0);
    }

    #[test]
    fn declared_hash_selects_document_and_version_comes_from_label() {
        let hb = hash_of('b');
        let group = GroupInput {
            label: "Report_v2".into(),
            documents: vec![doc("Report_v2", "A.pdf", 1), doc("Report_v2", "B.pdf", 1)],
            receipts: vec![receipt(
                "Report_v2",
                "Report_receipt.json",
                &format!(r#"{{"targetHash": "{hb}"}}"#),
            )],
            ..GroupInput::default()
        };
        let hasher = TableHasher::default()
            .with("Report_v2/A.pdf", &hash_of('a'))
            .with("Report_v2/B.pdf", &hb);
        let outcome = run(&ProofConfig::default(), &[group], &hasher).unwrap();

        let proof = &outcome.aggregates.proofs[0];
        assert_eq!(proof.slug, "report_v2-0");
        assert_eq!(proof.record.document.sha256, hb);
        assert_eq!(outcome.decisions[0].document.as_deref(), Some("B.pdf"));
        assert_eq!(outcome.decisions[0].method, Some(MatchMethod::Hash));
    }

    #[test]
    fn annexes_travel_with_the_proof() {
        let group = GroupInput {
            attestations: vec![
                AnnexFile { path: "Report/x_receipt.pdf".into(), name: "x_receipt.pdf".into() },
                AnnexFile { path: "Report/Report_receipt.pdf".into(), name: "Report_receipt.pdf".into() },
            ],
            screenshots: vec![AnnexFile { path: "Report/woleet.png".into(), name: "woleet.png".into() }],
            ..report_group()
        };
        let hasher = TableHasher::default().with("Report/Report.pdf", &hash_of('a'));
        let outcome = run(&ProofConfig::default(), &[group], &hasher).unwrap();
        let sources = &outcome.aggregates.proofs[0].sources;
        assert_eq!(sources.attestation.as_ref().unwrap().name, "Report_receipt.pdf");
        assert_eq!(sources.screenshot.as_ref().unwrap().name, "woleet.png");
    }

    #[test]
    fn scan_diagnostics_are_counted() {
        let hasher = TableHasher::default().with("Report/Report.pdf", &hash_of('a'));
        let scanned = vec![Diagnostic::warning(
            DiagnosticKind::UnreadableReceipt,
            "Report",
            "extra.json",
            "cannot read: invalid UTF-8",
        )];
        let outcome =
            run_with_diagnostics(&ProofConfig::default(), &[report_group()], &hasher, scanned).unwrap();
        assert_eq!(outcome.summary.unreadable, 1);
        assert_eq!(outcome.summary.receipts_total, 2);
        assert_eq!(outcome.diagnostics[0].subject, "extra.json");
    }

    #[test]
    fn unhashable_document_does_not_make_a_sole_pair() {
        let group = GroupInput {
            label: "G".into(),
            documents: vec![doc("G", "Alpha.pdf", 1), doc("G", "Beta.pdf", 1)],
            receipts: vec![receipt("G", "Alpha_receipt.json", "{}")],
            ..GroupInput::default()
        };
        // Alpha.pdf has no entry, so hashing it fails.
        let hasher = TableHasher::default().with("G/Beta.pdf", &hash_of('b'));
        let outcome = run(&ProofConfig::default(), &[group], &hasher).unwrap();

        assert!(outcome.aggregates.proofs.is_empty());
        assert_eq!(outcome.decisions[0].state, DecisionState::Unmatched);
        assert_eq!(outcome.decisions[0].document, None);
        let kinds: Vec<_> = outcome.diagnostics.iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![DiagnosticKind::FileIo, DiagnosticKind::UnmatchedReceipt]);
    }

    #[test]
    fn sole_pair_is_tagged_as_such() {
        let group = GroupInput {
            receipts: vec![receipt("Report", "scan_0042.json", "{}")],
            ..report_group()
        };
        let hasher = TableHasher::default().with("Report/Report.pdf", &hash_of('a'));
        let outcome = run(&ProofConfig::default(), &[group], &hasher).unwrap();
        assert_eq!(outcome.decisions[0].method, Some(MatchMethod::SolePair));
        assert_eq!(outcome.summary.method_counts["sole-pair"], 1);
    }

    #[test]
    fn duplicate_slug_policies() {
        let groups = vec![
            report_group(),
            GroupInput {
                label: "report".into(),
                documents: vec![doc("report", "report.pdf", 1)],
                receipts: vec![receipt("report", "report.json", "{}")],
                ..GroupInput::default()
            },
        ];
        let hasher = TableHasher::default()
            .with("Report/Report.pdf", &hash_of('a'))
            .with("report/report.pdf", &hash_of('b'));

        let outcome = run(&ProofConfig::default(), &groups, &hasher).unwrap();
        assert_eq!(outcome.summary.duplicate_slugs, 1);
        assert_eq!(outcome.aggregates.proofs[0].record.document.sha256, hash_of('b'));
        let states: Vec<_> = outcome.decisions.iter().map(|d| (d.group.as_str(), d.state)).collect();
        assert_eq!(
            states,
            vec![("Report", DecisionState::Superseded), ("report", DecisionState::Matched)]
        );
        assert_eq!(outcome.summary.matched, 2);
        assert_eq!(outcome.summary.superseded, 1);
        assert_eq!(outcome.summary.records, 1);

        let first_wins = ProofConfig {
            duplicate_slugs: DuplicateSlugPolicy::FirstWriteWins,
            ..ProofConfig::default()
        };
        let outcome = run(&first_wins, &groups, &hasher).unwrap();
        let states: Vec<_> = outcome.decisions.iter().map(|d| (d.group.as_str(), d.state)).collect();
        assert_eq!(
            states,
            vec![("Report", DecisionState::Matched), ("report", DecisionState::Superseded)]
        );

        let reject = ProofConfig {
            duplicate_slugs: DuplicateSlugPolicy::Reject,
            ..ProofConfig::default()
        };
        let err = run(&reject, &groups, &hasher).unwrap_err();
        assert!(matches!(err, ReconError::DuplicateSlug { .. }));
    }
}
