use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use proofrec_recon::config::ProofConfig;
use proofrec_recon::engine::run;
use proofrec_recon::index::ContentHasher;
use proofrec_recon::model::{
    DecisionState, DocumentFile, GroupInput, MatchMethod, ReceiptSource, RunOutcome,
};
use proofrec_recon::DiagnosticKind;

// -------------------------------------------------------------------------
// Fixtures
// -------------------------------------------------------------------------

#[derive(Default)]
struct MapHasher(HashMap<PathBuf, String>);

impl ContentHasher for MapHasher {
    fn digest(&self, path: &Path) -> std::io::Result<String> {
        self.0
            .get(path)
            .cloned()
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, path.display().to_string()))
    }
}

fn hex(c: char) -> String {
    c.to_string().repeat(64)
}

struct Builder {
    groups: Vec<GroupInput>,
    hasher: MapHasher,
}

impl Builder {
    fn new() -> Self {
        Self {
            groups: Vec::new(),
            hasher: MapHasher::default(),
        }
    }

    fn group(mut self, label: &str) -> Self {
        self.groups.push(GroupInput {
            label: label.into(),
            ..GroupInput::default()
        });
        self
    }

    fn document(mut self, name: &str, hash: &str, mtime: u64) -> Self {
        let group = self.groups.last_mut().unwrap();
        let path = PathBuf::from(format!("stamped/{}/{name}", group.label));
        self.hasher.0.insert(path.clone(), hash.to_string());
        group.documents.push(DocumentFile {
            path,
            name: name.into(),
            rel_path: format!("stamped/{}/{name}", group.label),
            size_bytes: 1024,
            mimetype: "application/pdf".into(),
            modified: SystemTime::UNIX_EPOCH + Duration::from_secs(mtime),
        });
        self
    }

    fn receipt(mut self, name: &str, body: &str) -> Self {
        let group = self.groups.last_mut().unwrap();
        group.receipts.push(ReceiptSource {
            path: PathBuf::from(format!("stamped/{}/{name}", group.label)),
            name: name.into(),
            body: body.into(),
        });
        self
    }

    fn run(&self, config: &ProofConfig) -> RunOutcome {
        run(config, &self.groups, &self.hasher).unwrap()
    }
}

// -------------------------------------------------------------------------
// Worked examples
// -------------------------------------------------------------------------

#[test]
fn report_without_declared_hash() {
    let outcome = Builder::new()
        .group("Report")
        .document("Report.pdf", &hex('a'), 10)
        .receipt("Report_receipt.json", r#"{"id": "3f1c", "anchors": []}"#)
        .run(&ProofConfig::default());

    assert_eq!(outcome.aggregates.proofs.len(), 1);
    let record = &outcome.aggregates.proofs[0].record;
    assert_eq!(record.composite_slug(), "report_v1-0");
    assert_eq!(record.document.title, "Report");
    assert_eq!(record.document.filename, "stamped/Report/Report.pdf");
    assert_eq!(record.document.sha256, hex('a'));
    assert_eq!(record.attestation.proof_id.as_deref(), Some("3f1c"));
    assert_eq!(record.anchoring.txid, None);
    assert_eq!(record.anchoring.block_height, None);
    assert_eq!(record.anchoring.block_time_utc, None);
    assert_eq!(record.dates.anchored_utc, None);

    assert_eq!(outcome.aggregates.mapping[0].bitcoin_txid, "");
    assert_eq!(outcome.aggregates.index[0].slug, "report_v1-0");
}

#[test]
fn versioned_group_with_declared_hash() {
    let outcome = Builder::new()
        .group("Report_v2")
        .document("A.pdf", &hex('a'), 10)
        .document("B.pdf", &hex('b'), 10)
        .receipt("Report_receipt.json", &format!(r#"{{"targetHash": "{}"}}"#, hex('b').to_uppercase()))
        .run(&ProofConfig::default());

    let proof = &outcome.aggregates.proofs[0];
    assert_eq!(proof.slug, "report_v2-0");
    assert_eq!(proof.record.document.filename, "stamped/Report_v2/B.pdf");
    assert_eq!(proof.record.document.version, "v2-0");
    assert_eq!(outcome.decisions[0].method, Some(MatchMethod::Hash));
}

#[test]
fn anchored_receipt_fields() {
    let body = r#"{
        "id": "p-9",
        "targetHash": "ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff",
        "anchors": [
            {"type": "ethereum", "txId": "EEE", "blockHeight": 1},
            {"type": "BTC", "txId": "ABCDEF", "blockHeight": "800000", "confirmedAt": 1700000000000},
            {"type": "bitcoin", "txId": "later", "blockHeight": 2}
        ],
        "receiptUrl": "https://example.org/r/p-9"
    }"#;
    let outcome = Builder::new()
        .group("Charter")
        .document("Charter_v3.1.pdf", &hex('c'), 10)
        .receipt("Charter_v3.1_receipt.json", body)
        .run(&ProofConfig::default());

    let record = &outcome.aggregates.proofs[0].record;
    assert_eq!(record.composite_slug(), "charter_v3-1");
    assert_eq!(record.anchoring.txid.as_deref(), Some("abcdef"));
    assert_eq!(record.anchoring.block_height, Some(800_000));
    assert_eq!(record.anchoring.block_time_utc.as_deref(), Some("2023-11-14T22:13:20Z"));
    assert_eq!(record.attestation.link.as_deref(), Some("https://example.org/r/p-9"));
    // Declared hash differs from content: computed value wins, warning raised.
    assert_eq!(record.document.sha256, hex('c'));
    assert!(outcome
        .diagnostics
        .iter()
        .any(|d| d.kind == DiagnosticKind::HashMismatch));
}

#[test]
fn footer_text_receipt() {
    let text = format!(
        "Sealed document\nHash: {}\nTx: {}\nProof 123e4567-e89b-42d3-a456-426614174000 at 2024-05-01T08:30:00Z\n",
        hex('d'),
        hex('e')
    );
    let outcome = Builder::new()
        .group("Memo")
        .document("Memo.pdf", &hex('d'), 10)
        .receipt("Memo.receipt.txt", &text)
        .run(&ProofConfig::default());

    let record = &outcome.aggregates.proofs[0].record;
    assert_eq!(record.anchoring.txid.as_deref(), Some(hex('e').as_str()));
    assert_eq!(record.attestation.proof_id.as_deref(), Some("123e4567-e89b-42d3-a456-426614174000"));
    assert_eq!(record.dates.anchored_utc.as_deref(), Some("2024-05-01T08:30:00Z"));
    assert!(outcome.diagnostics.is_empty());
}

#[test]
fn extra_receipt_keys_from_config() {
    let config = ProofConfig::from_toml(
        r#"
[receipt.extra_keys]
proof_id = ["uuid"]
"#,
    )
    .unwrap();
    let outcome = Builder::new()
        .group("Report")
        .document("Report.pdf", &hex('a'), 10)
        .receipt("Report.json", r#"{"uuid": "u-1"}"#)
        .run(&config);
    assert_eq!(
        outcome.aggregates.proofs[0].record.attestation.proof_id.as_deref(),
        Some("u-1")
    );
}

#[test]
fn authorship_and_network_come_from_config() {
    let config = ProofConfig::from_toml(
        r#"
anchor_network = "bitcoin-testnet"
[authorship]
author = "Jo Doe"
license = "CC-BY-4.0"
"#,
    )
    .unwrap();
    let outcome = Builder::new()
        .group("Report")
        .document("Report.pdf", &hex('a'), 10)
        .receipt("Report.json", "{}")
        .run(&config);
    let record = &outcome.aggregates.proofs[0].record;
    assert_eq!(record.anchoring.anchor_network, "bitcoin-testnet");
    assert_eq!(record.authorship.author, "Jo Doe");
    assert_eq!(record.authorship.license, "CC-BY-4.0");
    assert_eq!(record.authorship.copyright, "");
}

// -------------------------------------------------------------------------
// Multi-group runs
// -------------------------------------------------------------------------

#[test]
fn aggregates_sorted_across_groups() {
    let outcome = Builder::new()
        .group("Zeta")
        .document("Zeta.pdf", &hex('1'), 1)
        .receipt("Zeta.json", "{}")
        .group("Alpha v2")
        .document("Alpha.pdf", &hex('2'), 1)
        .receipt("Alpha.json", "{}")
        .group("Empty")
        .run(&ProofConfig::default());

    let slugs: Vec<_> = outcome.aggregates.mapping.iter().map(|r| r.slug.as_str()).collect();
    assert_eq!(slugs, vec!["alpha_v2-0", "zeta_v1-0"]);
    assert_eq!(outcome.summary.groups_total, 3);
    assert_eq!(outcome.summary.groups_skipped, 1);
    assert_eq!(outcome.summary.records, 2);
}

#[test]
fn unhashable_document_does_not_block_the_group() {
    let mut builder = Builder::new()
        .group("G")
        .document("G.pdf", &hex('a'), 1)
        .document("Gone.pdf", &hex('b'), 1)
        .receipt("G.json", "{}")
        .receipt("Gone.json", "{}");
    builder.hasher.0.remove(Path::new("stamped/G/Gone.pdf"));

    let outcome = builder.run(&ProofConfig::default());
    assert_eq!(outcome.summary.file_errors, 1);
    assert_eq!(outcome.summary.matched, 1);
    let gone = outcome.decisions.iter().find(|d| d.receipt == "Gone.json").unwrap();
    assert_eq!(gone.state, DecisionState::Unmatched);
}

#[test]
fn same_slug_different_groups_last_write_wins() {
    let outcome = Builder::new()
        .group("Policy")
        .document("Policy.pdf", &hex('a'), 1)
        .receipt("Policy.json", "{}")
        .group("Policy v1.0")
        .document("Policy.pdf", &hex('b'), 1)
        .receipt("Policy.json", "{}")
        .run(&ProofConfig::default());

    assert_eq!(outcome.aggregates.proofs.len(), 1);
    assert_eq!(outcome.aggregates.proofs[0].group, "Policy v1.0");
    assert_eq!(outcome.summary.duplicate_slugs, 1);
    assert_eq!(outcome.summary.matched, 2);
    assert_eq!(outcome.summary.superseded, 1);
    assert_eq!(outcome.decisions[0].state, DecisionState::Superseded);
    assert_eq!(outcome.decisions[1].state, DecisionState::Matched);
}
