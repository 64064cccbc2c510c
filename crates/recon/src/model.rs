use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::config::Authorship;
use crate::error::Diagnostic;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A candidate document discovered in a group. The content hash is not part
/// of the scan result: it is always computed by the candidate index.
#[derive(Debug, Clone)]
pub struct DocumentFile {
    pub path: PathBuf,
    /// File name including extension.
    pub name: String,
    /// Path relative to the run root, forward slashes.
    pub rel_path: String,
    pub size_bytes: u64,
    pub mimetype: String,
    pub modified: SystemTime,
}

/// A receipt file as read from disk, not yet parsed.
#[derive(Debug, Clone)]
pub struct ReceiptSource {
    pub path: PathBuf,
    pub name: String,
    pub body: String,
}

/// Attestation or screenshot carried next to a proof record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnexFile {
    pub path: PathBuf,
    pub name: String,
}

/// Everything discovered in one group directory.
#[derive(Debug, Clone, Default)]
pub struct GroupInput {
    pub label: String,
    pub documents: Vec<DocumentFile>,
    pub receipts: Vec<ReceiptSource>,
    pub attestations: Vec<AnnexFile>,
    pub screenshots: Vec<AnnexFile>,
}

// ---------------------------------------------------------------------------
// Normalized receipt
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Anchor {
    /// Type tag, lower-cased.
    pub kind: String,
    pub txid: Option<String>,
    pub block_height: Option<u64>,
    /// Normalized `YYYY-MM-DDTHH:MM:SSZ`, `None` when absent or unparseable.
    pub time_utc: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Receipt {
    /// Source file name; drives name-first matching.
    pub source_name: String,
    pub proof_id: Option<String>,
    /// Declared target hash, lower-cased. Advisory only.
    pub target_hash: Option<String>,
    pub anchors: Vec<Anchor>,
    pub txid: Option<String>,
    pub block_height: Option<u64>,
    pub anchored_utc: Option<String>,
    pub link: Option<String>,
}

impl Receipt {
    /// The declared target hash, if it is well-formed enough to be trusted.
    pub fn trusted_target(&self) -> Option<&str> {
        self.target_hash.as_deref().filter(|h| is_hex64(h))
    }
}

/// `^[a-f0-9]{64}$` on an already lower-cased value.
pub fn is_hex64(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// A document whose content hash has been computed for this run.
#[derive(Debug, Clone)]
pub struct HashedDocument {
    pub file: DocumentFile,
    pub sha256: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchMethod {
    Name,
    Hash,
    TieBreak,
    /// Only document and only receipt of the group, paired without evidence.
    SolePair,
    Unmatched,
}

impl std::fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Name => write!(f, "name"),
            Self::Hash => write!(f, "hash"),
            Self::TieBreak => write!(f, "tie-break"),
            Self::SolePair => write!(f, "sole-pair"),
            Self::Unmatched => write!(f, "unmatched"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MatchResult<'a> {
    pub receipt: &'a Receipt,
    pub document: Option<&'a HashedDocument>,
    pub method: MatchMethod,
}

// ---------------------------------------------------------------------------
// Proof record
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofRecord {
    pub schema_version: String,
    pub document: DocumentBlock,
    pub authorship: Authorship,
    pub anchoring: AnchoringBlock,
    pub attestation: AttestationBlock,
    pub dates: DatesBlock,
    pub notes: String,
}

impl ProofRecord {
    /// `<base-slug>_<version>`, the identity of this record in every output.
    pub fn composite_slug(&self) -> String {
        format!("{}_{}", self.document.slug, self.document.version)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentBlock {
    pub title: String,
    pub slug: String,
    pub version: String,
    pub filename: String,
    pub mimetype: String,
    pub size_bytes: u64,
    pub sha256: String,
    pub canonical_uri: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchoringBlock {
    pub anchor_network: String,
    pub txid: Option<String>,
    pub block_height: Option<u64>,
    pub block_time_utc: Option<String>,
    pub op_return: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationBlock {
    pub proof_id: Option<String>,
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatesBlock {
    pub created_utc: Option<String>,
    pub anchored_utc: Option<String>,
    pub published_utc: Option<String>,
}

/// Input files a proof record was built from; drives the output plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofSources {
    pub document: PathBuf,
    pub receipt: PathBuf,
    pub receipt_name: String,
    pub attestation: Option<AnnexFile>,
    pub screenshot: Option<AnnexFile>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledProof {
    pub slug: String,
    pub group: String,
    pub record: ProofRecord,
    pub sources: ProofSources,
}

// ---------------------------------------------------------------------------
// Aggregate rows
// ---------------------------------------------------------------------------

/// One row of `mapping.csv`. Missing values are empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRow {
    pub slug: String,
    pub filename: String,
    pub sha256: String,
    pub bitcoin_txid: String,
    pub woleet_proof_id: String,
    pub anchored_utc: String,
    pub canonical_uri: String,
    pub title: String,
    pub version: String,
    pub mimetype: String,
    pub size_bytes: u64,
}

/// One line of `index.jsonl`: the mapping row minus descriptive columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexLine {
    pub slug: String,
    pub filename: String,
    pub sha256: String,
    pub bitcoin_txid: String,
    pub woleet_proof_id: String,
    pub anchored_utc: String,
}

impl MappingRow {
    pub fn from_proof(proof: &AssembledProof) -> Self {
        let r = &proof.record;
        Self {
            slug: proof.slug.clone(),
            filename: r.document.filename.clone(),
            sha256: r.document.sha256.clone(),
            bitcoin_txid: r.anchoring.txid.clone().unwrap_or_default(),
            woleet_proof_id: r.attestation.proof_id.clone().unwrap_or_default(),
            anchored_utc: r.dates.anchored_utc.clone().unwrap_or_default(),
            canonical_uri: r.document.canonical_uri.clone().unwrap_or_default(),
            title: r.document.title.clone(),
            version: r.document.version.clone(),
            mimetype: r.document.mimetype.clone(),
            size_bytes: r.document.size_bytes,
        }
    }
}

impl IndexLine {
    pub fn from_proof(proof: &AssembledProof) -> Self {
        let r = &proof.record;
        Self {
            slug: proof.slug.clone(),
            filename: r.document.filename.clone(),
            sha256: r.document.sha256.clone(),
            bitcoin_txid: r.anchoring.txid.clone().unwrap_or_default(),
            woleet_proof_id: r.attestation.proof_id.clone().unwrap_or_default(),
            anchored_utc: r.dates.anchored_utc.clone().unwrap_or_default(),
        }
    }
}

/// Finalized run-wide outputs, sorted by composite slug.
#[derive(Debug, Clone, Default)]
pub struct Aggregates {
    pub proofs: Vec<AssembledProof>,
    pub mapping: Vec<MappingRow>,
    pub index: Vec<IndexLine>,
}

// ---------------------------------------------------------------------------
// Decision log + Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionState {
    Matched,
    Unmatched,
    /// Receipt could not be read; never reached the matcher.
    Skipped,
    /// Matched, but the record lost its slug to another under the
    /// duplicate-slug policy and is absent from the aggregates.
    Superseded,
}

/// One line of the per-receipt decision trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub group: String,
    pub receipt: String,
    pub state: DecisionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<MatchMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.state {
            DecisionState::Matched | DecisionState::Superseded => {
                write!(
                    f,
                    "[{}] {} -> {} ({}) => {}",
                    self.group,
                    self.receipt,
                    self.document.as_deref().unwrap_or("?"),
                    self.method.map(|m| m.to_string()).unwrap_or_default(),
                    self.slug.as_deref().unwrap_or("?"),
                )?;
                if self.state == DecisionState::Superseded {
                    write!(f, " (superseded)")?;
                }
                Ok(())
            }
            DecisionState::Unmatched => write!(f, "[{}] {} -> unmatched", self.group, self.receipt),
            DecisionState::Skipped => write!(f, "[{}] {} -> skipped", self.group, self.receipt),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub groups_total: usize,
    pub groups_skipped: usize,
    pub receipts_total: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub unreadable: usize,
    /// Matched receipts whose record was dropped by the duplicate-slug policy.
    pub superseded: usize,
    pub hash_mismatches: usize,
    pub duplicate_slugs: usize,
    pub file_errors: usize,
    /// Records left in the aggregates after duplicate-slug resolution.
    pub records: usize,
    pub method_counts: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub engine_version: String,
    pub run_at: String,
}

/// Everything a run produced, before any filesystem output.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub meta: RunMeta,
    pub summary: RunSummary,
    pub decisions: Vec<Decision>,
    pub diagnostics: Vec<Diagnostic>,
    pub aggregates: Aggregates,
}

/// Serializable view of a [`RunOutcome`] for `--json` output.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport<'a> {
    pub meta: &'a RunMeta,
    pub summary: &'a RunSummary,
    pub decisions: &'a [Decision],
    pub diagnostics: &'a [Diagnostic],
    pub records: Vec<&'a ProofRecord>,
}

impl RunOutcome {
    pub fn report(&self) -> RunReport<'_> {
        RunReport {
            meta: &self.meta,
            summary: &self.summary,
            decisions: &self.decisions,
            diagnostics: &self.diagnostics,
            records: self.aggregates.proofs.iter().map(|p| &p.record).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex64_requires_lowercase_and_length() {
        let h = "a".repeat(64);
        assert!(is_hex64(&h));
        assert!(!is_hex64(&"A".repeat(64)));
        assert!(!is_hex64(&"a".repeat(63)));
        assert!(!is_hex64(&format!("{}g", "a".repeat(63))));
    }

    #[test]
    fn trusted_target_filters_malformed() {
        let mut receipt = Receipt {
            source_name: "r.json".into(),
            proof_id: None,
            target_hash: Some("deadbeef".into()),
            anchors: vec![],
            txid: None,
            block_height: None,
            anchored_utc: None,
            link: None,
        };
        assert_eq!(receipt.trusted_target(), None);
        receipt.target_hash = Some("0".repeat(64));
        assert_eq!(receipt.trusted_target(), Some("0".repeat(64).as_str()));
    }

    #[test]
    fn decision_display() {
        let d = Decision {
            group: "Report".into(),
            receipt: "Report_receipt.json".into(),
            state: DecisionState::Matched,
            method: Some(MatchMethod::TieBreak),
            document: Some("Report.pdf".into()),
            slug: Some("report_v1-0".into()),
        };
        assert_eq!(
            d.to_string(),
            "[Report] Report_receipt.json -> Report.pdf (tie-break) => report_v1-0"
        );
    }
}
