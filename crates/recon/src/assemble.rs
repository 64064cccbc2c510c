use std::collections::BTreeMap;

use crate::config::{DuplicateSlugPolicy, ProofConfig};
use crate::error::{Diagnostic, DiagnosticKind, ReconError};
use crate::index::file_stem;
use crate::model::{
    Aggregates, AnchoringBlock, AnnexFile, AssembledProof, AttestationBlock, DatesBlock,
    DocumentBlock, HashedDocument, IndexLine, MappingRow, ProofRecord, ProofSources, Receipt,
};
use crate::version::{composite_slug, ResolvedVersion};

/// Group-level context shared by every proof assembled from one group.
#[derive(Debug, Clone)]
pub struct GroupContext<'a> {
    pub label: &'a str,
    pub base_slug: &'a str,
    pub attestations: &'a [AnnexFile],
    pub screenshots: &'a [AnnexFile],
}

/// Build the proof record for a matched pair.
///
/// The document block always carries the freshly computed hash; a different
/// declared hash only produces a warning.
pub fn assemble(
    receipt: &Receipt,
    receipt_path: &std::path::Path,
    document: &HashedDocument,
    version: &ResolvedVersion,
    group: &GroupContext<'_>,
    config: &ProofConfig,
) -> (AssembledProof, Option<Diagnostic>) {
    let slug = composite_slug(group.base_slug, version);

    let mismatch = receipt
        .trusted_target()
        .filter(|declared| *declared != document.sha256)
        .map(|declared| {
            Diagnostic::warning(
                DiagnosticKind::HashMismatch,
                group.label,
                &document.file.name,
                format!(
                    "declared {} but content is {} (receipt {}); using computed hash",
                    short(declared),
                    short(&document.sha256),
                    receipt.source_name
                ),
            )
        });

    let record = ProofRecord {
        schema_version: config.schema_version.clone(),
        document: DocumentBlock {
            title: group.label.to_string(),
            slug: group.base_slug.to_string(),
            version: version.slug_part.clone(),
            filename: document.file.rel_path.clone(),
            mimetype: document.file.mimetype.clone(),
            size_bytes: document.file.size_bytes,
            sha256: document.sha256.clone(),
            canonical_uri: None,
        },
        authorship: config.authorship.clone(),
        anchoring: AnchoringBlock {
            anchor_network: config.anchor_network.clone(),
            txid: receipt.txid.clone(),
            block_height: receipt.block_height,
            block_time_utc: receipt.anchored_utc.clone(),
            op_return: None,
        },
        attestation: AttestationBlock {
            proof_id: receipt.proof_id.clone(),
            link: receipt.link.clone(),
        },
        dates: DatesBlock {
            created_utc: None,
            anchored_utc: receipt.anchored_utc.clone(),
            published_utc: None,
        },
        notes: format!(
            "imported from {}/; receipt = {}",
            config.input_dir, receipt.source_name
        ),
    };

    let proof = AssembledProof {
        slug,
        group: group.label.to_string(),
        record,
        sources: ProofSources {
            document: document.file.path.clone(),
            receipt: receipt_path.to_path_buf(),
            receipt_name: receipt.source_name.clone(),
            attestation: pick_attestation(&document.file.name, group.attestations),
            screenshot: group.screenshots.first().cloned(),
        },
    };

    (proof, mismatch)
}

/// Attestation whose name contains the document stem, else the first one.
pub fn pick_attestation(document_name: &str, attestations: &[AnnexFile]) -> Option<AnnexFile> {
    let stem = file_stem(document_name).to_lowercase();
    attestations
        .iter()
        .find(|a| a.name.to_lowercase().contains(&stem))
        .or_else(|| attestations.first())
        .cloned()
}

fn short(hash: &str) -> &str {
    &hash[..hash.len().min(12)]
}

// ---------------------------------------------------------------------------
// Accumulator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlugConflict {
    pub slug: String,
    pub first_group: String,
    pub second_group: String,
}

/// Run-wide mapping/index accumulator keyed by composite slug.
///
/// Threaded through group processing as a value; independently built
/// accumulators combine with [`Accumulator::merge`]. Output order is always
/// slug order, whatever order records were folded in.
#[derive(Debug, Clone)]
pub struct Accumulator {
    policy: DuplicateSlugPolicy,
    entries: BTreeMap<String, AssembledProof>,
    conflicts: Vec<SlugConflict>,
}

impl Accumulator {
    pub fn new(policy: DuplicateSlugPolicy) -> Self {
        Self {
            policy,
            entries: BTreeMap::new(),
            conflicts: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn conflicts(&self) -> &[SlugConflict] {
        &self.conflicts
    }

    /// Add one record. Returns a diagnostic when the slug was already taken.
    pub fn fold(&mut self, proof: AssembledProof) -> Option<Diagnostic> {
        let Some(existing) = self.entries.get(&proof.slug) else {
            self.entries.insert(proof.slug.clone(), proof);
            return None;
        };

        let conflict = SlugConflict {
            slug: proof.slug.clone(),
            first_group: existing.group.clone(),
            second_group: proof.group.clone(),
        };
        let first_file = existing.record.document.filename.clone();
        let second_file = proof.record.document.filename.clone();

        let diag = match self.policy {
            DuplicateSlugPolicy::LastWriteWins => {
                self.entries.insert(proof.slug.clone(), proof);
                Diagnostic::warning(
                    DiagnosticKind::DuplicateSlug,
                    &conflict.second_group,
                    &conflict.slug,
                    format!("{second_file} replaces {first_file} (last_write_wins)"),
                )
            }
            DuplicateSlugPolicy::FirstWriteWins => Diagnostic::warning(
                DiagnosticKind::DuplicateSlug,
                &conflict.second_group,
                &conflict.slug,
                format!("{second_file} dropped, keeping {first_file} (first_write_wins)"),
            ),
            DuplicateSlugPolicy::Reject => Diagnostic::error(
                DiagnosticKind::DuplicateSlug,
                &conflict.second_group,
                &conflict.slug,
                format!("{second_file} collides with {first_file} (reject)"),
            ),
        };
        self.conflicts.push(conflict);
        Some(diag)
    }

    /// Fold another accumulator's records in slug order, as if they came later.
    pub fn merge(&mut self, other: Accumulator) -> Vec<Diagnostic> {
        let mut diags = Vec::new();
        self.conflicts.extend(other.conflicts);
        for (_, proof) in other.entries {
            diags.extend(self.fold(proof));
        }
        diags
    }

    /// Freeze into sorted aggregates. Under `reject`, any conflict fails the run.
    pub fn finalize(self) -> Result<Aggregates, ReconError> {
        if self.policy == DuplicateSlugPolicy::Reject {
            if let Some(c) = self.conflicts.into_iter().next() {
                return Err(ReconError::DuplicateSlug {
                    slug: c.slug,
                    first: c.first_group,
                    second: c.second_group,
                });
            }
        }

        let proofs: Vec<AssembledProof> = self.entries.into_values().collect();
        let mapping = proofs.iter().map(MappingRow::from_proof).collect();
        let index = proofs.iter().map(IndexLine::from_proof).collect();
        Ok(Aggregates {
            proofs,
            mapping,
            index,
        })
    }
}
