use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{Diagnostic, DiagnosticKind};
use crate::model::{DocumentFile, HashedDocument};

/// The `digest(file) -> hash` capability: lower-case 64-hex SHA-256 of a
/// file's bytes.
pub trait ContentHasher: Send + Sync {
    fn digest(&self, path: &Path) -> std::io::Result<String>;
}

/// File name without its last extension.
pub fn file_stem(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}

const BASE_SUFFIXES: [&str; 2] = ["attestation", "receipt"];

/// Lower-cased stem with one trailing `attestation`/`receipt` token (and the
/// `_` before it) removed, so `Report_receipt` and `Report` compare equal.
pub fn base_name(stem: &str) -> String {
    let lower = stem.to_lowercase();
    for suffix in BASE_SUFFIXES {
        if let Some(rest) = lower.strip_suffix(suffix) {
            return rest.strip_suffix('_').unwrap_or(rest).to_string();
        }
    }
    lower
}

/// Per-group lookup structures, built once before any receipt is matched.
#[derive(Debug, Default)]
pub struct CandidateIndex {
    docs: Vec<HashedDocument>,
    by_hash: BTreeMap<String, usize>,
    by_base: BTreeMap<String, Vec<usize>>,
}

impl CandidateIndex {
    /// Hash every document. A file that cannot be hashed is reported and left
    /// out of both indexes since no proof can be built for it.
    pub fn build(
        group: &str,
        documents: &[DocumentFile],
        hasher: &dyn ContentHasher,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Self {
        let mut sorted: Vec<&DocumentFile> = documents.iter().collect();
        sorted.sort_by(|a, b| a.name.cmp(&b.name));

        let mut index = Self::default();
        for file in sorted {
            let sha256 = match hasher.digest(&file.path) {
                Ok(h) => h.to_ascii_lowercase(),
                Err(e) => {
                    diagnostics.push(Diagnostic::warning(
                        DiagnosticKind::FileIo,
                        group,
                        &file.name,
                        format!("cannot hash {}: {e}", file.path.display()),
                    ));
                    continue;
                }
            };
            log::debug!("  {} sha256={}", file.name, &sha256[..sha256.len().min(12)]);

            let i = index.docs.len();
            // Identical content: keep the first name in sort order.
            index.by_hash.entry(sha256.clone()).or_insert(i);
            index
                .by_base
                .entry(base_name(file_stem(&file.name)))
                .or_default()
                .push(i);
            index.docs.push(HashedDocument {
                file: file.clone(),
                sha256,
            });
        }
        index
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn documents(&self) -> &[HashedDocument] {
        &self.docs
    }

    pub fn by_hash(&self, sha256: &str) -> Option<&HashedDocument> {
        self.by_hash.get(sha256).map(|&i| &self.docs[i])
    }

    pub fn by_base(&self, base: &str) -> Vec<&HashedDocument> {
        self.by_base
            .get(base)
            .map(|ids| ids.iter().map(|&i| &self.docs[i]).collect())
            .unwrap_or_default()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{doc, hash_of, TableHasher};
    use super::*;

    #[test]
    fn base_name_strips_one_suffix() {
        assert_eq!(base_name("Report_receipt"), "report");
        assert_eq!(base_name("Report_Attestation"), "report");
        assert_eq!(base_name("ReportReceipt"), "report");
        assert_eq!(base_name("Report"), "report");
        assert_eq!(base_name("receipt"), "");
        assert_eq!(base_name("Report_receipt_receipt"), "report_receipt");
    }

    #[test]
    fn file_stem_cases() {
        assert_eq!(file_stem("a.b.pdf"), "a.b");
        assert_eq!(file_stem("noext"), "noext");
        assert_eq!(file_stem(".hidden"), ".hidden");
    }

    #[test]
    fn build_indexes() {
        let docs = vec![doc("g", "B.pdf", 1), doc("g", "A.pdf", 2), doc("g", "a.PDF", 3)];
        let hasher = TableHasher::default()
            .with("g/A.pdf", &hash_of('a'))
            .with("g/B.pdf", &hash_of('b'))
            .with("g/a.PDF", &hash_of('c'));
        let mut diags = Vec::new();
        let index = CandidateIndex::build("g", &docs, &hasher, &mut diags);

        assert!(diags.is_empty());
        assert_eq!(index.len(), 3);
        assert_eq!(index.by_hash(&hash_of('b')).unwrap().file.name, "B.pdf");
        let names: Vec<_> = index.by_base("a").iter().map(|d| d.file.name.as_str()).collect();
        assert_eq!(names, vec!["A.pdf", "a.PDF"]);
        assert!(index.by_base("c").is_empty());
    }

    #[test]
    fn unhashable_file_is_reported_and_excluded() {
        let docs = vec![doc("g", "A.pdf", 1), doc("g", "Missing.pdf", 1)];
        let hasher = TableHasher::default().with("g/A.pdf", &hash_of('a'));
        let mut diags = Vec::new();
        let index = CandidateIndex::build("g", &docs, &hasher, &mut diags);

        assert_eq!(index.len(), 1);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::FileIo);
        assert_eq!(diags[0].subject, "Missing.pdf");
        assert!(index.by_base("missing").is_empty());
    }

    #[test]
    fn duplicate_content_keeps_first_name() {
        let docs = vec![doc("g", "Z.pdf", 1), doc("g", "Y.pdf", 1)];
        let hasher = TableHasher::default()
            .with("g/Z.pdf", &hash_of('d'))
            .with("g/Y.pdf", &hash_of('d'));
        let mut diags = Vec::new();
        let index = CandidateIndex::build("g", &docs, &hasher, &mut diags);
        assert_eq!(index.by_hash(&hash_of('d')).unwrap().file.name, "Y.pdf");
    }
}
