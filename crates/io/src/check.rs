// Read-back consistency check of a finished output directory

use std::collections::BTreeSet;
use std::fs;
use std::io::BufReader;

use proofrec_recon::index::ContentHasher;
use serde::Serialize;

use crate::aggregates::{list_slug_dirs, read_index_jsonl, read_mapping_csv, read_proof_json};
use crate::error::FsError;
use crate::layout::Layout;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Slug present in one of mapping / index / directories but not another.
    SlugSetMismatch,
    /// `proof.json` missing or unreadable in a slug directory.
    MissingProof,
    /// Record fields disagree between mapping row and proof record.
    FieldMismatch,
    /// Referenced document could not be hashed.
    MissingDocument,
    /// Document content no longer hashes to the recorded value.
    HashChanged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckIssue {
    pub kind: IssueKind,
    pub slug: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckReport {
    pub mapping_rows: usize,
    pub index_lines: usize,
    pub slug_dirs: usize,
    pub documents_verified: usize,
    pub issues: Vec<CheckIssue>,
}

impl CheckReport {
    pub fn is_consistent(&self) -> bool {
        self.issues.is_empty()
    }

    fn issue(&mut self, kind: IssueKind, slug: &str, message: impl Into<String>) {
        self.issues.push(CheckIssue {
            kind,
            slug: slug.to_string(),
            message: message.into(),
        });
    }
}

/// Parse `mapping.csv`, `index.jsonl` and `by-doc/*/proof.json` back, compare
/// their slug sets, and re-hash every referenced document.
///
/// Missing or malformed aggregate files are errors; disagreements are issues.
pub fn check_outputs(layout: &Layout, hasher: &dyn ContentHasher) -> Result<CheckReport, FsError> {
    let mapping_path = layout.mapping_path();
    let mapping_file = fs::File::open(&mapping_path).map_err(|e| FsError::read(&mapping_path, e))?;
    let mapping = read_mapping_csv(mapping_file).map_err(|e| FsError::parse(&mapping_path, e))?;

    let index_path = layout.index_path();
    let index_file = fs::File::open(&index_path).map_err(|e| FsError::read(&index_path, e))?;
    let index = read_index_jsonl(BufReader::new(index_file)).map_err(|e| FsError::parse(&index_path, e))?;

    let dirs = list_slug_dirs(&layout.by_doc())?;

    let mut report = CheckReport {
        mapping_rows: mapping.len(),
        index_lines: index.len(),
        slug_dirs: dirs.len(),
        ..CheckReport::default()
    };

    let mapping_slugs: BTreeSet<&str> = mapping.iter().map(|r| r.slug.as_str()).collect();
    let index_slugs: BTreeSet<&str> = index.iter().map(|l| l.slug.as_str()).collect();
    let dir_slugs: BTreeSet<&str> = dirs.iter().map(String::as_str).collect();

    if mapping_slugs.len() != mapping.len() {
        report.issue(IssueKind::SlugSetMismatch, "", "mapping.csv has repeated slugs");
    }
    for (name, set) in [("index.jsonl", &index_slugs), ("by-doc/", &dir_slugs)] {
        for slug in mapping_slugs.difference(set) {
            report.issue(IssueKind::SlugSetMismatch, slug, format!("in mapping.csv but not in {name}"));
        }
        for slug in set.difference(&mapping_slugs) {
            report.issue(IssueKind::SlugSetMismatch, slug, format!("in {name} but not in mapping.csv"));
        }
    }

    for row in &mapping {
        if let Some(line) = index.iter().find(|l| l.slug == row.slug) {
            if line.sha256 != row.sha256 || line.filename != row.filename {
                report.issue(IssueKind::FieldMismatch, &row.slug, "index.jsonl disagrees with mapping.csv");
            }
        }

        if dir_slugs.contains(row.slug.as_str()) {
            match read_proof_json(&layout.proof_path(&row.slug)) {
                Ok(record) => {
                    if record.composite_slug() != row.slug {
                        report.issue(
                            IssueKind::FieldMismatch,
                            &row.slug,
                            format!("proof.json identifies as {}", record.composite_slug()),
                        );
                    }
                    if record.document.sha256 != row.sha256 {
                        report.issue(IssueKind::FieldMismatch, &row.slug, "proof.json sha256 differs from mapping.csv");
                    }
                }
                Err(e) => report.issue(IssueKind::MissingProof, &row.slug, e.to_string()),
            }
        }

        let doc = layout.resolve(&row.filename);
        match hasher.digest(&doc) {
            Ok(actual) if actual == row.sha256 => report.documents_verified += 1,
            Ok(actual) => report.issue(
                IssueKind::HashChanged,
                &row.slug,
                format!("{} now hashes to {actual}", row.filename),
            ),
            Err(e) => report.issue(IssueKind::MissingDocument, &row.slug, format!("{}: {e}", row.filename)),
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::Sha256Hasher;
    use crate::plan::{apply, plan_outputs, PlanOptions};
    use crate::scan::scan_groups;
    use proofrec_recon::classify::classifier_for;
    use proofrec_recon::{run, ProofConfig};
    use std::path::Path;
    use tempfile::tempdir;

    fn build(root: &Path) -> Layout {
        for (group, doc) in [("Report", "Report.pdf"), ("Memo_v2", "Memo.pdf")] {
            let g = root.join("stamped").join(group);
            fs::create_dir_all(&g).unwrap();
            fs::write(g.join(doc), format!("content of {doc}")).unwrap();
            fs::write(g.join(doc.replace(".pdf", "_receipt.json")), "{}").unwrap();
        }
        let config = ProofConfig::default();
        let layout = Layout::new(root, &config);
        let classifier = classifier_for(&config.classify);
        let scan = scan_groups(&layout, classifier.as_ref()).unwrap();
        let outcome = run(&config, &scan.groups, &Sha256Hasher).unwrap();
        apply(&plan_outputs(&outcome, &layout, PlanOptions::default()).unwrap(), false).unwrap();
        layout
    }

    #[test]
    fn fresh_output_is_consistent() {
        let dir = tempdir().unwrap();
        let layout = build(dir.path());
        let report = check_outputs(&layout, &Sha256Hasher).unwrap();
        assert!(report.is_consistent(), "{:?}", report.issues);
        assert_eq!(report.mapping_rows, 2);
        assert_eq!(report.index_lines, 2);
        assert_eq!(report.slug_dirs, 2);
        assert_eq!(report.documents_verified, 2);
    }

    #[test]
    fn edited_document_is_flagged() {
        let dir = tempdir().unwrap();
        let layout = build(dir.path());
        fs::write(dir.path().join("stamped/Report/Report.pdf"), "tampered").unwrap();
        let report = check_outputs(&layout, &Sha256Hasher).unwrap();
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].kind, IssueKind::HashChanged);
        assert_eq!(report.issues[0].slug, "report_v1-0");
    }

    #[test]
    fn stray_directory_is_flagged() {
        let dir = tempdir().unwrap();
        let layout = build(dir.path());
        fs::create_dir_all(layout.slug_dir("ghost_v1-0")).unwrap();
        let report = check_outputs(&layout, &Sha256Hasher).unwrap();
        assert_eq!(report.issues[0].kind, IssueKind::SlugSetMismatch);
        assert_eq!(report.issues[0].slug, "ghost_v1-0");
    }

    #[test]
    fn missing_mapping_is_an_error() {
        let dir = tempdir().unwrap();
        let layout = Layout::new(dir.path(), &ProofConfig::default());
        assert!(matches!(check_outputs(&layout, &Sha256Hasher), Err(FsError::Read { .. })));
    }
}
