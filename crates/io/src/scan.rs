// Directory scan: one group per sub-directory of the input directory

use std::fs;
use std::path::Path;

use proofrec_recon::classify::{AnnexClassifier, FileRole};
use proofrec_recon::model::{AnnexFile, DocumentFile, GroupInput, ReceiptSource};
use proofrec_recon::{Diagnostic, DiagnosticKind, ReconError};

use crate::layout::Layout;
use crate::mime;

/// Result of scanning the input directory.
#[derive(Debug, Default)]
pub struct ScanResult {
    pub groups: Vec<GroupInput>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Walk `<root>/<input_dir>/<group>/` and classify each file.
///
/// A missing or unreadable input directory is fatal. Everything else is a
/// per-file diagnostic. Groups come back sorted by lower-cased label, files by
/// name, so a run does not depend on directory iteration order.
pub fn scan_groups(layout: &Layout, classifier: &dyn AnnexClassifier) -> Result<ScanResult, ReconError> {
    let entries = fs::read_dir(&layout.input)
        .map_err(|e| ReconError::MissingRoot(format!("{}: {e}", layout.input.display())))?;

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ReconError::MissingRoot(format!("{}: {e}", layout.input.display())))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        if entry.path().is_dir() {
            dirs.push((name, entry.path()));
        } else {
            log::debug!("ignoring top-level file {name}");
        }
    }
    dirs.sort_by(|a, b| a.0.to_lowercase().cmp(&b.0.to_lowercase()).then_with(|| a.0.cmp(&b.0)));

    let mut result = ScanResult::default();
    for (label, path) in dirs {
        let group = scan_group(layout, &label, &path, classifier, &mut result.diagnostics);
        log::debug!(
            "[{label}] scanned: {} documents, {} receipts, {} attestations, {} screenshots",
            group.documents.len(),
            group.receipts.len(),
            group.attestations.len(),
            group.screenshots.len()
        );
        result.groups.push(group);
    }
    Ok(result)
}

fn scan_group(
    layout: &Layout,
    label: &str,
    dir: &Path,
    classifier: &dyn AnnexClassifier,
    diagnostics: &mut Vec<Diagnostic>,
) -> GroupInput {
    let mut group = GroupInput {
        label: label.to_string(),
        ..GroupInput::default()
    };

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            diagnostics.push(file_io(label, label, format!("cannot list {}: {e}", dir.display())));
            return group;
        }
    };

    let mut files: Vec<_> = entries
        .filter_map(|e| e.ok())
        .map(|e| (e.file_name().to_string_lossy().into_owned(), e.path()))
        .filter(|(_, p)| p.is_file())
        .collect();
    files.sort();

    for (name, path) in files {
        match classifier.classify(&name) {
            FileRole::Document => match fs::metadata(&path) {
                Ok(meta) => group.documents.push(DocumentFile {
                    rel_path: layout.rel(&path),
                    mimetype: mime::guess(&name).to_string(),
                    size_bytes: meta.len(),
                    modified: meta.modified().unwrap_or(std::time::UNIX_EPOCH),
                    name,
                    path,
                }),
                Err(e) => diagnostics.push(file_io(label, &name, format!("cannot stat: {e}"))),
            },
            FileRole::Receipt => match fs::read_to_string(&path) {
                Ok(body) => group.receipts.push(ReceiptSource { path, name, body }),
                Err(e) => diagnostics.push(Diagnostic::warning(
                    DiagnosticKind::UnreadableReceipt,
                    label,
                    &name,
                    format!("cannot read: {e}"),
                )),
            },
            FileRole::Attestation => group.attestations.push(AnnexFile { path, name }),
            FileRole::Screenshot => group.screenshots.push(AnnexFile { path, name }),
            FileRole::Ignored => log::debug!("[{label}] ignoring {name}"),
        }
    }
    group
}

fn file_io(group: &str, subject: &str, message: String) -> Diagnostic {
    Diagnostic::warning(DiagnosticKind::FileIo, group, subject, message)
}
