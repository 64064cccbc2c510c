//! Output plan: a finished run becomes an ordered list of filesystem actions,
//! which are then applied or, in dry mode, only logged.
//!
//! Order: per slug (slug order) the directory, `proof.json`,
//! `checksums.txt`, then annexes; then pruning; then `mapping.csv` and
//! `index.jsonl` last, so aggregates are written exactly once per run.

use std::fs;
use std::path::{Path, PathBuf};

use proofrec_recon::config::AnnexMode;
use proofrec_recon::model::{AssembledProof, RunOutcome};
use proofrec_recon::{Diagnostic, DiagnosticKind};

use crate::aggregates::{
    list_slug_dirs, render_checksums, render_index_jsonl, render_mapping_csv, render_proof_json,
};
use crate::error::FsError;
use crate::layout::{relative_path, Layout};
use crate::{CHECKSUMS_FILE, INDEX_FILE, MAPPING_FILE, PROOF_FILE};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    CreateDir(PathBuf),
    WriteFile { path: PathBuf, contents: Vec<u8> },
    /// Annex copy or link, carried under the slug it belongs to.
    Annex { slug: String, from: PathBuf, to: PathBuf, mode: AnnexMode },
    /// Stale slug directory left by an earlier run.
    RemoveDir(PathBuf),
}

impl Action {
    pub fn describe(&self) -> String {
        match self {
            Self::CreateDir(p) => format!("mkdir {}", p.display()),
            Self::WriteFile { path, contents } => format!("write {} ({} bytes)", path.display(), contents.len()),
            Self::Annex { from, to, mode, .. } => format!("{mode} {} -> {}", from.display(), to.display()),
            Self::RemoveDir(p) => format!("remove {}", p.display()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlanOptions {
    pub annex_mode: AnnexMode,
    pub prune: bool,
}

/// Build the action list for a finished run. Reads the output directory only
/// when pruning; never writes.
pub fn plan_outputs(
    outcome: &RunOutcome,
    layout: &Layout,
    options: PlanOptions,
) -> Result<Vec<Action>, FsError> {
    let mut actions = Vec::new();
    let render = |path: &Path, r: Result<Vec<u8>, String>| r.map_err(|e| FsError::write(path, e));

    for proof in &outcome.aggregates.proofs {
        plan_slug(proof, layout, options.annex_mode, &mut actions, &render)?;
    }

    if options.prune {
        let keep: std::collections::BTreeSet<&str> =
            outcome.aggregates.proofs.iter().map(|p| p.slug.as_str()).collect();
        for stale in list_slug_dirs(&layout.by_doc())? {
            if !keep.contains(stale.as_str()) {
                actions.push(Action::RemoveDir(layout.slug_dir(&stale)));
            }
        }
    }

    actions.push(Action::CreateDir(layout.output.clone()));
    let mapping = layout.mapping_path();
    actions.push(Action::WriteFile {
        contents: render(&mapping, render_mapping_csv(&outcome.aggregates.mapping))?,
        path: mapping,
    });
    let index = layout.index_path();
    actions.push(Action::WriteFile {
        contents: render(&index, render_index_jsonl(&outcome.aggregates.index))?,
        path: index,
    });
    Ok(actions)
}

fn plan_slug(
    proof: &AssembledProof,
    layout: &Layout,
    mode: AnnexMode,
    actions: &mut Vec<Action>,
    render: &dyn Fn(&Path, Result<Vec<u8>, String>) -> Result<Vec<u8>, FsError>,
) -> Result<(), FsError> {
    let dir = layout.slug_dir(&proof.slug);
    actions.push(Action::CreateDir(dir.clone()));

    let proof_path = dir.join(PROOF_FILE);
    actions.push(Action::WriteFile {
        contents: render(&proof_path, render_proof_json(&proof.record))?,
        path: proof_path,
    });
    actions.push(Action::WriteFile {
        path: dir.join(CHECKSUMS_FILE),
        contents: render_checksums(&proof.record.document.sha256, &proof.record.document.filename)
            .into_bytes(),
    });

    let sources = &proof.sources;
    let mut annex = |from: &Path, name: String| {
        actions.push(Action::Annex {
            slug: proof.slug.clone(),
            from: from.to_path_buf(),
            to: dir.join(name),
            mode,
        });
    };
    annex(&sources.receipt, with_extension("receipt", &sources.receipt_name));
    if let Some(att) = &sources.attestation {
        annex(&att.path, with_extension("attestation", &att.name));
    }
    if let Some(shot) = &sources.screenshot {
        annex(&shot.path, shot.name.clone());
    }
    Ok(())
}

/// `receipt` + `.json` for `Report_receipt.JSON`.
fn with_extension(stem: &str, source_name: &str) -> String {
    match source_name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => format!("{stem}.{}", ext.to_ascii_lowercase()),
        _ => stem.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Apply
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct ApplyReport {
    pub applied: usize,
    /// Annex copies or links that failed; the rest of the slug is intact.
    pub diagnostics: Vec<Diagnostic>,
}

/// Execute the plan, or log it when `dry` is set. Failing to write a proof,
/// checksum or aggregate file stops the run; an annex failure is reported and
/// skipped.
pub fn apply(actions: &[Action], dry: bool) -> Result<ApplyReport, FsError> {
    let mut report = ApplyReport::default();
    for action in actions {
        if dry {
            log::info!("[dry-run] {}", action.describe());
            continue;
        }
        log::debug!("{}", action.describe());
        match action {
            Action::CreateDir(p) => fs::create_dir_all(p).map_err(|e| FsError::write(p, e))?,
            Action::WriteFile { path, contents } => {
                fs::write(path, contents).map_err(|e| FsError::write(path, e))?
            }
            Action::RemoveDir(p) => fs::remove_dir_all(p).map_err(|e| FsError::write(p, e))?,
            Action::Annex { slug, from, to, mode } => {
                if let Err(e) = place_annex(from, to, *mode) {
                    let diag = Diagnostic::warning(
                        DiagnosticKind::FileIo,
                        "",
                        slug,
                        format!("{} -> {}: {e}", from.display(), to.display()),
                    );
                    diag.emit();
                    report.diagnostics.push(diag);
                    continue;
                }
            }
        }
        report.applied += 1;
    }
    Ok(report)
}

/// Copy or link `from` to `to`, replacing whatever is at `to`.
fn place_annex(from: &Path, to: &Path, mode: AnnexMode) -> std::io::Result<()> {
    if fs::symlink_metadata(to).is_ok() {
        fs::remove_file(to)?;
    }
    match mode {
        AnnexMode::Copy => fs::copy(from, to).map(|_| ()),
        AnnexMode::Link => link(from, to),
    }
}

#[cfg(unix)]
fn link(from: &Path, to: &Path) -> std::io::Result<()> {
    let base = to.parent().unwrap_or_else(|| Path::new("."));
    std::os::unix::fs::symlink(relative_path(from, base), to)
}

#[cfg(not(unix))]
fn link(from: &Path, to: &Path) -> std::io::Result<()> {
    log::warn!("symbolic links unsupported here; copying {}", from.display());
    fs::copy(from, to).map(|_| ())
}

/// Output files a plan would write, for summaries.
pub fn written_files(actions: &[Action]) -> impl Iterator<Item = &Path> {
    actions.iter().filter_map(|a| match a {
        Action::WriteFile { path, .. } => Some(path.as_path()),
        Action::Annex { to, .. } => Some(to.as_path()),
        _ => None,
    })
}

/// True for the run-wide aggregate files.
pub fn is_aggregate(path: &Path) -> bool {
    matches!(
        path.file_name().and_then(|n| n.to_str()),
        Some(MAPPING_FILE) | Some(INDEX_FILE)
    )
}
