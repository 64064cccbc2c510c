// proofrec import - scan, match, assemble, write

use std::path::PathBuf;

use proofrec_io::plan::{apply, plan_outputs, written_files, PlanOptions};
use proofrec_io::scan::scan_groups;
use proofrec_io::{Layout, Sha256Hasher};
use proofrec_recon::config::AnnexMode;
use proofrec_recon::engine::run_with_diagnostics;
use proofrec_recon::model::RunReport;
use proofrec_recon::{classifier_for, Diagnostic};
use serde::Serialize;

use crate::exit_codes::EXIT_NO_RECORDS;
use crate::{load_config, CliError};

pub struct ImportArgs {
    pub root: PathBuf,
    pub config: Option<PathBuf>,
    pub symlink: bool,
    pub dry_run: bool,
    pub prune: bool,
    pub json: bool,
}

/// `--json` document: the engine report plus what happened on disk.
#[derive(Serialize)]
struct ImportReport<'a> {
    dry_run: bool,
    #[serde(flatten)]
    run: RunReport<'a>,
    planned_actions: usize,
    applied_actions: usize,
    write_diagnostics: &'a [Diagnostic],
}

pub fn cmd_import(args: ImportArgs) -> Result<(), CliError> {
    let mut config = load_config(&args.root, args.config.as_deref())?;
    if args.symlink {
        config.annex_mode = AnnexMode::Link;
    }

    let layout = Layout::new(&args.root, &config);
    log::debug!("input: {}", layout.input.display());
    log::debug!("output: {}", layout.output.display());

    let classifier = classifier_for(&config.classify);
    let scan = scan_groups(&layout, classifier.as_ref()).map_err(CliError::recon)?;

    let outcome = run_with_diagnostics(&config, &scan.groups, &Sha256Hasher, scan.diagnostics)
        .map_err(CliError::recon)?;

    let options = PlanOptions {
        annex_mode: config.annex_mode,
        prune: args.prune,
    };
    let actions = plan_outputs(&outcome, &layout, options).map_err(CliError::fs)?;
    let applied = apply(&actions, args.dry_run).map_err(|e| {
        CliError::fs(e).with_hint("proof and aggregate files may be partially written; rerun import")
    })?;

    if args.json {
        let report = ImportReport {
            dry_run: args.dry_run,
            run: outcome.report(),
            planned_actions: actions.len(),
            applied_actions: applied.applied,
            write_diagnostics: &applied.diagnostics,
        };
        let json_str = serde_json::to_string_pretty(&report)
            .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    }

    // Human summary to stderr
    let s = &outcome.summary;
    eprintln!(
        "{} groups ({} skipped), {} receipts: {} matched, {} unmatched, {} unreadable",
        s.groups_total, s.groups_skipped, s.receipts_total, s.matched, s.unmatched, s.unreadable,
    );
    if s.hash_mismatches + s.duplicate_slugs + s.file_errors > 0 {
        eprintln!(
            "warnings: {} hash mismatches, {} duplicate slugs ({} records superseded), {} file errors",
            s.hash_mismatches, s.duplicate_slugs, s.superseded, s.file_errors,
        );
    }
    let files = written_files(&actions).count();
    if args.dry_run {
        eprintln!("[dry-run] {} records, {} files would be written to {}", s.records, files, layout.output.display());
    } else {
        eprintln!("wrote {} records ({} files) to {}", s.records, files, layout.output.display());
        if !applied.diagnostics.is_empty() {
            eprintln!("{} annexes could not be placed", applied.diagnostics.len());
        }
    }

    if s.records == 0 {
        return Err(CliError::new(EXIT_NO_RECORDS, "no proof records produced")
            .with_hint("each group needs a document and a receipt; run with --verbose to see decisions"));
    }
    Ok(())
}
