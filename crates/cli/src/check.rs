// proofrec check - read back outputs and re-verify document hashes

use std::path::PathBuf;

use proofrec_io::check::check_outputs;
use proofrec_io::{Layout, Sha256Hasher};

use crate::exit_codes::EXIT_CHECK_INCONSISTENT;
use crate::{load_config, CliError};

pub fn cmd_check(root: PathBuf, config: Option<PathBuf>, json: bool) -> Result<(), CliError> {
    let config = load_config(&root, config.as_deref())?;
    let layout = Layout::new(&root, &config);

    let report = check_outputs(&layout, &Sha256Hasher)
        .map_err(|e| CliError::fs(e).with_hint("run `proofrec import` first"))?;

    if json {
        let json_str = serde_json::to_string_pretty(&report)
            .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    }

    for issue in &report.issues {
        log::warn!("{}: {}", issue.slug, issue.message);
    }
    eprintln!(
        "{} slug dirs, {} mapping rows, {} index lines; {} documents verified",
        report.slug_dirs, report.mapping_rows, report.index_lines, report.documents_verified,
    );

    if !report.is_consistent() {
        return Err(CliError::new(
            EXIT_CHECK_INCONSISTENT,
            format!("{} inconsistencies found", report.issues.len()),
        ));
    }
    eprintln!("ok");
    Ok(())
}
