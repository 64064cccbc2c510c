// proofrec - reconcile documents with timestamp-anchoring receipts

mod check;
mod exit_codes;
mod import;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use proofrec_recon::ProofConfig;

use exit_codes::{recon_exit_code, EXIT_ERROR, EXIT_INVALID_CONFIG, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "proofrec")]
#[command(about = "Pair documents with timestamp receipts and emit hash-verified proof records")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Match receipts to documents and write proof records
    #[command(after_help = "\
Examples:
  proofrec import
  proofrec import --root ./archive --dry-run --verbose
  proofrec import --symlink --prune
  proofrec import --json > run.json")]
    Import {
        /// Root directory holding the input and output directories
        #[arg(long, default_value = ".", env = "PROOFREC_ROOT")]
        root: PathBuf,

        /// Config file (default: <root>/proofrec.toml when present)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Link annexes with relative symbolic links instead of copying
        #[arg(long)]
        symlink: bool,

        /// Log every planned action without touching the filesystem
        #[arg(long)]
        dry_run: bool,

        /// Per-receipt decision trace and per-action logging
        #[arg(long, short = 'v')]
        verbose: bool,

        /// Remove slug directories not produced by this run
        #[arg(long)]
        prune: bool,

        /// Print the run report as JSON to stdout
        #[arg(long)]
        json: bool,
    },

    /// Verify existing outputs: slug sets agree and documents still hash the same
    #[command(after_help = "\
Examples:
  proofrec check
  proofrec check --root ./archive --json")]
    Check {
        /// Root directory holding the input and output directories
        #[arg(long, default_value = ".", env = "PROOFREC_ROOT")]
        root: PathBuf,

        /// Config file (default: <root>/proofrec.toml when present)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print the check report as JSON to stdout
        #[arg(long)]
        json: bool,

        /// Debug logging
        #[arg(long, short = 'v')]
        verbose: bool,
    },

    /// Parse and validate a config file without running
    #[command(after_help = "\
Examples:
  proofrec validate proofrec.toml")]
    Validate {
        /// Path to the config file
        config: PathBuf,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  proofrec-recon ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
    )
}

/// `info` by default, `debug` with `--verbose`; `RUST_LOG` overrides both.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Import {
            root,
            config,
            symlink,
            dry_run,
            verbose,
            prune,
            json,
        } => {
            init_logging(verbose);
            import::cmd_import(import::ImportArgs {
                root,
                config,
                symlink,
                dry_run,
                prune,
                json,
            })
        }
        Commands::Check {
            root,
            config,
            json,
            verbose,
        } => {
            init_logging(verbose);
            check::cmd_check(root, config, json)
        }
        Commands::Validate { config } => {
            init_logging(false);
            cmd_validate(config)
        }
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn args(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn general(msg: impl Into<String>) -> Self {
        Self::new(EXIT_ERROR, msg)
    }

    /// Create error from an engine error with the matching exit code.
    pub fn recon(err: proofrec_recon::ReconError) -> Self {
        let code = recon_exit_code(&err);
        let hint = match &err {
            proofrec_recon::ReconError::MissingRoot(_) => {
                Some("expected <root>/<input_dir>/<group>/; pass --root or set input_dir".to_string())
            }
            proofrec_recon::ReconError::DuplicateSlug { .. } => {
                Some("rename one group or set duplicate_slugs = \"last_write_wins\"".to_string())
            }
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }

    /// Create error from an output error with the matching exit code.
    pub fn fs(err: proofrec_io::FsError) -> Self {
        Self::new(exit_codes::fs_exit_code(&err), err.to_string())
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

// ============================================================================
// config
// ============================================================================

/// Load the config: explicit `--config`, else `<root>/proofrec.toml`, else
/// defaults.
pub fn load_config(root: &Path, explicit: Option<&Path>) -> Result<ProofConfig, CliError> {
    let path = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => proofrec_io::layout::default_config_path(root),
    };
    let Some(path) = path else {
        log::debug!("no config file; using defaults");
        return Ok(ProofConfig::default());
    };

    let text = std::fs::read_to_string(&path)
        .map_err(|e| CliError::args(format!("cannot read config {}: {e}", path.display())))?;
    log::debug!("config: {}", path.display());
    ProofConfig::from_toml(&text).map_err(|e| {
        CliError::new(EXIT_INVALID_CONFIG, format!("{}: {e}", path.display()))
    })
}

// ============================================================================
// validate
// ============================================================================

fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(Path::new("."), Some(&config_path))?;
    eprintln!(
        "valid: {} -> {} (version default {}, duplicates {}, annexes {}, classify {:?})",
        config.input_dir,
        config.output_dir,
        config.default_version,
        config.duplicate_slugs,
        config.annex_mode,
        config.classify.strategy,
    );
    Ok(())
}
