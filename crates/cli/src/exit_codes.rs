//! CLI Exit Code Registry
//!
//! This is the single source of truth for all `proofrec` exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain     | Description                                 |
//! |---------|------------|---------------------------------------------|
//! | 0       | Universal  | Success                                     |
//! | 1       | Universal  | General error (unspecified)                 |
//! | 2       | Universal  | CLI usage error (bad args, missing file)    |
//! | 60-69   | proofs     | Import / check outcomes                     |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use proofrec_io::FsError;
use proofrec_recon::ReconError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Proofs (60-69)
// =============================================================================

/// Root input directory missing or unreadable. Nothing was written.
pub const EXIT_ROOT_MISSING: u8 = 60;

/// The run completed but produced zero proof records.
pub const EXIT_NO_RECORDS: u8 = 61;

/// Two groups resolved to the same slug under `duplicate_slugs = "reject"`.
/// Nothing was written.
pub const EXIT_DUPLICATE_SLUG: u8 = 62;

/// Config file failed to parse or validate.
pub const EXIT_INVALID_CONFIG: u8 = 63;

/// `check` found disagreements between outputs or changed documents.
pub const EXIT_CHECK_INCONSISTENT: u8 = 64;

/// A proof, checksum or aggregate file could not be written.
pub const EXIT_WRITE_FAILED: u8 = 65;

// =============================================================================
// Error mapping
// =============================================================================

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_INVALID_CONFIG,
        ReconError::MissingRoot(_) => EXIT_ROOT_MISSING,
        ReconError::DuplicateSlug { .. } => EXIT_DUPLICATE_SLUG,
        ReconError::Io(_) => EXIT_ERROR,
    }
}

/// Map an output error to its exit code.
pub fn fs_exit_code(err: &FsError) -> u8 {
    match err {
        FsError::Write { .. } => EXIT_WRITE_FAILED,
        FsError::Read { .. } | FsError::Parse { .. } => EXIT_ERROR,
    }
}
