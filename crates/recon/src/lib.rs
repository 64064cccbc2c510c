//! `proofrec-recon`: receipt-to-document reconciliation engine.
//!
//! Pure engine crate: receives pre-scanned groups and a digest capability,
//! returns proof records, aggregates and diagnostics. No filesystem output.

pub mod assemble;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod footer;
pub mod index;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod summary;
pub mod version;

pub use assemble::Accumulator;
pub use classify::{classifier_for, AnnexClassifier, FileRole};
pub use config::ProofConfig;
pub use engine::run;
pub use error::{Diagnostic, DiagnosticKind, ReconError, Severity};
pub use index::ContentHasher;
pub use model::{GroupInput, ProofRecord, RunOutcome};
