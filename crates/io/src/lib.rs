// Filesystem collaborators for the reconciliation engine

pub mod aggregates;
pub mod check;
pub mod digest;
pub mod error;
pub mod layout;
pub mod mime;
pub mod plan;
pub mod scan;

pub use digest::Sha256Hasher;
pub use error::FsError;
pub use layout::Layout;

/// Per-slug proof record file name.
pub const PROOF_FILE: &str = "proof.json";
/// Per-slug checksum file name.
pub const CHECKSUMS_FILE: &str = "checksums.txt";
/// Run-wide mapping table.
pub const MAPPING_FILE: &str = "mapping.csv";
/// Run-wide line index.
pub const INDEX_FILE: &str = "index.jsonl";
/// Config file looked up under the root when `--config` is not given.
pub const CONFIG_FILE: &str = "proofrec.toml";
