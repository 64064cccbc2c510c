use std::collections::BTreeMap;
use std::path::{Component, Path};

use serde::{Deserialize, Serialize};

use crate::error::ReconError;
use crate::normalize::CanonicalField;
use crate::version::is_version_token;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Run configuration. Every key is optional; a missing file means
/// `ProofConfig::default()`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProofConfig {
    /// Directory under the root holding one sub-directory per group.
    pub input_dir: String,
    /// Directory under the root receiving `by-doc/`, `mapping.csv`, `index.jsonl`.
    pub output_dir: String,
    pub schema_version: String,
    pub anchor_network: String,
    /// Version used when neither the file name nor the group label carries one.
    pub default_version: String,
    pub duplicate_slugs: DuplicateSlugPolicy,
    pub annex_mode: AnnexMode,
    pub authorship: Authorship,
    pub classify: ClassifyConfig,
    pub receipt: ReceiptConfig,
}

impl Default for ProofConfig {
    fn default() -> Self {
        Self {
            input_dir: "stamped".into(),
            output_dir: "proofs".into(),
            schema_version: "1.0".into(),
            anchor_network: "bitcoin-mainnet".into(),
            default_version: "v1.0".into(),
            duplicate_slugs: DuplicateSlugPolicy::default(),
            annex_mode: AnnexMode::default(),
            authorship: Authorship::default(),
            classify: ClassifyConfig::default(),
            receipt: ReceiptConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Policies
// ---------------------------------------------------------------------------

/// What happens when two groups resolve to the same composite slug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateSlugPolicy {
    /// Later record replaces the earlier one (warning).
    #[default]
    LastWriteWins,
    /// Earlier record is kept, later one dropped (warning).
    FirstWriteWins,
    /// Run fails before anything is written.
    Reject,
}

impl std::fmt::Display for DuplicateSlugPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LastWriteWins => write!(f, "last_write_wins"),
            Self::FirstWriteWins => write!(f, "first_write_wins"),
            Self::Reject => write!(f, "reject"),
        }
    }
}

/// How annex files land in a slug directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnexMode {
    #[default]
    Copy,
    /// Relative symbolic link back to the input file.
    Link,
}

impl std::fmt::Display for AnnexMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Copy => write!(f, "copy"),
            Self::Link => write!(f, "link"),
        }
    }
}

// ---------------------------------------------------------------------------
// Authorship
// ---------------------------------------------------------------------------

/// Static authorship block copied into every proof record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Authorship {
    pub author: String,
    pub copyright: String,
    pub license: String,
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifyStrategy {
    /// Substring keywords in the file name decide annex roles.
    #[default]
    Keyword,
    /// File suffixes alone decide.
    Extension,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClassifyConfig {
    pub strategy: ClassifyStrategy,
    pub document_extensions: Vec<String>,
    pub receipt_extensions: Vec<String>,
    pub image_extensions: Vec<String>,
    pub receipt_keywords: Vec<String>,
    pub screenshot_keywords: Vec<String>,
    pub attestation_suffixes: Vec<String>,
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        fn strings(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }
        Self {
            strategy: ClassifyStrategy::default(),
            document_extensions: strings(&["pdf"]),
            receipt_extensions: strings(&["json"]),
            image_extensions: strings(&["png", "jpg", "jpeg"]),
            receipt_keywords: strings(&["receipt", "attestation"]),
            screenshot_keywords: strings(&["woleet", "receipt", "attestation"]),
            attestation_suffixes: strings(&[".attestation.pdf", ".receipt.pdf"]),
        }
    }
}

// ---------------------------------------------------------------------------
// Receipt key aliases
// ---------------------------------------------------------------------------

/// Extra candidate keys per canonical field, tried after the built-in ones.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReceiptConfig {
    pub extra_keys: BTreeMap<String, Vec<String>>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ProofConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ProofConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if !is_version_token(&self.default_version) {
            return Err(ReconError::ConfigValidation(format!(
                "default_version must look like 'v1' or 'v1.0', got '{}'",
                self.default_version
            )));
        }

        for (key, dir) in [("input_dir", &self.input_dir), ("output_dir", &self.output_dir)] {
            if !is_plain_relative(dir) {
                return Err(ReconError::ConfigValidation(format!(
                    "{key} must be a non-empty relative path without '..', got '{dir}'"
                )));
            }
        }

        if Path::new(&self.input_dir) == Path::new(&self.output_dir) {
            return Err(ReconError::ConfigValidation(
                "input_dir and output_dir must differ".into(),
            ));
        }

        if self.classify.document_extensions.is_empty() {
            return Err(ReconError::ConfigValidation(
                "classify.document_extensions must not be empty".into(),
            ));
        }

        for field in self.receipt.extra_keys.keys() {
            if CanonicalField::from_name(field).is_none() {
                return Err(ReconError::ConfigValidation(format!(
                    "receipt.extra_keys: unknown field '{field}'"
                )));
            }
        }

        Ok(())
    }
}

fn is_plain_relative(dir: &str) -> bool {
    let path = Path::new(dir);
    !dir.trim().is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
