use serde::Serialize;

use crate::config::{ClassifyConfig, ClassifyStrategy};

/// Role a file plays inside a group directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileRole {
    Document,
    Receipt,
    Attestation,
    Screenshot,
    Ignored,
}

impl std::fmt::Display for FileRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Document => write!(f, "document"),
            Self::Receipt => write!(f, "receipt"),
            Self::Attestation => write!(f, "attestation"),
            Self::Screenshot => write!(f, "screenshot"),
            Self::Ignored => write!(f, "ignored"),
        }
    }
}

/// Decides the role of a group file from its name alone.
pub trait AnnexClassifier: Send + Sync {
    fn classify(&self, file_name: &str) -> FileRole;
}

/// Build the classifier selected by `config.strategy`.
pub fn classifier_for(config: &ClassifyConfig) -> Box<dyn AnnexClassifier> {
    match config.strategy {
        ClassifyStrategy::Keyword => Box::new(KeywordClassifier::new(config)),
        ClassifyStrategy::Extension => Box::new(ExtensionClassifier::new(config)),
    }
}

fn lowered(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|s| s.trim_start_matches('.').to_ascii_lowercase())
        .collect()
}

/// Lower-cased extension after the last dot, if any.
fn extension(lower_name: &str) -> Option<&str> {
    lower_name.rsplit_once('.').map(|(_, ext)| ext).filter(|e| !e.is_empty())
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

// ---------------------------------------------------------------------------
// Keyword strategy
// ---------------------------------------------------------------------------

/// Substring heuristic: a document-typed file whose name mentions a receipt
/// keyword is an attestation, an image mentioning a screenshot keyword is a
/// screenshot.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    document_extensions: Vec<String>,
    receipt_extensions: Vec<String>,
    image_extensions: Vec<String>,
    receipt_keywords: Vec<String>,
    screenshot_keywords: Vec<String>,
}

impl KeywordClassifier {
    pub fn new(config: &ClassifyConfig) -> Self {
        Self {
            document_extensions: lowered(&config.document_extensions),
            receipt_extensions: lowered(&config.receipt_extensions),
            image_extensions: lowered(&config.image_extensions),
            receipt_keywords: lowered(&config.receipt_keywords),
            screenshot_keywords: lowered(&config.screenshot_keywords),
        }
    }

    fn mentions(lower_name: &str, keywords: &[String]) -> bool {
        keywords.iter().any(|k| lower_name.contains(k.as_str()))
    }
}

impl AnnexClassifier for KeywordClassifier {
    fn classify(&self, file_name: &str) -> FileRole {
        if is_hidden(file_name) {
            return FileRole::Ignored;
        }
        let lower = file_name.to_ascii_lowercase();
        let Some(ext) = extension(&lower) else {
            return FileRole::Ignored;
        };
        let has = |list: &[String]| list.iter().any(|e| e == ext);

        if has(&self.receipt_extensions) {
            FileRole::Receipt
        } else if ext == "txt" && Self::mentions(&lower, &self.receipt_keywords) {
            FileRole::Receipt
        } else if has(&self.document_extensions) {
            if Self::mentions(&lower, &self.receipt_keywords) {
                FileRole::Attestation
            } else {
                FileRole::Document
            }
        } else if has(&self.image_extensions) && Self::mentions(&lower, &self.screenshot_keywords) {
            FileRole::Screenshot
        } else {
            FileRole::Ignored
        }
    }
}

// ---------------------------------------------------------------------------
// Extension strategy
// ---------------------------------------------------------------------------

/// Suffix-only rules: compound attestation suffixes first, then plain extensions.
#[derive(Debug, Clone)]
pub struct ExtensionClassifier {
    document_extensions: Vec<String>,
    receipt_extensions: Vec<String>,
    image_extensions: Vec<String>,
    attestation_suffixes: Vec<String>,
}

impl ExtensionClassifier {
    pub fn new(config: &ClassifyConfig) -> Self {
        Self {
            document_extensions: lowered(&config.document_extensions),
            receipt_extensions: lowered(&config.receipt_extensions),
            image_extensions: lowered(&config.image_extensions),
            attestation_suffixes: config
                .attestation_suffixes
                .iter()
                .map(|s| s.to_ascii_lowercase())
                .collect(),
        }
    }
}

impl AnnexClassifier for ExtensionClassifier {
    fn classify(&self, file_name: &str) -> FileRole {
        if is_hidden(file_name) {
            return FileRole::Ignored;
        }
        let lower = file_name.to_ascii_lowercase();
        if self.attestation_suffixes.iter().any(|s| lower.ends_with(s.as_str())) {
            return FileRole::Attestation;
        }
        if lower.ends_with(".receipt.txt") {
            return FileRole::Receipt;
        }
        let Some(ext) = extension(&lower) else {
            return FileRole::Ignored;
        };
        let has = |list: &[String]| list.iter().any(|e| e == ext);

        if has(&self.receipt_extensions) {
            FileRole::Receipt
        } else if has(&self.document_extensions) {
            FileRole::Document
        } else if has(&self.image_extensions) {
            FileRole::Screenshot
        } else {
            FileRole::Ignored
        }
    }
}
