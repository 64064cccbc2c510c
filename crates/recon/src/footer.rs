//! Proof fields embedded in free text, such as a document footer that has
//! already been extracted by another tool.
//!
//! Heuristics: the first 64-hex run is the content hash, the next distinct
//! 64-hex run is the transaction id, the first UUID is the proof id, the first
//! `YYYY-MM-DDTHH:MM:SSZ` is the anchoring time.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FooterProof {
    pub sha256: Option<String>,
    pub txid: Option<String>,
    pub proof_id: Option<String>,
    pub anchored_utc: Option<String>,
}

impl FooterProof {
    /// Render as a record the default receipt schema understands.
    pub fn to_record(&self) -> Value {
        let mut obj = Map::new();
        let fields = [
            ("targetHash", &self.sha256),
            ("txid", &self.txid),
            ("id", &self.proof_id),
            ("anchoredOn", &self.anchored_utc),
        ];
        for (key, value) in fields {
            if let Some(v) = value {
                obj.insert(key.to_string(), Value::String(v.clone()));
            }
        }
        Value::Object(obj)
    }
}

fn hex64_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b[a-f0-9]{64}\b").expect("static regex"))
}

fn uuid_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b[0-9a-f]{8}-[0-9a-f]{4}-[1-5][0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}\b")
            .expect("static regex")
    })
}

fn iso_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}Z\b").expect("static regex"))
}

pub fn parse_footer_text(text: &str) -> FooterProof {
    let mut hexes = hex64_re().find_iter(text).map(|m| m.as_str().to_ascii_lowercase());
    let sha256 = hexes.next();
    let txid = match &sha256 {
        Some(first) => hexes.find(|h| h != first),
        None => None,
    };

    FooterProof {
        sha256,
        txid,
        proof_id: uuid_re().find(text).map(|m| m.as_str().to_ascii_lowercase()),
        anchored_utc: iso_re().find(text).map(|m| m.as_str().to_string()),
    }
}
