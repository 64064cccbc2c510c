//! Receipt normalization.
//!
//! Receipt producers disagree on field names and nesting. Each canonical
//! field has an ordered list of candidate keys; the first key present with a
//! non-empty value wins. Absence at every step yields `None`, never an error.
//! The only failure is a record that is not an object at all.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::{Map, Value};

use crate::footer::parse_footer_text;
use crate::model::{Anchor, Receipt, ReceiptSource};

/// Anchor type tags that count as a public-ledger anchor.
pub const LEDGER_FAMILIES: &[&str] = &["bitcoin", "btc", "opreturn", "op-return", "op_return"];

const UTC_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Above this an epoch integer is read as milliseconds.
const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CanonicalField {
    ProofId,
    TargetHash,
    Anchors,
    Txid,
    BlockTime,
    AnchoredTime,
    CreatedTime,
    Link,
    AnchorType,
    AnchorTxid,
    AnchorBlockHeight,
    AnchorTime,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 12] = [
        Self::ProofId,
        Self::TargetHash,
        Self::Anchors,
        Self::Txid,
        Self::BlockTime,
        Self::AnchoredTime,
        Self::CreatedTime,
        Self::Link,
        Self::AnchorType,
        Self::AnchorTxid,
        Self::AnchorBlockHeight,
        Self::AnchorTime,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::ProofId => "proof_id",
            Self::TargetHash => "target_hash",
            Self::Anchors => "anchors",
            Self::Txid => "txid",
            Self::BlockTime => "block_time",
            Self::AnchoredTime => "anchored_time",
            Self::CreatedTime => "created_time",
            Self::Link => "link",
            Self::AnchorType => "anchor_type",
            Self::AnchorTxid => "anchor_txid",
            Self::AnchorBlockHeight => "anchor_block_height",
            Self::AnchorTime => "anchor_time",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }
}

/// Built-in key table, in priority order.
const DEFAULT_RULES: &[(CanonicalField, &[&str])] = &[
    (CanonicalField::ProofId, &["id", "proof_id", "proofId"]),
    (CanonicalField::TargetHash, &["targetHash", "hash"]),
    (CanonicalField::Anchors, &["anchors", "anchor"]),
    (CanonicalField::Txid, &["txid", "txId"]),
    (CanonicalField::BlockTime, &["blockTime"]),
    (CanonicalField::AnchoredTime, &["anchoredOn"]),
    (CanonicalField::CreatedTime, &["created"]),
    (CanonicalField::Link, &["receiptUrl", "url"]),
    (CanonicalField::AnchorType, &["type"]),
    (CanonicalField::AnchorTxid, &["txId", "txid"]),
    (CanonicalField::AnchorBlockHeight, &["blockHeight"]),
    (CanonicalField::AnchorTime, &["time", "timestamp", "confirmedAt"]),
];

/// Ordered `{canonical field: [candidate key, ...]}` table.
#[derive(Debug, Clone)]
pub struct ReceiptSchema {
    rules: BTreeMap<CanonicalField, Vec<String>>,
}

impl Default for ReceiptSchema {
    fn default() -> Self {
        let rules = DEFAULT_RULES
            .iter()
            .map(|(field, keys)| (*field, keys.iter().map(|k| k.to_string()).collect()))
            .collect();
        Self { rules }
    }
}

impl ReceiptSchema {
    /// Append configured aliases after the built-in keys. Unknown field names
    /// are rejected by config validation, so they are skipped here.
    pub fn with_extra_keys(mut self, extra: &BTreeMap<String, Vec<String>>) -> Self {
        for (name, keys) in extra {
            let Some(field) = CanonicalField::from_name(name) else {
                continue;
            };
            let slot = self.rules.entry(field).or_default();
            for key in keys {
                if !slot.contains(key) {
                    slot.push(key.clone());
                }
            }
        }
        self
    }

    pub fn keys(&self, field: CanonicalField) -> &[String] {
        self.rules.get(&field).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// First candidate key holding a usable value.
    fn lookup<'v>(&self, obj: &'v Map<String, Value>, field: CanonicalField) -> Option<&'v Value> {
        self.keys(field)
            .iter()
            .filter_map(|k| obj.get(k))
            .find(|v| is_present(v))
    }

    fn text(&self, obj: &Map<String, Value>, field: CanonicalField) -> Option<String> {
        self.lookup(obj, field).and_then(value_as_text)
    }

    /// Normalize a parsed record. Fails only when `value` is not an object.
    pub fn normalize(&self, source_name: &str, value: &Value) -> Result<Receipt, String> {
        let obj = value
            .as_object()
            .ok_or_else(|| format!("expected a JSON object, found {}", json_kind(value)))?;

        let proof_id = self.text(obj, CanonicalField::ProofId);
        let target_hash = self
            .text(obj, CanonicalField::TargetHash)
            .map(|h| h.to_ascii_lowercase());
        let link = self.text(obj, CanonicalField::Link);

        let anchors: Vec<Anchor> = match self.lookup(obj, CanonicalField::Anchors) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_object)
                .map(|a| self.anchor(a))
                .collect(),
            Some(Value::Object(single)) => vec![self.anchor(single)],
            _ => Vec::new(),
        };

        // First qualifying anchor wins; later ones never override it.
        let ledger_anchor = anchors.iter().find(|a| is_ledger_family(&a.kind));

        let txid = ledger_anchor
            .and_then(|a| a.txid.clone())
            .or_else(|| self.text(obj, CanonicalField::Txid))
            .map(|t| t.to_ascii_lowercase());
        let block_height = ledger_anchor.and_then(|a| a.block_height);

        let anchored_utc = ledger_anchor
            .and_then(|a| a.time_utc.clone())
            .or_else(|| self.time(obj, CanonicalField::BlockTime))
            .or_else(|| self.time(obj, CanonicalField::AnchoredTime))
            .or_else(|| self.time(obj, CanonicalField::CreatedTime));

        Ok(Receipt {
            source_name: source_name.to_string(),
            proof_id,
            target_hash,
            anchors,
            txid,
            block_height,
            anchored_utc,
            link,
        })
    }

    fn anchor(&self, obj: &Map<String, Value>) -> Anchor {
        Anchor {
            kind: self
                .text(obj, CanonicalField::AnchorType)
                .map(|t| t.to_ascii_lowercase())
                .unwrap_or_default(),
            txid: self.text(obj, CanonicalField::AnchorTxid),
            block_height: self
                .lookup(obj, CanonicalField::AnchorBlockHeight)
                .and_then(value_as_height),
            time_utc: self.time(obj, CanonicalField::AnchorTime),
        }
    }

    /// Every candidate key is tried until one parses; an unparseable value
    /// under an earlier key does not hide a good one under a later key.
    fn time(&self, obj: &Map<String, Value>, field: CanonicalField) -> Option<String> {
        self.keys(field)
            .iter()
            .filter_map(|k| obj.get(k))
            .find_map(normalize_timestamp)
    }
}

/// Parse a receipt file: `.json` bodies as JSON records, anything else as
/// extracted footer text.
pub fn parse_receipt(schema: &ReceiptSchema, source: &ReceiptSource) -> Result<Receipt, String> {
    let value = if source.name.to_ascii_lowercase().ends_with(".json") {
        serde_json::from_str::<Value>(&source.body).map_err(|e| format!("invalid JSON: {e}"))?
    } else {
        parse_footer_text(&source.body).to_record()
    };
    schema.normalize(&source.name, &value)
}

pub fn is_ledger_family(kind: &str) -> bool {
    LEDGER_FAMILIES.iter().any(|f| f.eq_ignore_ascii_case(kind))
}

/// Normalize a timestamp-like value to `YYYY-MM-DDTHH:MM:SSZ`. Returns `None`
/// for anything that does not denote a valid instant.
pub fn normalize_timestamp(value: &Value) -> Option<String> {
    let instant = match value {
        Value::String(s) => parse_time_str(s.trim()),
        Value::Number(n) => n
            .as_i64()
            .and_then(from_epoch)
            .or_else(|| n.as_f64().and_then(|f| from_epoch(f.trunc() as i64))),
        _ => None,
    }?;
    Some(instant.format(UTC_FORMAT).to_string())
}

fn parse_time_str(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|n| Utc.from_utc_datetime(&n));
    }
    // Bare years and other short digit runs are not epochs.
    if s.len() >= 9 && s.bytes().all(|b| b.is_ascii_digit()) {
        return s.parse::<i64>().ok().and_then(from_epoch);
    }
    None
}

fn from_epoch(raw: i64) -> Option<DateTime<Utc>> {
    if raw <= 0 {
        return None;
    }
    if raw > EPOCH_MILLIS_THRESHOLD {
        DateTime::from_timestamp(raw / 1000, ((raw % 1000) * 1_000_000) as u32)
    } else {
        DateTime::from_timestamp(raw, 0)
    }
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => true,
    }
}

fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn value_as_height(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
