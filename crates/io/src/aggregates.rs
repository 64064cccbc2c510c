// Aggregate files: mapping.csv, index.jsonl, per-slug proof.json and checksums.txt

use std::fs;
use std::io::{BufRead, Write};
use std::path::Path;

use proofrec_recon::model::{IndexLine, MappingRow, ProofRecord};

use crate::error::FsError;

pub const MAPPING_HEADER: &[&str] = &[
    "slug",
    "filename",
    "sha256",
    "bitcoin_txid",
    "woleet_proof_id",
    "anchored_utc",
    "canonical_uri",
    "title",
    "version",
    "mimetype",
    "size_bytes",
];

// ── Mapping table ───────────────────────────────────────────────────

/// Write the mapping table. Rows must already be sorted by slug.
pub fn write_mapping_csv(rows: &[MappingRow], writer: impl Write) -> Result<(), String> {
    let mut csv = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .has_headers(false)
        .from_writer(writer);

    csv.write_record(MAPPING_HEADER)
        .map_err(|e| format!("CSV write error: {e}"))?;
    for row in rows {
        csv.serialize(row).map_err(|e| format!("CSV write error: {e}"))?;
    }
    csv.flush().map_err(|e| format!("CSV flush error: {e}"))?;
    Ok(())
}

/// Parse a mapping table written by [`write_mapping_csv`].
pub fn read_mapping_csv(reader: impl std::io::Read) -> Result<Vec<MappingRow>, String> {
    let mut csv = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);

    let headers = csv.headers().map_err(|e| format!("CSV header error: {e}"))?;
    if headers.iter().ne(MAPPING_HEADER.iter().copied()) {
        return Err(format!(
            "unexpected header: {}",
            headers.iter().collect::<Vec<_>>().join(",")
        ));
    }

    csv.deserialize()
        .enumerate()
        .map(|(i, row)| row.map_err(|e| format!("CSV parse error at row {}: {e}", i + 1)))
        .collect()
}

pub fn render_mapping_csv(rows: &[MappingRow]) -> Result<Vec<u8>, String> {
    let mut buf = Vec::new();
    write_mapping_csv(rows, &mut buf)?;
    Ok(buf)
}

// ── Line index ──────────────────────────────────────────────────────

pub fn write_index_jsonl(lines: &[IndexLine], mut writer: impl Write) -> Result<(), String> {
    for line in lines {
        let json = serde_json::to_string(line).map_err(|e| format!("JSON write error: {e}"))?;
        writeln!(writer, "{json}").map_err(|e| format!("write error: {e}"))?;
    }
    writer.flush().map_err(|e| format!("flush error: {e}"))
}

/// Parse a line index. Blank lines are skipped.
pub fn read_index_jsonl(reader: impl BufRead) -> Result<Vec<IndexLine>, String> {
    let mut out = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| format!("read error at line {}: {e}", i + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        let parsed = serde_json::from_str(&line).map_err(|e| format!("line {}: {e}", i + 1))?;
        out.push(parsed);
    }
    Ok(out)
}

pub fn render_index_jsonl(lines: &[IndexLine]) -> Result<Vec<u8>, String> {
    let mut buf = Vec::new();
    write_index_jsonl(lines, &mut buf)?;
    Ok(buf)
}

// ── Per-slug files ──────────────────────────────────────────────────

/// Pretty-printed proof record with a trailing newline.
pub fn render_proof_json(record: &ProofRecord) -> Result<Vec<u8>, String> {
    let mut buf = serde_json::to_vec_pretty(record).map_err(|e| format!("JSON write error: {e}"))?;
    buf.push(b'\n');
    Ok(buf)
}

pub fn read_proof_json(path: &Path) -> Result<ProofRecord, FsError> {
    let text = fs::read_to_string(path).map_err(|e| FsError::read(path, e))?;
    serde_json::from_str(&text).map_err(|e| FsError::parse(path, e))
}

/// `SHA256  <hex>  <relative-path>` line.
pub fn render_checksums(sha256: &str, rel_path: &str) -> String {
    format!("SHA256  {sha256}  {rel_path}\n")
}

/// Parse checksum lines back into `(sha256, path)` pairs.
pub fn parse_checksums(text: &str) -> Vec<(String, String)> {
    text.lines()
        .filter_map(|line| {
            let rest = line.strip_prefix("SHA256  ")?;
            let (sha, path) = rest.split_once("  ")?;
            Some((sha.to_string(), path.to_string()))
        })
        .collect()
}

/// Names of the slug directories under `by-doc/`, sorted. A missing
/// directory is an empty list.
pub fn list_slug_dirs(by_doc: &Path) -> Result<Vec<String>, FsError> {
    let entries = match fs::read_dir(by_doc) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(FsError::read(by_doc, e)),
    };
    let mut slugs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| FsError::read(by_doc, e))?;
        if entry.path().is_dir() {
            slugs.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    slugs.sort();
    Ok(slugs)
}
