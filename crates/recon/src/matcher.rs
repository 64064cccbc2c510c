use crate::index::{base_name, file_stem, CandidateIndex};
use crate::model::{HashedDocument, MatchMethod, MatchResult, Receipt};

/// Pair a receipt with at most one document of its group.
///
/// Name first: a single document sharing the receipt's base name is taken
/// without looking at hashes. Several same-name documents are narrowed by the
/// declared hash, else tie-broken by oldest mtime then file name. With no
/// same-name document, fall back to the hash index.
pub fn match_receipt<'a>(receipt: &'a Receipt, index: &'a CandidateIndex) -> MatchResult<'a> {
    let base = base_name(file_stem(&receipt.source_name));
    let candidates = index.by_base(&base);
    let target = receipt.trusted_target();

    let (document, method) = match candidates.len() {
        0 => match target.and_then(|t| index.by_hash(t)) {
            Some(doc) => (Some(doc), MatchMethod::Hash),
            None => (None, MatchMethod::Unmatched),
        },
        1 => (Some(candidates[0]), MatchMethod::Name),
        _ => match target.and_then(|t| candidates.iter().copied().find(|c| c.sha256 == t)) {
            Some(doc) => (Some(doc), MatchMethod::Hash),
            None => (tie_break(&candidates), MatchMethod::TieBreak),
        },
    };

    MatchResult {
        receipt,
        document,
        method,
    }
}

/// [`match_receipt`] with group context: a group holding exactly one
/// document and one receipt always pairs them, whatever the names or the
/// declared hash say.
///
/// `document_count` is the group's full document set, hashable or not; the
/// index only holds the documents that could be hashed.
pub fn match_in_group<'a>(
    receipt: &'a Receipt,
    index: &'a CandidateIndex,
    document_count: usize,
    receipt_count: usize,
) -> MatchResult<'a> {
    let result = match_receipt(receipt, index);
    match (result.method, index.documents()) {
        (MatchMethod::Unmatched, [only]) if document_count == 1 && receipt_count == 1 => MatchResult {
            receipt,
            document: Some(only),
            method: MatchMethod::SolePair,
        },
        _ => result,
    }
}

/// Oldest modification time, then lexicographic file name.
fn tie_break<'a>(candidates: &[&'a HashedDocument]) -> Option<&'a HashedDocument> {
    candidates
        .iter()
        .copied()
        .min_by(|a, b| {
            a.file
                .modified
                .cmp(&b.file.modified)
                .then_with(|| a.file.name.cmp(&b.file.name))
        })
}
