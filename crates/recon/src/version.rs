//! Version tokens, slugs and composite identities.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

fn embedded_version_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(?:^|[_\-\s])(v\d+(?:\.\d+)*)").expect("static regex"))
}

fn trailing_version_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(?:^|[_\-\s])v\d+(?:\.\d+)*$").expect("static regex"))
}

fn version_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^v\d+(?:\.\d+)*$").expect("static regex"))
}

/// Where a resolved version came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionSource {
    FileName,
    GroupLabel,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVersion {
    /// Dotted form, e.g. `v2.0`.
    pub token: String,
    /// Slug form, e.g. `v2-0`.
    pub slug_part: String,
    pub source: VersionSource,
}

/// True if `s` is a bare version token such as `v1` or `V2.0.3`.
pub fn is_version_token(s: &str) -> bool {
    version_token_re().is_match(s)
}

/// First version token embedded in `name`, at the start or after `_`, `-` or whitespace.
pub fn find_version_token(name: &str) -> Option<String> {
    embedded_version_re()
        .captures(name)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Lower-case and pad a single-segment token to `major.minor`.
fn canonical_token(token: &str) -> String {
    let lower = token.to_ascii_lowercase();
    if lower.contains('.') {
        lower
    } else {
        format!("{lower}.0")
    }
}

/// Priority: file stem, then group label, then `default`.
pub fn resolve_version(file_stem: &str, group_label: &str, default: &str) -> ResolvedVersion {
    let (raw, source) = if let Some(t) = find_version_token(file_stem) {
        (t, VersionSource::FileName)
    } else if let Some(t) = find_version_token(group_label) {
        (t, VersionSource::GroupLabel)
    } else {
        (default.to_string(), VersionSource::Default)
    };
    let token = canonical_token(&raw);
    let slug_part = token.replace('.', "-");
    ResolvedVersion { token, slug_part, source }
}

/// Lower-case, fold common Latin accents, collapse everything else to `-`.
pub fn slugify(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pending_dash = false;
    for ch in s.chars().flat_map(char::to_lowercase) {
        let ch = fold_accent(ch);
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(ch);
        } else {
            pending_dash = true;
        }
    }
    if out.is_empty() {
        "untitled".into()
    } else {
        out
    }
}

fn fold_accent(ch: char) -> char {
    match ch {
        'à' | 'â' | 'ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'ï' | 'î' => 'i',
        'ô' | 'ö' => 'o',
        'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        other => other,
    }
}

/// Group label without its trailing version suffix, slugified.
pub fn base_slug(group_label: &str) -> String {
    slugify(&trailing_version_re().replace(group_label, ""))
}

pub fn composite_slug(base_slug: &str, version: &ResolvedVersion) -> String {
    format!("{base_slug}_{}", version.slug_part)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_when_no_token() {
        let v = resolve_version("Report", "Report", "v1.0");
        assert_eq!(v.token, "v1.0");
        assert_eq!(v.slug_part, "v1-0");
        assert_eq!(v.source, VersionSource::Default);
    }

    #[test]
    fn file_name_beats_group_label() {
        let v = resolve_version("Charter_V3.1", "Charter_v2", "v1.0");
        assert_eq!(v.slug_part, "v3-1");
        assert_eq!(v.source, VersionSource::FileName);
    }

    #[test]
    fn group_label_used_when_file_has_none() {
        let v = resolve_version("A", "Report_v2", "v1.0");
        assert_eq!(v.token, "v2.0");
        assert_eq!(v.slug_part, "v2-0");
        assert_eq!(v.source, VersionSource::GroupLabel);
    }

    #[test]
    fn token_must_follow_separator() {
        assert_eq!(find_version_token("review2"), None);
        assert_eq!(find_version_token("preview v4"), Some("v4".into()));
        assert_eq!(find_version_token("v5-draft"), Some("v5".into()));
        assert_eq!(find_version_token("doc-v1.2.3"), Some("v1.2.3".into()));
        assert_eq!(find_version_token("doc_v"), None);
    }

    #[test]
    fn version_token_shape() {
        assert!(is_version_token("v1"));
        assert!(is_version_token("V2.0.3"));
        assert!(!is_version_token("1.0"));
        assert!(!is_version_token("v1."));
        assert!(!is_version_token("v1.0-beta"));
    }

    #[test]
    fn slugify_rules() {
        assert_eq!(slugify("Report"), "report");
        assert_eq!(slugify("  Charte éthique — Été 2025 "), "charte-ethique-ete-2025");
        assert_eq!(slugify("a__b--c"), "a-b-c");
        assert_eq!(slugify("***"), "untitled");
    }

    #[test]
    fn base_slug_strips_trailing_version() {
        assert_eq!(base_slug("Report_v2"), "report");
        assert_eq!(base_slug("Report v2.1"), "report");
        assert_eq!(base_slug("Report-V3"), "report");
        assert_eq!(base_slug("v2 Report"), "v2-report");
        assert_eq!(base_slug("v2"), "untitled");
    }

    #[test]
    fn composite() {
        let v = resolve_version("Report", "Report", "v1.0");
        assert_eq!(composite_slug("report", &v), "report_v1-0");
    }
}
