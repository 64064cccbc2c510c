// Input/output directory layout under a run root

use std::path::{Component, Path, PathBuf};

use proofrec_recon::ProofConfig;

use crate::{CHECKSUMS_FILE, CONFIG_FILE, INDEX_FILE, MAPPING_FILE, PROOF_FILE};

/// Resolved paths for one run:
///
/// ```text
/// <root>/<input_dir>/<group>/...
/// <root>/<output_dir>/by-doc/<slug>/{proof.json, checksums.txt, annexes}
/// <root>/<output_dir>/{mapping.csv, index.jsonl}
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub root: PathBuf,
    pub input: PathBuf,
    pub output: PathBuf,
}

impl Layout {
    pub fn new(root: &Path, config: &ProofConfig) -> Self {
        Self {
            root: root.to_path_buf(),
            input: root.join(&config.input_dir),
            output: root.join(&config.output_dir),
        }
    }

    pub fn by_doc(&self) -> PathBuf {
        self.output.join("by-doc")
    }

    pub fn slug_dir(&self, slug: &str) -> PathBuf {
        self.by_doc().join(slug)
    }

    pub fn proof_path(&self, slug: &str) -> PathBuf {
        self.slug_dir(slug).join(PROOF_FILE)
    }

    pub fn checksums_path(&self, slug: &str) -> PathBuf {
        self.slug_dir(slug).join(CHECKSUMS_FILE)
    }

    pub fn mapping_path(&self) -> PathBuf {
        self.output.join(MAPPING_FILE)
    }

    pub fn index_path(&self) -> PathBuf {
        self.output.join(INDEX_FILE)
    }

    /// `path` relative to the root, forward slashes.
    pub fn rel(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        rel.components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    /// A root-relative file name from a proof record back to a real path.
    pub fn resolve(&self, rel: &str) -> PathBuf {
        rel.split('/').fold(self.root.clone(), |p, part| p.join(part))
    }
}

/// `<root>/proofrec.toml`, if present.
pub fn default_config_path(root: &Path) -> Option<PathBuf> {
    let path = root.join(CONFIG_FILE);
    path.is_file().then_some(path)
}

/// Path to `target` as seen from directory `from`. Both paths must share the
/// same root (absolute or relative).
pub fn relative_path(target: &Path, from: &Path) -> PathBuf {
    let t: Vec<Component> = target.components().collect();
    let f: Vec<Component> = from.components().collect();
    let common = t.iter().zip(&f).take_while(|(a, b)| a == b).count();

    let mut out = PathBuf::new();
    for _ in common..f.len() {
        out.push("..");
    }
    for c in &t[common..] {
        out.push(c.as_os_str());
    }
    out
}
