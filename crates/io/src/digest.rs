// SHA-256 content digests

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use proofrec_recon::index::ContentHasher;
use sha2::{Digest, Sha256};

const CHUNK: usize = 8192;

/// Lower-case hex SHA-256 of a file, streamed in fixed-size chunks.
pub fn sha256_file(path: &Path) -> std::io::Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; CHUNK];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// The engine's digest capability backed by the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl ContentHasher for Sha256Hasher {
    fn digest(&self, path: &Path) -> std::io::Result<String> {
        sha256_file(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn known_digests() {
        let dir = tempdir().unwrap();
        let empty = dir.path().join("empty.pdf");
        let abc = dir.path().join("abc.pdf");
        fs::write(&empty, b"").unwrap();
        fs::write(&abc, b"abc").unwrap();

        assert_eq!(
            sha256_file(&empty).unwrap(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            Sha256Hasher.digest(&abc).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn larger_than_one_chunk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("big.pdf");
        let data = vec![7u8; CHUNK * 3 + 17];
        fs::write(&path, &data).unwrap();
        assert_eq!(sha256_file(&path).unwrap(), format!("{:x}", Sha256::digest(&data)));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(sha256_file(&dir.path().join("nope.pdf")).is_err());
    }
}
