//! Combined content hash over a feature's declared files

use sha2::{Digest, Sha256};
use std::path::Path;
use walkdir::WalkDir;

/// Compute the combined fingerprint of `files`, resolved against `root`
///
/// Each existing file is hashed with SHA-256; the hex digests are
/// concatenated in list order and hashed once more. Missing paths are
/// skipped. Directories contribute their files in sorted walk order.
/// Returns `None` when none of the listed paths exist.
pub fn fingerprint<S: AsRef<str>>(root: &Path, files: &[S]) -> Option<String> {
    let mut combined = String::new();

    for file in files {
        let path = root.join(file.as_ref());
        if path.is_file() {
            if let Some(digest) = hash_file(&path) {
                combined.push_str(&digest);
            }
        } else if path.is_dir() {
            for entry in WalkDir::new(&path)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
            {
                if let Some(digest) = hash_file(entry.path()) {
                    combined.push_str(&digest);
                }
            }
        } else {
            tracing::debug!(path = %path.display(), "fingerprint: skipping missing file");
        }
    }

    if combined.is_empty() {
        return None;
    }

    let mut hasher = Sha256::new();
    hasher.update(combined.as_bytes());
    Some(format!("{:x}", hasher.finalize()))
}

/// Hex SHA-256 of a file's bytes; unreadable files are treated as missing
fn hash_file(path: &Path) -> Option<String> {
    match std::fs::read(path) {
        Ok(bytes) => {
            let mut hasher = Sha256::new();
            hasher.update(&bytes);
            Some(format!("{:x}", hasher.finalize()))
        }
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "fingerprint: unreadable file");
            None
        }
    }
}
