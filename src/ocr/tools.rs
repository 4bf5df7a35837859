//! Locating external OCR tools.

use std::path::PathBuf;

/// Check if a binary is available in PATH.
pub fn check_binary(name: &str) -> bool {
    which::which(name).is_ok()
}

/// Resolve the binary to run: an explicit path wins over PATH lookup.
pub fn resolve_binary(explicit: Option<&PathBuf>, name: &str) -> Option<PathBuf> {
    match explicit {
        Some(path) if path.exists() => Some(path.clone()),
        Some(_) => None,
        None => which::which(name).ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_explicit_path_is_unavailable() {
        let bogus = PathBuf::from("/nonexistent/dir/tesseract");
        assert!(resolve_binary(Some(&bogus), "tesseract").is_none());
    }

    #[test]
    fn test_unknown_binary_not_found() {
        assert!(!check_binary("definitely-not-a-real-binary-name"));
    }
}
