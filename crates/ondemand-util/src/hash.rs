use std::path::Path;

/// Length of a path fingerprint in hex characters.
pub const FINGERPRINT_LEN: usize = 16;

/// Compute the BLAKE3 hash of a byte slice, returning the hex-encoded digest.
#[must_use]
pub fn blake3_bytes(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

/// Fixed-length fingerprint of a path.
///
/// Derived from the path text only, never from file contents: the same path
/// always maps to the same fingerprint. Separators are normalized so the
/// value is stable across platforms.
#[must_use]
pub fn path_fingerprint(path: &Path) -> String {
    let normalized = path.to_string_lossy().replace('\\', "/");
    let mut hex = blake3_bytes(normalized.as_bytes());
    hex.truncate(FINGERPRINT_LEN);
    hex
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blake3_bytes() {
        let hash = blake3_bytes(b"hello world");
        assert_eq!(
            hash,
            "d74981efa70a0c880b8d8c1985d075dbcbf679b99a5f9914e5aaf96b831a9e24"
        );
    }

    #[test]
    fn test_path_fingerprint_is_fixed_length_hex() {
        let fp = path_fingerprint(Path::new("/project/node_modules/ui/index.tsx"));
        assert_eq!(fp.len(), FINGERPRINT_LEN);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_path_fingerprint_stable_per_path() {
        let a = path_fingerprint(Path::new("/project/src/Button.tsx"));
        let b = path_fingerprint(Path::new("/project/src/Button.tsx"));
        let c = path_fingerprint(Path::new("/project/src/Card.tsx"));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_path_fingerprint_normalizes_separators() {
        assert_eq!(
            path_fingerprint(Path::new("C:\\work\\app.ts")),
            path_fingerprint(Path::new("C:/work/app.ts"))
        );
    }
}
