//! Content addressing: SHA-256 digests, digest-derived filenames and share ids.
//!
//! The digest is computed once per upload, before any backend I/O. It is both the
//! dedup key (`(tenant_id, digest)` is unique) and the basis of the stored filename,
//! so re-uploading identical bytes always produces the identical storage path.
//! The share id is a 32-character prefix of the digest and is backend-independent:
//! moving an asset to another backend never breaks published links.

use sha2::{Digest, Sha256};

/// Number of hex characters in a public share identifier.
pub const SHARE_ID_LEN: usize = 32;

/// A lowercase-hex SHA-256 digest of an asset body.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Hash the full blob body.
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        ContentDigest(hex::encode(hasher.finalize()))
    }

    /// Reconstruct from a stored hex string. Rejects anything that is not
    /// 64 lowercase hex characters.
    pub fn parse(hex_str: &str) -> Option<Self> {
        if hex_str.len() == 64 && hex_str.bytes().all(|b| b.is_ascii_hexdigit()) {
            Some(ContentDigest(hex_str.to_ascii_lowercase()))
        } else {
            None
        }
    }

    pub fn as_hex(&self) -> &str {
        &self.0
    }

    /// Stable public retrieval identity: the first 32 hex characters.
    pub fn share_id(&self) -> &str {
        &self.0[..SHARE_ID_LEN]
    }

    /// Digest-derived filename: `{digest}.{ext}`.
    pub fn filename(&self, extension: &str) -> String {
        format!("{}.{}", self.0, extension)
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_is_deterministic() {
        let a = ContentDigest::from_bytes(b"hello world");
        let b = ContentDigest::from_bytes(b"hello world");
        assert_eq!(a, b);
        assert_eq!(a.as_hex().len(), 64);
    }

    #[test]
    fn test_digest_differs_for_different_bytes() {
        let a = ContentDigest::from_bytes(b"hello world");
        let b = ContentDigest::from_bytes(b"hello worlds");
        assert_ne!(a, b);
    }

    #[test]
    fn test_share_id_is_digest_prefix() {
        let d = ContentDigest::from_bytes(b"payload");
        assert_eq!(d.share_id().len(), SHARE_ID_LEN);
        assert!(d.as_hex().starts_with(d.share_id()));
    }

    #[test]
    fn test_filename_carries_extension() {
        let d = ContentDigest::from_bytes(b"payload");
        let name = d.filename("png");
        assert!(name.starts_with(d.as_hex()));
        assert!(name.ends_with(".png"));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(ContentDigest::parse("abc").is_none());
        assert!(ContentDigest::parse(&"z".repeat(64)).is_none());
        let d = ContentDigest::from_bytes(b"x");
        assert_eq!(ContentDigest::parse(d.as_hex()), Some(d));
    }
}
