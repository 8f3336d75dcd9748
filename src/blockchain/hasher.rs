use sha2::{Digest, Sha256};

/// SHA-256 of `input` as 64 lowercase hex characters.
pub fn sha256_hex(input: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input);
    hex::encode(hasher.finalize())
}

/// True when the first `zeros` characters of `digest` are all `'0'`.
pub fn has_leading_zeros(digest: &str, zeros: u32) -> bool {
    let zeros = zeros as usize;
    digest.len() >= zeros && digest.bytes().take(zeros).all(|c| c == b'0')
}

#[cfg(test)]
mod tests {
    use super::{has_leading_zeros, sha256_hex};

    #[test]
    fn known_digest() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(sha256_hex(b"").len(), 64);
    }

    #[test]
    fn prefix_check() {
        assert!(has_leading_zeros("abc", 0));
        assert!(has_leading_zeros("00ab", 2));
        assert!(!has_leading_zeros("00ab", 3));
        assert!(!has_leading_zeros("0", 2));
    }
}
