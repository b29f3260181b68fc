//! Hex digests for the `checksum` rule.

use csvs_types::HashAlgorithm;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512, Sha512_224, Sha512_256};

/// Lowercase hex digest of `bytes`.
pub fn hex_digest(algorithm: HashAlgorithm, bytes: &[u8]) -> String {
    match algorithm {
        HashAlgorithm::Sha224 => format!("{:x}", Sha224::digest(bytes)),
        HashAlgorithm::Sha256 => format!("{:x}", Sha256::digest(bytes)),
        HashAlgorithm::Sha384 => format!("{:x}", Sha384::digest(bytes)),
        HashAlgorithm::Sha512 => format!("{:x}", Sha512::digest(bytes)),
        HashAlgorithm::Sha512_224 => format!("{:x}", Sha512_224::digest(bytes)),
        HashAlgorithm::Sha512_256 => format!("{:x}", Sha512_256::digest(bytes)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digests() {
        assert_eq!(
            hex_digest(HashAlgorithm::Sha256, b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(
            hex_digest(HashAlgorithm::Sha224, b"abc"),
            "23097d223405d8228642a477bda255b32aadbce4bda0b3f7e36c9da7"
        );
    }

    #[test]
    fn test_digest_lengths() {
        assert_eq!(hex_digest(HashAlgorithm::Sha384, b"").len(), 96);
        assert_eq!(hex_digest(HashAlgorithm::Sha512, b"").len(), 128);
        assert_eq!(hex_digest(HashAlgorithm::Sha512_224, b"").len(), 56);
        assert_eq!(hex_digest(HashAlgorithm::Sha512_256, b"").len(), 64);
    }
}
