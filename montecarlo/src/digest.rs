use std::{fmt, str::FromStr};

/// Size in bytes of a `Digest`.
pub const DIGEST_SIZE: usize = blake3::OUT_LEN;

/// Fingerprint of a serialized experiment.
///
/// Only ever compared for equality; two digests are equal iff they were
/// computed over identical bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest([u8; DIGEST_SIZE]);

impl Digest {
    /// Computes the digest of `bytes`.
    pub fn of(bytes: &[u8]) -> Self {
        Self(*blake3::hash(bytes).as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_SIZE] {
        &self.0
    }

    /// Lowercase hexadecimal text form, as sent over the wire.
    pub fn to_hex(&self) -> String {
        blake3::Hash::from_bytes(self.0).to_hex().to_string()
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Digest {
    type Err = blake3::HexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        blake3::Hash::from_hex(s).map(|h| Self(*h.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_inputs_give_equal_digests() {
        assert_eq!(Digest::of(b"system"), Digest::of(b"system"));
        assert_ne!(Digest::of(b"system"), Digest::of(b"system "));
    }

    #[test]
    fn hex_text_parses_back() {
        let digest = Digest::of(b"{\"block_size\":1024}");
        let text = digest.to_hex();

        assert_eq!(text.len(), 2 * DIGEST_SIZE);
        assert_eq!(text, digest.to_string());
        assert_eq!(text.parse::<Digest>().unwrap(), digest);
    }

    #[test]
    fn garbage_text_does_not_parse() {
        assert!("not a digest".parse::<Digest>().is_err());
    }
}
