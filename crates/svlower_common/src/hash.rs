//! Deterministic content hashing for identifier mangling.

use std::fmt;

/// A 128-bit content hash computed using XXH3.
///
/// Two inputs with the same `ContentHash` are assumed to be identical.
/// Used to key caches of elaborated entities by their full contents.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 16]);

impl ContentHash {
    /// Computes a content hash from a byte slice using XXH3-128.
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = xxhash_rust::xxh3::xxh3_128(data);
        Self(hash.to_le_bytes())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}

/// Computes a short deterministic textual hash of the input, suitable for
/// use as an identifier suffix.
///
/// The result is eight lowercase hex characters of the input's XXH3-64
/// digest. Identical inputs always produce identical suffixes, so mangled
/// names are stable across runs and across machines.
pub fn short_hash(input: &str) -> String {
    let hash = xxhash_rust::xxh3::xxh3_64(input.as_bytes());
    format!("{:08x}", (hash >> 32) as u32 ^ hash as u32)
}
