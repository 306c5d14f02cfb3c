//! Layout fingerprints.

use xxhash_rust::xxh3::Xxh3;

/// Streaming xxh3 fingerprint over delimited fields.
///
/// Every field is terminated so that `("ab", "c")` and `("a", "bc")` hash
/// differently.
#[derive(Default, Clone)]
pub struct Fingerprint {
    hasher: Xxh3,
}

impl Fingerprint {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one variable-length field.
    pub fn field(&mut self, data: &[u8]) -> &mut Self {
        self.hasher.update(data);
        self.hasher.update(&[0]);
        self
    }

    /// Feed fixed-width flag bytes.
    pub fn flags(&mut self, bytes: &[u8]) -> &mut Self {
        self.hasher.update(bytes);
        self
    }

    /// Close a group of fields, e.g. one peer.
    pub fn end_group(&mut self) -> &mut Self {
        self.hasher.update(&[0xff]);
        self
    }

    #[must_use]
    pub fn finish(&self) -> u64 {
        self.hasher.digest()
    }
}
