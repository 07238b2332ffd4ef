//! Structural hashing for style components.
//!
//! Hashes must be identical across runs and platforms, so this is a fixed
//! FNV-1a rather than the randomly seeded std hasher. Every component
//! enumerates its own fields; the assigned index never takes part.

use std::hash::Hasher;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

#[derive(Debug, Clone)]
pub struct StableHasher {
    state: u64,
}

impl Default for StableHasher {
    fn default() -> Self {
        Self { state: FNV_OFFSET }
    }
}

impl StableHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_str(&mut self, value: &str) {
        self.write_usize(value.len());
        self.write(value.as_bytes());
    }

    pub fn write_bool(&mut self, value: bool) {
        self.write_u8(u8::from(value));
    }

    pub fn write_f64(&mut self, value: f64) {
        // -0.0 and 0.0 are the same size
        let normalized = if value == 0.0 { 0.0 } else { value };
        self.write_u64(normalized.to_bits());
    }

    pub fn write_opt<T>(&mut self, value: Option<&T>, write: impl FnOnce(&mut Self, &T)) {
        match value {
            Some(v) => {
                self.write_u8(1);
                write(self, v);
            }
            None => self.write_u8(0),
        }
    }
}

impl Hasher for StableHasher {
    fn finish(&self) -> u64 {
        self.state
    }

    fn write(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.state ^= u64::from(*byte);
            self.state = self.state.wrapping_mul(FNV_PRIME);
        }
    }

    fn write_u64(&mut self, value: u64) {
        self.write(&value.to_le_bytes());
    }

    fn write_u32(&mut self, value: u32) {
        self.write(&value.to_le_bytes());
    }

    fn write_usize(&mut self, value: usize) {
        self.write_u64(value as u64);
    }
}

/// Common surface of everything that lives in a [`CanonicalPool`](super::CanonicalPool)
pub trait StyleComponent: Clone {
    /// Pool kind, used in lookup errors and logs
    const KIND: &'static str;

    /// Feed every semantically relevant field, never the index
    fn hash_fields(&self, hasher: &mut StableHasher);

    fn index(&self) -> Option<u32>;

    fn set_index(&mut self, index: Option<u32>);

    fn structural_hash(&self) -> u64 {
        let mut hasher = StableHasher::new();
        hasher.write_str(Self::KIND);
        self.hash_fields(&mut hasher);
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fnv_reference_values() {
        let hasher = StableHasher::new();
        assert_eq!(hasher.finish(), FNV_OFFSET);

        let mut hasher = StableHasher::new();
        hasher.write(b"a");
        assert_eq!(hasher.finish(), 0xaf63_dc4c_8601_ec8c);
    }

    #[test]
    fn test_string_boundaries_matter() {
        let mut a = StableHasher::new();
        a.write_str("ab");
        a.write_str("c");
        let mut b = StableHasher::new();
        b.write_str("a");
        b.write_str("bc");
        assert_ne!(a.finish(), b.finish());
    }

    #[test]
    fn test_signed_zero_collapses() {
        let mut a = StableHasher::new();
        a.write_f64(0.0);
        let mut b = StableHasher::new();
        b.write_f64(-0.0);
        assert_eq!(a.finish(), b.finish());
    }
}
