//! Rolling hash used by the merkle trie
//!
//! Every participant in a sync (relay and clients, in any language) must agree
//! on this function bit for bit: MurmurHash3 x86 32-bit with seed 0, read as a
//! two's-complement `i32` so XOR folding matches 32-bit signed arithmetic.

use std::io::Cursor;

/// Seed shared by every replica
pub const MURMUR_SEED: u32 = 0;

/// Hash arbitrary bytes into the trie's 32-bit signed hash space
pub fn murmur3_32(data: &[u8]) -> i32 {
    let hash = murmur3::murmur3_32(&mut Cursor::new(data), MURMUR_SEED)
        .expect("reading from an in-memory cursor should not fail");
    hash as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_murmur_known_vectors() {
        assert_eq!(murmur3_32(b""), 0);
        assert_eq!(murmur3_32(b"hello"), 0x248b_fa47_u32 as i32);
    }

    #[test]
    fn test_murmur_deterministic() {
        let a = murmur3_32(b"2024-01-01T00:00:00.000Z-0000-0000000000000001");
        let b = murmur3_32(b"2024-01-01T00:00:00.000Z-0000-0000000000000001");
        let c = murmur3_32(b"2024-01-01T00:00:00.000Z-0001-0000000000000001");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
