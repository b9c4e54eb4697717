//! Sliding-window rolling checksum used for cut-point detection.
//!
//! A buzhash (cyclic polynomial) over a fixed window of recent bytes.
//! The value at any position depends only on the last [`WINDOW_SIZE`]
//! bytes, never on the absolute file offset, so an edit in one region of
//! a file can only perturb cut decisions near that region.

/// Number of recent bytes the checksum covers.
pub const WINDOW_SIZE: usize = 48;

/// Per-byte mixing table, fixed for the lifetime of the deployment.
///
/// Generated deterministically from a splitmix64 sequence so that chunk
/// boundaries are stable across builds and platforms.
const BUZ_TABLE: [u64; 256] = build_table();

const fn build_table() -> [u64; 256] {
    let mut table = [0u64; 256];
    let mut state: u64 = 0x5312_ACE0_F00D_1CE5;
    let mut i = 0;
    while i < 256 {
        state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        table[i] = z ^ (z >> 31);
        i += 1;
    }
    table
}

// Rotation applied to the byte leaving the window: one left-rotate per
// byte pushed since it entered, i.e. WINDOW_SIZE rotations.
const OUT_ROTATE: u32 = (WINDOW_SIZE % 64) as u32;

/// Incremental buzhash over the last [`WINDOW_SIZE`] bytes.
#[derive(Debug, Clone)]
pub struct RollingHash {
    window: [u8; WINDOW_SIZE],
    filled: usize,
    pos: usize,
    hash: u64,
}

impl RollingHash {
    /// Create an empty rolling hash.
    pub fn new() -> Self {
        Self {
            window: [0u8; WINDOW_SIZE],
            filled: 0,
            pos: 0,
            hash: 0,
        }
    }

    /// Push one byte into the window and return the updated hash value.
    pub fn push(&mut self, byte: u8) -> u64 {
        self.hash = self.hash.rotate_left(1) ^ BUZ_TABLE[byte as usize];

        if self.filled == WINDOW_SIZE {
            let out = self.window[self.pos];
            self.hash ^= BUZ_TABLE[out as usize].rotate_left(OUT_ROTATE);
        } else {
            self.filled += 1;
        }

        self.window[self.pos] = byte;
        self.pos = (self.pos + 1) % WINDOW_SIZE;
        self.hash
    }

    /// Current hash value.
    pub fn value(&self) -> u64 {
        self.hash
    }
}

impl Default for RollingHash {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_deterministic() {
        let data = b"the quick brown fox jumps over the lazy dog, repeatedly and often";
        let mut a = RollingHash::new();
        let mut b = RollingHash::new();
        for &byte in data.iter() {
            assert_eq!(a.push(byte), b.push(byte));
        }
    }

    #[test]
    fn test_value_depends_only_on_window() {
        // Two streams with different prefixes but identical last WINDOW_SIZE
        // bytes must converge to the same hash value.
        let tail: Vec<u8> = (0..WINDOW_SIZE as u8).map(|i| i.wrapping_mul(37)).collect();

        let mut a = RollingHash::new();
        for &b in [0xAAu8; 100].iter().chain(tail.iter()) {
            a.push(b);
        }

        let mut b = RollingHash::new();
        for &byte in [0x55u8; 355].iter().chain(tail.iter()) {
            b.push(byte);
        }

        assert_eq!(a.value(), b.value());
    }

    #[test]
    fn test_different_windows_differ() {
        let mut a = RollingHash::new();
        let mut b = RollingHash::new();
        for i in 0..WINDOW_SIZE {
            a.push(i as u8);
            b.push((i as u8).wrapping_add(1));
        }
        assert_ne!(a.value(), b.value());
    }

    #[test]
    fn test_table_entries_distinct() {
        for i in 0..256 {
            for j in (i + 1)..256 {
                assert_ne!(BUZ_TABLE[i], BUZ_TABLE[j], "table collision at {i}/{j}");
            }
        }
    }
}
