use byteorder::{BigEndian, ByteOrder};

/// A closed interval `[from, to]` over u64, used by the OPE scheme to track
/// the shrinking domain and target intervals of the halving recursion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub from: u64,
    pub to: u64,
}

impl Range {
    /// Construction with `from > to` is a programmer error.
    pub fn new(from: u64, to: u64) -> Self {
        assert!(from <= to, "range is empty");
        Range { from, to }
    }

    /// Number of values in the interval. Returned as u128 so the full u64
    /// range does not wrap; always at least 1.
    pub fn size(&self) -> u128 {
        (self.to - self.from) as u128 + 1
    }

    pub fn contains(&self, value: u64) -> bool {
        self.from <= value && value <= self.to
    }

    pub fn to_bytes(&self) -> [u8; 16] {
        let mut out = [0u8; 16];
        BigEndian::write_u64(&mut out[0..8], self.from);
        BigEndian::write_u64(&mut out[8..16], self.to);
        out
    }
}
