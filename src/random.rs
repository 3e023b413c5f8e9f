//! Small deterministic pseudo random source for effects.

/// Linear congruential generator
///
/// Not suitable for anything but visuals. Seeded explicitly so effects are
/// reproducible under test.
#[derive(Debug, Clone)]
pub struct Random8 {
    seed: u64,
}

impl Random8 {
    pub const fn new(seed: u64) -> Self {
        Self { seed }
    }

    #[allow(clippy::cast_possible_truncation)]
    pub const fn next_u32(&mut self) -> u32 {
        self.seed = self
            .seed
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1);
        (self.seed >> 32) as u32
    }

    #[allow(clippy::cast_possible_truncation)]
    pub const fn next_u8(&mut self) -> u8 {
        (self.next_u32() >> 24) as u8
    }

    /// Random value in `[low, high)`; returns `low` for an empty range
    #[allow(clippy::cast_possible_truncation)]
    pub const fn range8(&mut self, low: u8, high: u8) -> u8 {
        if high <= low {
            return low;
        }
        let span = (high - low) as u32;
        low + ((self.next_u8() as u32 * span) >> 8) as u8
    }
}
