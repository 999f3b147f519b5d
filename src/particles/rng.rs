//! Small deterministic generator for particle jitter.

/// xorshift32. Not suitable for anything but visual noise.
#[derive(Debug, Clone)]
pub struct ParticleRng {
    state: u32,
}

impl ParticleRng {
    /// Seed 0 would lock xorshift at zero, so it is replaced.
    pub fn new(seed: u32) -> Self {
        Self {
            state: if seed == 0 { 0x9E37_79B9 } else { seed },
        }
    }

    #[allow(missing_docs)]
    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    /// A value in `0..n`. `n` must be nonzero.
    pub fn below(&mut self, n: u32) -> u32 {
        self.next_u32() % n
    }
}

impl Default for ParticleRng {
    fn default() -> Self {
        Self::new(0xDEAD_BEEF)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_seed_still_produces_values() {
        let mut rng = ParticleRng::new(0);
        assert_ne!(rng.next_u32(), 0);
    }

    #[test]
    fn same_seed_same_sequence() {
        let mut a = ParticleRng::new(42);
        let mut b = ParticleRng::new(42);
        for _ in 0..16 {
            assert_eq!(a.below(360), b.below(360));
        }
    }
}
