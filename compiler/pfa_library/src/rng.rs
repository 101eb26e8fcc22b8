//! Per-instance random source.
//!
//! SplitMix64: small state, reproducible on every platform. A document's
//! `randseed` fixes the stream; each instance of a program derives its own
//! stream from the seed and its instance index.

/// Golden-ratio increment; also the replacement for a zero seed.
const GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

/// A deterministic pseudo-random stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rng {
    state: u64,
}

impl Rng {
    #[inline]
    pub const fn new(seed: u64) -> Self {
        let state = if seed == 0 { GAMMA } else { seed };
        Rng { state }
    }

    /// Stream for one instance of a seeded program.
    pub fn for_instance(seed: i64, instance: u32) -> Self {
        #[allow(clippy::cast_sign_loss, reason = "the seed's bit pattern is what matters")]
        let seed = seed as u64;
        Rng::new(mix(seed ^ mix(u64::from(instance).wrapping_add(GAMMA))))
    }

    /// Stream for an unseeded instance.
    pub fn from_entropy(instance: u32) -> Self {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |d| d.as_nanos());
        #[allow(clippy::cast_possible_truncation, reason = "low bits are enough for a seed")]
        let nanos = nanos as u64;
        Rng::new(mix(nanos ^ u64::from(instance).rotate_left(32)))
    }

    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(GAMMA);
        mix(self.state)
    }

    /// Uniform `f64` in `[0, 1)`.
    #[inline]
    #[allow(clippy::cast_precision_loss, reason = "53 significant bits by construction")]
    pub fn uniform(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Uniform integer in `[low, high)`. Requires `low < high`.
    pub fn range_i64(&mut self, low: i64, high: i64) -> i64 {
        #[allow(clippy::cast_sign_loss, reason = "high > low so the span is positive")]
        let span = high.wrapping_sub(low) as u64;
        #[allow(clippy::cast_possible_wrap, reason = "offset < span fits back into the range")]
        let offset = (self.next_u64() % span) as i64;
        low.wrapping_add(offset)
    }
}

#[inline]
const fn mix(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
