//! The coding interval.
//!
//! `[low, high)` is kept in 32-bit fixed point. Whenever the interval fits
//! inside one half of `[0, 1)`, or inside the middle half, it is doubled back
//! out; the coder records the doubling as an emitted (or pending) bit, so the
//! real interval is never rounded. After renormalization the width exceeds a
//! quarter, which leaves room for 24-bit probabilities on both sides of every
//! split.

use crate::ctw::Prob;

/// Bits in the interval registers.
pub const CODE_BITS: u32 = 32;
/// Bits of precision for the split probability.
pub const PROB_BITS: u32 = 24;

const FULL: u64 = 1 << CODE_BITS;
pub(crate) const HALF: u64 = FULL / 2;
const QUARTER: u64 = FULL / 4;
const PROB_ONE: u64 = 1 << PROB_BITS;

/// One renormalization step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rescale {
    /// The interval lies in `[0, 1/2)`: the next code bit is 0.
    Lower,
    /// The interval lies in `[1/2, 1)`: the next code bit is 1.
    Upper,
    /// The interval lies in `[1/4, 3/4)`: the next code bit is not yet known.
    Middle,
}

/// Current `[low, high)` in register coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodingInterval {
    low: u64,
    high: u64,
    // Doublings applied so far; the real width is (high - low) / 2^(32 + scale).
    scale: u64,
}

impl CodingInterval {
    /// The unit interval.
    pub fn new() -> Self {
        CodingInterval {
            low: 0,
            high: FULL,
            scale: 0,
        }
    }

    /// Lower bound register.
    pub fn low(&self) -> u64 {
        self.low
    }

    /// Upper bound register (exclusive, at most `2^32`).
    pub fn high(&self) -> u64 {
        self.high
    }

    /// Lower bound relative to the current register window, in `[0, 1)`.
    pub fn low_fraction(&self) -> f64 {
        self.low as f64 / FULL as f64
    }

    /// Upper bound relative to the current register window, in `(0, 1]`.
    pub fn high_fraction(&self) -> f64 {
        self.high as f64 / FULL as f64
    }

    /// `log2` of the real width. Never increases.
    pub fn log2_width(&self) -> f64 {
        ((self.high - self.low) as f64).log2() - CODE_BITS as f64 - self.scale as f64
    }

    /// Boundary between the 0 and 1 sub-intervals for `P(1) = p1`:
    /// `low + (1 - p1) * (high - low)`, with `p1` quantized to 24 bits.
    pub fn split(&self, p1: Prob) -> u64 {
        let q1 = quantize(p1);
        self.low + (((self.high - self.low) * (PROB_ONE - q1)) >> PROB_BITS)
    }

    /// Keep the sub-interval of `bit` below or above `mid`.
    pub fn narrow(&mut self, bit: u8, mid: u64) {
        debug_assert!(self.low < mid && mid < self.high);
        if bit == 0 {
            self.high = mid;
        } else {
            self.low = mid;
        }
    }

    /// The step that renormalization should apply next, if any.
    pub fn next_rescale(&self) -> Option<Rescale> {
        if self.high <= HALF {
            Some(Rescale::Lower)
        } else if self.low >= HALF {
            Some(Rescale::Upper)
        } else if self.low >= QUARTER && self.high <= HALF + QUARTER {
            Some(Rescale::Middle)
        } else {
            None
        }
    }

    /// Double the interval around the region named by `step`.
    pub fn apply(&mut self, step: Rescale) {
        let offset = rescale_offset(step);
        self.low = (self.low - offset) * 2;
        self.high = (self.high - offset) * 2;
        self.scale += 1;
    }
}

impl Default for CodingInterval {
    fn default() -> Self {
        Self::new()
    }
}

/// Amount subtracted from a register before doubling for `step`.
pub(crate) fn rescale_offset(step: Rescale) -> u64 {
    match step {
        Rescale::Lower => 0,
        Rescale::Upper => HALF,
        Rescale::Middle => QUARTER,
    }
}

fn quantize(p1: Prob) -> u64 {
    p1.to_fixed(PROB_BITS).clamp(1, PROB_ONE - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_even_split() {
        let interval = CodingInterval::new();
        assert_eq!(interval.split(Prob::HALF), HALF);
    }

    #[test]
    fn test_extreme_probabilities_keep_both_sides() {
        let interval = CodingInterval {
            low: QUARTER - 1,
            high: HALF + 1,
            scale: 0,
        };
        for p1 in [Prob::from_ratio(1, u64::MAX), Prob::from_ratio(u64::MAX - 1, u64::MAX)] {
            let mid = interval.split(p1);
            assert!(interval.low() < mid && mid < interval.high());
        }
    }

    #[test]
    fn test_rescale_steps() {
        let mut interval = CodingInterval::new();
        interval.narrow(0, HALF);
        assert_eq!(interval.next_rescale(), Some(Rescale::Lower));
        interval.apply(Rescale::Lower);
        assert_eq!((interval.low(), interval.high()), (0, FULL));

        interval.narrow(1, HALF + QUARTER);
        assert_eq!(interval.next_rescale(), Some(Rescale::Upper));
        interval.apply(Rescale::Upper);
        assert_eq!((interval.low(), interval.high()), (HALF, FULL));

        let mut middle = CodingInterval {
            low: QUARTER + 8,
            high: HALF + 8,
            scale: 0,
        };
        assert_eq!(middle.next_rescale(), Some(Rescale::Middle));
        middle.apply(Rescale::Middle);
        assert_eq!((middle.low(), middle.high()), (16, QUARTER * 2 + 16));
        assert_eq!(middle.next_rescale(), None);
    }

    #[test]
    fn test_width_is_preserved_by_rescaling() {
        let mut interval = CodingInterval::new();
        interval.narrow(1, HALF + QUARTER + QUARTER / 2);
        let before = interval.log2_width();
        while let Some(step) = interval.next_rescale() {
            interval.apply(step);
            assert_eq!(interval.log2_width(), before);
        }
        assert_eq!(before, -3.0);
    }
}
