//! Extended-range probabilities.
//!
//! Block probabilities in a context tree shrink geometrically with the number
//! of observed bits, so after a few thousand bits they leave the range of any
//! native float. [`Prob`] keeps a normalized 64-bit mantissa and a 64-bit
//! binary exponent and does all of its arithmetic on integers. Encoder and
//! decoder therefore compute identical values on every platform.

use std::cmp::Ordering;

const TOP_BIT: u64 = 1 << 63;

/// A strictly positive number `mantissa * 2^exponent`.
///
/// The mantissa always has its top bit set. Results are truncated towards
/// zero after every operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Prob {
    mantissa: u64,
    exponent: i64,
}

impl Prob {
    /// Exactly one.
    pub const ONE: Prob = Prob {
        mantissa: TOP_BIT,
        exponent: -63,
    };

    /// Exactly one half.
    pub const HALF: Prob = Prob {
        mantissa: TOP_BIT,
        exponent: -64,
    };

    /// `num / den`, truncated to 64 significant bits.
    ///
    /// # Panics
    /// Panics in debug builds if either argument is zero.
    pub fn from_ratio(num: u64, den: u64) -> Prob {
        debug_assert!(num > 0 && den > 0, "ratio {num}/{den} is not positive");
        let shift = num.leading_zeros() + 64;
        let scaled = (num as u128) << shift;
        normalize(scaled / den as u128, -(shift as i64))
    }

    /// Halve without rounding.
    pub fn half(self) -> Prob {
        Prob {
            mantissa: self.mantissa,
            exponent: self.exponent - 1,
        }
    }

    /// Product of two probabilities.
    pub fn mul(self, other: Prob) -> Prob {
        let wide = self.mantissa as u128 * other.mantissa as u128;
        normalize(wide, self.exponent + other.exponent)
    }

    /// Quotient of two probabilities.
    pub fn div(self, other: Prob) -> Prob {
        let wide = ((self.mantissa as u128) << 64) / other.mantissa as u128;
        normalize(wide, self.exponent - other.exponent - 64)
    }

    /// Sum of two probabilities.
    pub fn add(self, other: Prob) -> Prob {
        let (big, small) = if self >= other {
            (self, other)
        } else {
            (other, self)
        };
        // Mantissas are normalized, so the larger value has the larger exponent.
        let gap = (big.exponent - small.exponent) as u64;
        let hi = (big.mantissa as u128) << 63;
        let lo = if gap >= 127 {
            0
        } else {
            ((small.mantissa as u128) << 63) >> gap
        };
        normalize(hi + lo, big.exponent - 63)
    }

    /// `floor(self * 2^bits)`, saturating at `u64::MAX`.
    pub fn to_fixed(self, bits: u32) -> u64 {
        let shift = self.exponent + bits as i64;
        if shift > 0 {
            u64::MAX
        } else if shift == 0 {
            self.mantissa
        } else if shift <= -64 {
            0
        } else {
            self.mantissa >> (-shift)
        }
    }

    /// Base-2 logarithm. Diagnostics only; never feeds the coder.
    pub fn log2(self) -> f64 {
        (self.mantissa as f64).log2() + self.exponent as f64
    }

    /// Nearest `f64`. Underflows to zero for tiny values; diagnostics only.
    pub fn to_f64(self) -> f64 {
        self.log2().exp2()
    }
}

impl Default for Prob {
    fn default() -> Self {
        Prob::ONE
    }
}

impl Ord for Prob {
    fn cmp(&self, other: &Self) -> Ordering {
        self.exponent
            .cmp(&other.exponent)
            .then(self.mantissa.cmp(&other.mantissa))
    }
}

impl PartialOrd for Prob {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn normalize(value: u128, exponent: i64) -> Prob {
    debug_assert!(value != 0);
    let top = 127 - value.leading_zeros() as i64;
    let shift = top - 63;
    let mantissa = if shift >= 0 {
        (value >> shift) as u64
    } else {
        (value << (-shift)) as u64
    };
    Prob {
        mantissa,
        exponent: exponent + shift,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_ratios() {
        assert_eq!(Prob::from_ratio(1, 2), Prob::HALF);
        assert_eq!(Prob::from_ratio(3, 3), Prob::ONE);
        assert_eq!(Prob::HALF.add(Prob::HALF), Prob::ONE);
        assert_eq!(Prob::ONE.half(), Prob::HALF);
        assert_eq!(Prob::HALF.mul(Prob::HALF), Prob::from_ratio(1, 4));
        assert_eq!(Prob::from_ratio(1, 4).div(Prob::HALF), Prob::HALF);
    }

    #[test]
    fn test_ordering() {
        let third = Prob::from_ratio(1, 3);
        let quarter = Prob::from_ratio(1, 4);
        assert!(quarter < third);
        assert!(third < Prob::HALF);
        assert!(Prob::HALF < Prob::ONE);
    }

    #[test]
    fn test_no_underflow() {
        let mut p = Prob::ONE;
        for _ in 0..100_000 {
            p = p.mul(Prob::from_ratio(1, 3));
        }
        let expected = -100_000.0 * 3f64.log2();
        assert!((p.log2() - expected).abs() < 1e-6);
        assert_eq!(p.to_f64(), 0.0);
    }

    #[test]
    fn test_add_disjoint_scales() {
        let tiny = Prob::from_ratio(1, 1 << 40).mul(Prob::from_ratio(1, 1 << 40));
        assert_eq!(Prob::HALF.add(tiny), Prob::HALF);
        assert_eq!(tiny.add(Prob::HALF), Prob::HALF);
        let sum = Prob::from_ratio(1, 3).add(Prob::from_ratio(1, 6));
        assert!((sum.to_f64() - 0.5).abs() < 1e-15);
    }

    #[test]
    fn test_to_fixed() {
        assert_eq!(Prob::HALF.to_fixed(24), 1 << 23);
        assert_eq!(Prob::from_ratio(1, 3).to_fixed(24), (1 << 24) / 3);
        assert_eq!(Prob::from_ratio(1, 1 << 40).to_fixed(24), 0);
        assert_eq!(Prob::ONE.to_fixed(0), 1);
    }
}
