//! Krichevsky–Trofimov estimator.
//!
//! The add-½ rule: after `c0` zeros and `c1` ones, the next bit is `b` with
//! probability `(c_b + 1/2) / (c0 + c1 + 1)`.

use super::prob::Prob;

/// Conditional KT probability that the next bit is `bit`, given the counts.
pub fn update_factor(c0: u64, c1: u64, bit: u8) -> Prob {
    let count = if bit == 0 { c0 } else { c1 };
    Prob::from_ratio(2 * count + 1, 2 * (c0 + c1) + 2)
}

/// KT block probability of any sequence with `c0` zeros and `c1` ones,
/// computed directly from the counts.
///
/// The running product kept by the tree is order independent, so it agrees
/// with this up to rounding.
pub fn block_estimate(c0: u64, c1: u64) -> Prob {
    let mut p = Prob::ONE;
    for i in 0..c0 {
        p = p.mul(update_factor(i, 0, 0));
    }
    for j in 0..c1 {
        p = p.mul(update_factor(c0, j, 1));
    }
    p
}
