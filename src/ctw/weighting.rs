//! Context-tree weighting rule.

use super::prob::Prob;

/// Weighted probability of an internal node:
/// `1/2 * kt + 1/2 * p(left) * p(right)`.
///
/// Both children must already be current.
pub fn weigh(kt: Prob, left: Prob, right: Prob) -> Prob {
    kt.half().add(left.mul(right).half())
}
