//! Stable presentation shuffles
//!
//! Computed once per question when a session starts and held for the
//! session lifetime. Uses rand's in-place Fisher–Yates.

use rand::seq::SliceRandom;
use rand::Rng;

/// Random permutation of `0..len`
pub fn presentation_order<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Vec<usize> {
    let mut order: Vec<usize> = (0..len).collect();
    order.shuffle(rng);
    order
}

/// Shuffled copy of `items`
pub fn shuffled<T: Clone, R: Rng + ?Sized>(items: &[T], rng: &mut R) -> Vec<T> {
    let mut out = items.to_vec();
    out.shuffle(rng);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_order_is_permutation() {
        let mut rng = StdRng::seed_from_u64(7);
        for len in [0usize, 1, 2, 4, 9] {
            let mut order = presentation_order(len, &mut rng);
            order.sort_unstable();
            assert_eq!(order, (0..len).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_same_seed_same_order() {
        let a = presentation_order(6, &mut StdRng::seed_from_u64(42));
        let b = presentation_order(6, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_shuffled_keeps_elements() {
        let items = vec!["stocks", "bonds", "gold", "cash"];
        let mut out = shuffled(&items, &mut StdRng::seed_from_u64(1));
        out.sort_unstable();
        let mut expected = items.clone();
        expected.sort_unstable();
        assert_eq!(out, expected);
    }
}
