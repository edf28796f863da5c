//! Seeded sampling helpers shared by bosses and power-ups

use rand::Rng;

#[inline]
fn usable(weight: f32) -> bool {
    weight.is_finite() && weight > 0.0
}

/// Pick one item in proportion to its weight
///
/// Items with zero, negative or non-finite weight are never chosen. Returns
/// `None` when no item has a usable weight.
pub fn weighted_choice<T: Copy, R: Rng + ?Sized>(table: &[(T, f32)], rng: &mut R) -> Option<T> {
    let total: f32 = table.iter().map(|&(_, w)| w).filter(|&w| usable(w)).sum();
    if !usable(total) {
        return None;
    }

    let mut roll = rng.random::<f32>() * total;
    let mut last = None;
    for &(item, weight) in table {
        if !usable(weight) {
            continue;
        }
        if roll < weight {
            return Some(item);
        }
        roll -= weight;
        last = Some(item);
    }
    // Float rounding can leave the roll just past the final bucket
    last
}

/// Choose `count` distinct items (partial Fisher-Yates)
pub fn sample_without_replacement<T: Copy, R: Rng + ?Sized>(
    items: &[T],
    count: usize,
    rng: &mut R,
) -> Vec<T> {
    let mut pool = items.to_vec();
    let count = count.min(pool.len());
    for i in 0..count {
        let j = rng.random_range(i..pool.len());
        pool.swap(i, j);
    }
    pool.truncate(count);
    pool
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_zero_weight_never_chosen() {
        let mut rng = Pcg32::seed_from_u64(11);
        let table = [('a', 1.0), ('b', 0.0), ('c', 3.0), ('d', f32::NAN)];
        for _ in 0..10_000 {
            let pick = weighted_choice(&table, &mut rng).unwrap();
            assert!(pick == 'a' || pick == 'c');
        }
    }

    #[test]
    fn test_weights_are_proportional() {
        let mut rng = Pcg32::seed_from_u64(3);
        let table = [(0usize, 1.0), (1usize, 3.0)];
        let mut counts = [0u32; 2];
        for _ in 0..20_000 {
            counts[weighted_choice(&table, &mut rng).unwrap()] += 1;
        }
        let share = counts[1] as f32 / 20_000.0;
        assert!((share - 0.75).abs() < 0.02, "share {share}");
    }

    #[test]
    fn test_empty_table() {
        let mut rng = Pcg32::seed_from_u64(1);
        assert_eq!(weighted_choice::<u8, _>(&[], &mut rng), None);
        assert_eq!(weighted_choice(&[(1u8, 0.0)], &mut rng), None);
    }

    #[test]
    fn test_sample_distinct() {
        let mut rng = Pcg32::seed_from_u64(5);
        let items: Vec<u32> = (0..20).collect();
        let mut picked = sample_without_replacement(&items, 8, &mut rng);
        assert_eq!(picked.len(), 8);
        picked.sort_unstable();
        picked.dedup();
        assert_eq!(picked.len(), 8);

        assert_eq!(sample_without_replacement(&items, 50, &mut rng).len(), 20);
    }
}
