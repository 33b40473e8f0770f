//! Bounded random selection of unique names.

use std::collections::BTreeSet;

use rand::{Rng, RngCore};

/// Pick `count` distinct names uniformly at random, returned sorted.
///
/// A `count` of zero, or one at least as large as the population, returns
/// the whole population. That check runs before sampling, so the draw loop
/// always has enough distinct candidates to terminate.
pub fn select_names(candidates: Vec<String>, count: usize, rng: &mut dyn RngCore) -> Vec<String> {
    let population: BTreeSet<String> = candidates.into_iter().collect();
    if count == 0 || population.len() <= count {
        return population.into_iter().collect();
    }

    let pool: Vec<String> = population.into_iter().collect();
    let mut chosen = BTreeSet::new();
    while chosen.len() < count {
        let index = rng.random_range(0..pool.len());
        chosen.insert(pool[index].as_str());
    }
    chosen.into_iter().map(str::to_string).collect()
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn sample_size_is_min_of_count_and_population(
            population in proptest::collection::hash_set("[a-z]{1,8}", 0..60),
            count in 0usize..80,
            seed in any::<u64>(),
        ) {
            let mut rng = StdRng::seed_from_u64(seed);
            let candidates: Vec<String> = population.iter().cloned().collect();
            let picked = select_names(candidates, count, &mut rng);

            let expected = if count == 0 { population.len() } else { count.min(population.len()) };
            prop_assert_eq!(picked.len(), expected);
            prop_assert!(picked.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(picked.iter().all(|p| population.contains(p)));
        }
    }
}
