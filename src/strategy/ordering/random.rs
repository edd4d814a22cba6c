use rand::{SeedableRng, seq::SliceRandom};
use rand_xoshiro::Xoshiro256StarStar;

use crate::ordering::{OrderItem, OrderingStrategy};

/// Shuffle with a generator freshly seeded from the run seed.
///
/// Reseeding on every call means a sibling list is shuffled the same way no
/// matter how many lists were ordered before it, so a failing order can be
/// reproduced by running again with the same seed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RandomOrdering;

impl OrderingStrategy for RandomOrdering {
    fn order(&self, items: &mut [OrderItem<'_>], seed: u64) {
        let mut rng = Xoshiro256StarStar::seed_from_u64(seed);
        items.shuffle(&mut rng);
    }
}
