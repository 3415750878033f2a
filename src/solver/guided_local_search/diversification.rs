use rand::seq::{IteratorRandom, SliceRandom};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// Kick the current tour out of its basin: reverse a random segment of a random
/// route and, with several vehicles, move one random stop to another vehicle.
pub fn perturb(routes: &mut [Vec<usize>], rng: &mut ChaCha8Rng) {
    let reversible: Vec<usize> = (0..routes.len()).filter(|&r| routes[r].len() >= 2).collect();
    if let Some(&r) = reversible.choose(rng) {
        let mut pair: Vec<usize> = (0..routes[r].len()).choose_multiple(rng, 2);
        pair.sort_unstable();
        routes[r][pair[0]..=pair[1]].reverse();
    }

    if routes.len() < 2 {
        return;
    }
    let non_empty: Vec<usize> = (0..routes.len()).filter(|&r| !routes[r].is_empty()).collect();
    if let Some(&from) = non_empty.choose(rng) {
        let to = (from + rng.gen_range(1..routes.len())) % routes.len();
        let index = rng.gen_range(0..routes[from].len());
        let stop = routes[from].remove(index);
        let position = rng.gen_range(0..=routes[to].len());
        routes[to].insert(position, stop);
    }
}

/// Jump back to the best tour when the search has drifted away from it.
/// Returns whether the current tour changed.
pub fn perform_rollback(current: &mut Vec<Vec<usize>>, best: &[Vec<usize>]) -> bool {
    if current.as_slice() == best {
        return false;
    }
    *current = best.to_vec();
    true
}
