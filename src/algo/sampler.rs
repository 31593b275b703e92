//! Stochastic action selection from a categorical distribution

use log::warn;
use rand::{
    distributions::{Distribution, WeightedIndex},
    Rng,
};

/// Draw an action index with probability proportional to `probs[index]`
///
/// A slot with probability zero is never chosen, so a one-hot distribution
/// always yields its hot index. When the weights cannot be sampled (all zero,
/// negative or non-finite) the most probable finite slot is returned instead.
pub fn sample_action<R: Rng + ?Sized>(probs: &[f32], rng: &mut R) -> usize {
    match WeightedIndex::new(probs) {
        Ok(dist) => dist.sample(rng),
        Err(err) => {
            warn!("cannot sample from {probs:?} ({err}), falling back to arg-max");
            argmax(probs)
        }
    }
}

/// Index of the largest finite value, 0 when there is none
pub fn argmax(values: &[f32]) -> usize {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .fold(None, |best: Option<(usize, f32)>, (i, &v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
        .unwrap_or(0)
}
