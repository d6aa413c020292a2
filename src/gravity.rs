use ndarray::prelude::*;
use rand::distributions::{Distribution, WeightedIndex};
use rand::SeedableRng;
use rand_isaac::Isaac64Rng;

use super::allocation::{AllocationStrategy, RoundView};


/// Allocates each round by random draws weighted by remaining demand over distance, then trims
/// the result so that no building is oversupplied.
///
/// Every service and every building is drawn for with a freshly seeded generator, so a run is
/// reproducible for a given seed.
pub struct GravityStrategy {
    seed: u64,
}

impl GravityStrategy {
    pub fn new(seed: u64) -> GravityStrategy {
        GravityStrategy {seed}
    }

    /// Distributes each active service's remaining capacity over the in-range buildings.
    fn supply_flows(&self, view: &RoundView) -> Array2<u64> {
        let mut tentative = Array::zeros(view.distances.dim());
        for &ii in view.active_services {
            let candidates: Vec<usize> = view.active_buildings.iter()
                .filter(|jj| view.in_range(ii, **jj))
                .cloned()
                .collect();
            let weights: Vec<f64> = candidates.iter()
                .map(|jj| view.demand_left[*jj] as f64 / view.distances[[ii, *jj]])
                .collect();
            let counts = match self.draw_counts(&weights, view.capacity_left[ii]) {
                Some(counts) => counts,
                None => continue,
            };
            for (jj, count) in candidates.iter().zip(counts) {
                tentative[[ii, *jj]] = count;
            }
        }
        return tentative;
    }

    /// Resamples each building's incoming flows in proportion to the tentative ones, and keeps
    /// the smaller of the two for every pair.
    fn balance_flows(&self, view: &RoundView, tentative: &Array2<u64>) -> Array2<u64> {
        let mut round = Array::zeros(tentative.dim());
        for &jj in view.active_buildings {
            let sources: Vec<usize> = view.active_services.iter()
                .filter(|ii| tentative[[**ii, jj]] > 0)
                .cloned()
                .collect();
            let weights: Vec<f64> = sources.iter()
                .map(|ii| tentative[[*ii, jj]] as f64)
                .collect();
            let counts = match self.draw_counts(&weights, view.demand_left[jj]) {
                Some(counts) => counts,
                None => continue,
            };
            for (ii, count) in sources.iter().zip(counts) {
                round[[*ii, jj]] = tentative[[*ii, jj]].min(count);
            }
        }
        return round;
    }

    /// Tallies `num_draws` draws from the categorical distribution with the given weights.
    /// Returns None if nothing can be drawn.
    fn draw_counts(&self, weights: &[f64], num_draws: u64) -> Option<Vec<u64>> {
        if weights.is_empty() || num_draws == 0 {
            return None;
        }
        let dist = WeightedIndex::new(weights).ok()?;
        let mut rng = Isaac64Rng::seed_from_u64(self.seed);
        let mut counts = vec![0; weights.len()];
        for _ in 0..num_draws {
            counts[dist.sample(&mut rng)] += 1;
        }
        Some(counts)
    }
}

impl AllocationStrategy for GravityStrategy {
    fn name(&self) -> &'static str {
        "gravity"
    }

    /// Shifts every cost by one, so that colocated pairs don't divide by zero.  The selection
    /// range is compared against the shifted costs too.
    fn working_distances(&self, distances: &Array2<f64>) -> Array2<f64> {
        let mut shifted = distances.clone();
        shifted.par_mapv_inplace(|xx| xx + 1.);
        shifted
    }

    fn allocate_round(&self, view: &RoundView) -> Result<Array2<u64>, String> {
        let tentative = self.supply_flows(view);
        let round = self.balance_flows(view, &tentative);
        log::debug!("gravity round kept {} of {} tentative units", round.sum(), tentative.sum());
        Ok(round)
    }
}
