use std::str::FromStr;
use std::time::Duration;

use ndarray::prelude::*;

use super::distance_matrix::DistanceMatrix;
use super::entities::{check_count, Building, Service};
use super::errors::ProvisionError;
use super::gravity::GravityStrategy;
use super::linear::LinearStrategy;


pub static DEFAULT_MAX_ROUNDS: usize = 64;
pub static DEFAULT_SEED: u64 = 0;
pub static DEFAULT_SOLVER_TIMEOUT_S: u64 = 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AllocationMethod {
    Gravity,
    Linear,
}

impl FromStr for AllocationMethod {
    type Err = ProvisionError;

    fn from_str(ss: &str) -> Result<AllocationMethod, ProvisionError> {
        match ss {
            "gravity" => Ok(AllocationMethod::Gravity),
            "linear" => Ok(AllocationMethod::Linear),
            other => Err(ProvisionError::UnknownMethod(String::from(other))),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EngineSettings {
    pub max_rounds: usize,
    pub seed: u64,
    pub solver_timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> EngineSettings {
        EngineSettings {
            max_rounds: DEFAULT_MAX_ROUNDS,
            seed: DEFAULT_SEED,
            solver_timeout: Duration::from_secs(DEFAULT_SOLVER_TIMEOUT_S),
        }
    }
}

impl AllocationMethod {
    pub fn strategy(&self, settings: &EngineSettings) -> Box<dyn AllocationStrategy> {
        match self {
            AllocationMethod::Gravity => Box::new(GravityStrategy::new(settings.seed)),
            AllocationMethod::Linear => Box::new(LinearStrategy::new(settings.solver_timeout)),
        }
    }
}

/// What a strategy gets to see of the working state in one round.  Remainders are indexed by
/// row (service) and column (building) of the full matrix; only the active ones matter.
pub struct RoundView<'a> {
    pub distances: &'a Array2<f64>,
    pub active_services: &'a [usize],
    pub active_buildings: &'a [usize],
    pub capacity_left: &'a [u64],
    pub demand_left: &'a [u64],
    pub selection_range: f64,
}

impl<'a> RoundView<'a> {
    /// Unreachable and NaN costs are never in range, even once the range itself is infinite.
    pub fn in_range(&self, service_idx: usize, building_idx: usize) -> bool {
        let dist = self.distances[[service_idx, building_idx]];
        dist.is_finite() && dist <= self.selection_range
    }
}

/// A way of assigning flow for one round of the expanding-radius loop.
pub trait AllocationStrategy {
    fn name(&self) -> &'static str;

    /// The distances the strategy works on, derived once per run from the input matrix.
    fn working_distances(&self, distances: &Array2<f64>) -> Array2<f64> {
        distances.clone()
    }

    /// Returns this round's flows, shaped like the full matrix.  Flows may only be placed on
    /// active, in-range pairs, and must respect the remaining capacities and demands.  An error
    /// means the round could not be computed; the engine counts it as moving nothing.
    fn allocate_round(&self, view: &RoundView) -> Result<Array2<u64>, String>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    /// every service is full or every building is served
    Converged,
    /// the last round covered every reachable pair and moved nothing, which may be because it
    /// failed; see `AllocationOutcome::failed_rounds`
    Exhausted,
    RoundLimit,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AllocationOutcome {
    /// accumulated flows, rows are services and columns buildings, in the matrix's order
    pub destination: Array2<u64>,
    pub rounds: usize,
    pub termination: Termination,
    /// the selection range used in the last round
    pub final_range: f64,
    /// rounds whose strategy failed and contributed nothing
    pub failed_rounds: usize,
}

struct AllocationState {
    service_ids: Vec<i64>,
    building_ids: Vec<i64>,
    distances: Array2<f64>,
    capacity: Vec<u64>,
    demand: Vec<u64>,
    capacity_left: Vec<u64>,
    demand_left: Vec<u64>,
    active_services: Vec<usize>,
    active_buildings: Vec<usize>,
    destination: Array2<u64>,
    selection_range: f64,
}

impl AllocationState {
    fn new(services: &[Service], buildings: &[Building], matrix: &DistanceMatrix,
           distances: Array2<f64>, threshold: f64) -> AllocationState {
        let capacity: Vec<u64> = services.iter().map(|ss| ss.capacity).collect();
        let demand: Vec<u64> = buildings.iter().map(|bb| bb.demand).collect();
        let mut state = AllocationState {
            service_ids: matrix.service_ids().to_vec(),
            building_ids: matrix.building_ids().to_vec(),
            destination: Array::zeros(distances.dim()),
            distances,
            capacity_left: capacity.clone(),
            demand_left: demand.clone(),
            capacity,
            demand,
            active_services: (0..services.len()).collect(),
            active_buildings: (0..buildings.len()).collect(),
            selection_range: threshold,
        };
        state.drop_exhausted();
        state
    }

    fn view(&self) -> RoundView<'_> {
        RoundView {
            distances: &self.distances,
            active_services: &self.active_services,
            active_buildings: &self.active_buildings,
            capacity_left: &self.capacity_left,
            demand_left: &self.demand_left,
            selection_range: self.selection_range,
        }
    }

    fn is_empty(&self) -> bool {
        self.active_services.is_empty() || self.active_buildings.is_empty()
    }

    fn max_active_finite_distance(&self) -> Option<f64> {
        let mut max_dist: Option<f64> = None;
        for &ii in &self.active_services {
            for &jj in &self.active_buildings {
                let dist = self.distances[[ii, jj]];
                if dist.is_finite() && max_dist.map_or(true, |md| dist > md) {
                    max_dist = Some(dist);
                }
            }
        }
        max_dist
    }

    /// Recomputes what is left from the accumulated flows rather than from the round's.
    fn update_remainders(&mut self) -> Result<(), ProvisionError> {
        let allocated = self.destination.sum_axis(Axis(1));
        for (ii, total) in allocated.iter().enumerate() {
            self.capacity_left[ii] = self.capacity[ii].checked_sub(*total).ok_or(
                ProvisionError::Overallocation {
                    kind: "service",
                    id: self.service_ids[ii],
                    allocated: *total,
                    total: self.capacity[ii],
                })?;
        }
        let supplied = self.destination.sum_axis(Axis(0));
        for (jj, total) in supplied.iter().enumerate() {
            self.demand_left[jj] = self.demand[jj].checked_sub(*total).ok_or(
                ProvisionError::Overallocation {
                    kind: "building",
                    id: self.building_ids[jj],
                    allocated: *total,
                    total: self.demand[jj],
                })?;
        }
        Ok(())
    }

    fn drop_exhausted(&mut self) {
        let capacity_left = &self.capacity_left;
        self.active_services.retain(|ii| capacity_left[*ii] > 0);
        let demand_left = &self.demand_left;
        self.active_buildings.retain(|jj| demand_left[*jj] > 0);
    }
}

/// Runs the expanding-radius allocation loop to completion.
///
/// `services` and `buildings` must be in the order of the matrix's rows and columns.
pub fn allocate(strategy: &dyn AllocationStrategy, services: &[Service], buildings: &[Building],
                matrix: &DistanceMatrix, threshold: f64, max_rounds: usize)
                -> Result<AllocationOutcome, ProvisionError> {
    allocate_with_observer(strategy, services, buildings, matrix, threshold, max_rounds,
                           |_, _| ())
}

/// Like `allocate`, but calls `observer` with the round number and accumulated flows after
/// every round.
pub fn allocate_with_observer<FF>(strategy: &dyn AllocationStrategy, services: &[Service],
                                  buildings: &[Building], matrix: &DistanceMatrix,
                                  threshold: f64, max_rounds: usize, mut observer: FF)
                                  -> Result<AllocationOutcome, ProvisionError>
    where FF: FnMut(usize, &Array2<u64>)
{
    if !(threshold.is_finite() && threshold > 0.) {
        return Err(ProvisionError::InvalidThreshold(threshold));
    }
    let expected = (services.len(), buildings.len());
    let ids_match = matrix.service_ids().iter().eq(services.iter().map(|ss| &ss.id)) &&
        matrix.building_ids().iter().eq(buildings.iter().map(|bb| &bb.id));
    if matrix.values().dim() != expected || !ids_match {
        return Err(ProvisionError::MatrixShape {expected, got: matrix.values().dim()});
    }

    for service in services {
        check_count("service", service.id, service.capacity)?;
    }
    for building in buildings {
        check_count("building", building.id, building.demand)?;
    }

    let distances = strategy.working_distances(matrix.values());
    let mut state = AllocationState::new(services, buildings, matrix, distances, threshold);
    log::info!("{} allocation of {} units of demand to {} units of capacity", strategy.name(),
               state.demand_left.iter().sum::<u64>(), state.capacity_left.iter().sum::<u64>());

    let mut rounds = 0;
    let mut failed_rounds = 0;
    let mut final_range = state.selection_range;
    let termination = loop {
        if state.is_empty() {
            break Termination::Converged;
        }
        if rounds >= max_rounds {
            log::warn!("stopping allocation after {} rounds", rounds);
            break Termination::RoundLimit;
        }

        let max_dist = state.max_active_finite_distance();
        let (round, failed) = match strategy.allocate_round(&state.view()) {
            Ok(round) => (round, false),
            Err(msg) => {
                log::warn!("{} round {} failed, nothing allocated: {}", strategy.name(),
                           rounds + 1, msg);
                (Array::zeros(state.distances.dim()), true)
            }
        };
        if failed {
            failed_rounds += 1;
        }
        let round_flow = round.sum();
        state.destination += &round;
        state.update_remainders()?;
        state.drop_exhausted();
        rounds += 1;
        final_range = state.selection_range;
        log::debug!("round {} at range {}: {} units allocated, {} services and {} buildings left",
                    rounds, state.selection_range, round_flow, state.active_services.len(),
                    state.active_buildings.len());
        observer(rounds, &state.destination);

        let covered_all = max_dist.map_or(true, |md| state.selection_range >= md);
        state.selection_range *= 2.;
        if round_flow == 0 && covered_all && !state.is_empty() {
            if failed {
                log::warn!("stopping after a failed round, so pairs in range may still be able \
                            to take flow");
            }
            break Termination::Exhausted;
        }
    };

    log::info!("allocation ended ({:?}) after {} rounds ({} failed): {} demand and {} capacity \
                left", termination, rounds, failed_rounds, state.demand_left.iter().sum::<u64>(),
               state.capacity_left.iter().sum::<u64>());
    Ok(AllocationOutcome {
        destination: state.destination,
        rounds,
        termination,
        final_range,
        failed_rounds,
    })
}
