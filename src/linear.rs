use std::collections::BTreeMap;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use good_lp::{default_solver, variable, Expression, ProblemVariables, Solution, SolverModel,
              Variable};
use itertools::iproduct;
use ndarray::prelude::*;

use super::allocation::{AllocationStrategy, RoundView};


/// Allocates each round by solving an integer program that maximizes flow weighted by
/// closeness, subject to the remaining capacities and demands.
pub struct LinearStrategy {
    timeout: Duration,
}

impl LinearStrategy {
    pub fn new(timeout: Duration) -> LinearStrategy {
        LinearStrategy {timeout}
    }
}

/// One round's integer program, detached from the working state so it can be solved on
/// another thread.
#[derive(Debug)]
struct RoundProblem {
    /// (service index, building index, weight) for every in-range active pair
    pairs: Vec<(usize, usize, f64)>,
    capacity_left: BTreeMap<usize, u64>,
    demand_left: BTreeMap<usize, u64>,
}

impl RoundProblem {
    fn from_view(view: &RoundView) -> RoundProblem {
        let pairs = iproduct!(view.active_services.iter(), view.active_buildings.iter())
            .filter(|(ii, jj)| view.in_range(**ii, **jj))
            .map(|(ii, jj)| (*ii, *jj, 1. / (view.distances[[*ii, *jj]] + 1.)))
            .collect();
        RoundProblem {
            pairs,
            capacity_left: view.active_services.iter()
                .map(|ii| (*ii, view.capacity_left[*ii])).collect(),
            demand_left: view.active_buildings.iter()
                .map(|jj| (*jj, view.demand_left[*jj])).collect(),
        }
    }

    /// Returns the flow on each pair, in the order of `pairs`.
    fn solve(&self) -> Result<Vec<u64>, good_lp::ResolutionError> {
        let mut vars = ProblemVariables::new();
        let flow_vars: Vec<Variable> = self.pairs.iter().map(|(ii, jj, _)| {
            let upper = self.capacity_left[ii].min(self.demand_left[jj]);
            vars.add(variable().integer().min(0).max(upper as f64))
        }).collect();

        let objective: Expression = flow_vars.iter().zip(&self.pairs)
            .map(|(var, (_, _, weight))| *weight * *var)
            .sum();

        let mut from_service: BTreeMap<usize, Expression> = BTreeMap::new();
        let mut to_building: BTreeMap<usize, Expression> = BTreeMap::new();
        for (var, (ii, jj, _)) in flow_vars.iter().zip(&self.pairs) {
            from_service.entry(*ii).or_default().add_mul(1., *var);
            to_building.entry(*jj).or_default().add_mul(1., *var);
        }

        let mut model = vars.maximise(objective).using(default_solver);
        for (ii, total) in from_service {
            model = model.with(total.leq(self.capacity_left[&ii] as f64));
        }
        for (jj, total) in to_building {
            model = model.with(total.leq(self.demand_left[&jj] as f64));
        }
        let solution = model.solve()?;

        // the solver works in floating point, so integral values may come back slightly off
        Ok(flow_vars.iter().map(|var| solution.value(*var).round().max(0.) as u64).collect())
    }
}

/// Solves the problem on a worker thread, giving up after `timeout`.  A solver that times out
/// is left to finish on its own; its answer is discarded.
fn solve_with_timeout(problem: RoundProblem, timeout: Duration)
                      -> Result<(RoundProblem, Vec<u64>), String> {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        let result = problem.solve().map_err(|err| err.to_string());
        // the receiver may have stopped waiting
        let _ = sender.send((problem, result));
    });
    match receiver.recv_timeout(timeout) {
        Ok((problem, Ok(flows))) => Ok((problem, flows)),
        Ok((_, Err(msg))) => Err(msg),
        Err(RecvTimeoutError::Timeout) => Err(format!("no solution after {:?}", timeout)),
        Err(RecvTimeoutError::Disconnected) => Err(String::from("the solver thread panicked")),
    }
}

impl AllocationStrategy for LinearStrategy {
    fn name(&self) -> &'static str {
        "linear"
    }

    fn allocate_round(&self, view: &RoundView) -> Result<Array2<u64>, String> {
        let mut round = Array::zeros(view.distances.dim());
        let problem = RoundProblem::from_view(view);
        if problem.pairs.is_empty() {
            return Ok(round);
        }
        log::debug!("solving for {} pairs within range {}", problem.pairs.len(),
                    view.selection_range);

        let (problem, flows) = solve_with_timeout(problem, self.timeout)?;
        for ((ii, jj, _), flow) in problem.pairs.iter().zip(flows) {
            round[[*ii, *jj]] = flow;
        }
        return Ok(round);
    }
}
