use std::time::Instant;

use crate::problem::{eval::Eval, job::JobIdx, vehicle::VehicleIdx, vrp::VehicleRoutingProblem};
use crate::search::operators::{
    LocalSearchOperator, Move, OperatorName, TieBreaker, VehicleList, consider, route_eval_of,
};
use crate::search::solution::{Solution, tw_route::sequence_is_feasible};
use crate::search::solution_state::SolutionState;
use crate::search::tsp::solve_tsp;

/// Re-solve one route as a TSP over its own job set and install the result
/// when cheaper. Skips routes carrying shipments, as the plain TSP ignores
/// precedence.
#[derive(Debug)]
pub struct TspFix {
    s_vehicle: VehicleIdx,
    new_jobs: Vec<JobIdx>,
    gain: Eval,
}

impl LocalSearchOperator for TspFix {
    fn name(&self) -> OperatorName {
        OperatorName::TspFix
    }

    fn gain(&self) -> Eval {
        self.gain
    }

    fn is_valid(
        &self,
        problem: &VehicleRoutingProblem,
        _solution: &Solution,
        _state: &SolutionState,
    ) -> bool {
        sequence_is_feasible(problem, self.s_vehicle, &self.new_jobs)
    }

    fn apply(&self, problem: &VehicleRoutingProblem, solution: &mut Solution) {
        let len = solution.route(self.s_vehicle).len();
        solution
            .route_mut(self.s_vehicle)
            .replace(problem, &self.new_jobs, 0, len);
    }

    fn addition_candidates(&self) -> VehicleList {
        VehicleList::from_slice(&[self.s_vehicle])
    }

    fn update_candidates(&self) -> VehicleList {
        VehicleList::from_slice(&[self.s_vehicle])
    }

    fn tie_breaker(&self) -> TieBreaker {
        TieBreaker::new(OperatorName::TspFix, self.s_vehicle, 0, self.s_vehicle, 0)
    }
}

pub(crate) fn find_best(
    problem: &VehicleRoutingProblem,
    solution: &Solution,
    state: &SolutionState,
    deadline: Option<Instant>,
) -> Option<Move> {
    let mut best: Option<Move> = None;

    for v in 0..problem.vehicles().len() {
        let vehicle_id = VehicleIdx::new(v);
        let route = solution.route(vehicle_id);
        if route.len() < 3 {
            continue;
        }
        if route
            .jobs()
            .iter()
            .any(|&job| !problem.job(job).is_single())
        {
            continue;
        }

        let new_jobs = solve_tsp(problem, vehicle_id, route.jobs(), deadline);
        let gain = state.route_eval(vehicle_id) - route_eval_of(problem, vehicle_id, &new_jobs);
        if !gain.is_gain() {
            continue;
        }

        consider(
            &mut best,
            Move::TspFix(TspFix {
                s_vehicle: vehicle_id,
                new_jobs,
                gain,
            }),
            problem,
            solution,
            state,
        );
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;

    #[test]
    fn test_tsp_fix_repairs_scrambled_route() {
        let problem = test_utils::euclidean_line_problem(&[3.0, 1.0, 4.0, 2.0], &[0.0]);
        let mut solution = test_utils::solution_with_routes(
            &problem,
            vec![test_utils::TestRoute {
                vehicle: 0,
                jobs: vec![0, 1, 2, 3],
            }],
        );
        let mut state = SolutionState::new(&problem);
        state.setup(&problem, &solution);

        let mv = find_best(&problem, &solution, &state, None).expect("tsp fix should fire");
        mv.apply(&problem, &mut solution);

        assert_eq!(test_utils::route_job_ids(&solution, 0), vec![1, 3, 0, 2]);
    }
}
