use crate::problem::{eval::Eval, job::JobIdx, vehicle::VehicleIdx, vrp::VehicleRoutingProblem};
use crate::search::operators::{
    LocalSearchOperator, Move, OperatorName, TieBreaker, VehicleList, consider, route_eval_of,
};
use crate::search::solution::{Solution, tw_route::sequence_is_feasible};
use crate::search::solution_state::SolutionState;

/// Move the whole source route onto the start or the end of the target
/// route, freeing the source vehicle.
#[derive(Debug)]
pub struct RouteShift {
    s_vehicle: VehicleIdx,
    t_vehicle: VehicleIdx,
    shift_to_start: bool,
    t_jobs: Vec<JobIdx>,
    s_gain: Eval,
    t_gain: Eval,
}

impl LocalSearchOperator for RouteShift {
    fn name(&self) -> OperatorName {
        OperatorName::RouteShift
    }

    fn gain(&self) -> Eval {
        self.s_gain + self.t_gain
    }

    fn is_valid(
        &self,
        problem: &VehicleRoutingProblem,
        _solution: &Solution,
        _state: &SolutionState,
    ) -> bool {
        sequence_is_feasible(problem, self.t_vehicle, &self.t_jobs)
    }

    fn apply(&self, problem: &VehicleRoutingProblem, solution: &mut Solution) {
        let (s_route, t_route) = solution.route_pair_mut(self.s_vehicle, self.t_vehicle);
        let s_len = s_route.len();
        let t_len = t_route.len();
        s_route.replace(problem, &[], 0, s_len);
        t_route.replace(problem, &self.t_jobs, 0, t_len);
    }

    fn addition_candidates(&self) -> VehicleList {
        VehicleList::from_slice(&[self.s_vehicle, self.t_vehicle])
    }

    fn update_candidates(&self) -> VehicleList {
        VehicleList::from_slice(&[self.s_vehicle, self.t_vehicle])
    }

    fn tie_breaker(&self) -> TieBreaker {
        TieBreaker::new(
            OperatorName::RouteShift,
            self.s_vehicle,
            usize::from(self.shift_to_start),
            self.t_vehicle,
            0,
        )
    }
}

pub(crate) fn find_best(
    problem: &VehicleRoutingProblem,
    solution: &Solution,
    state: &SolutionState,
) -> Option<Move> {
    let mut best: Option<Move> = None;
    let vehicles = problem.vehicles().len();

    for s in 0..vehicles {
        let s_vehicle = VehicleIdx::new(s);
        let s_route = solution.route(s_vehicle);
        if s_route.is_empty() {
            continue;
        }

        for t in 0..vehicles {
            if s == t {
                continue;
            }
            let t_vehicle = VehicleIdx::new(t);
            let t_route = solution.route(t_vehicle);

            for shift_to_start in [true, false] {
                let mut t_jobs: Vec<JobIdx> = Vec::with_capacity(s_route.len() + t_route.len());
                if shift_to_start {
                    t_jobs.extend_from_slice(s_route.jobs());
                    t_jobs.extend_from_slice(t_route.jobs());
                } else {
                    t_jobs.extend_from_slice(t_route.jobs());
                    t_jobs.extend_from_slice(s_route.jobs());
                }

                let s_gain = state.route_eval(s_vehicle);
                let t_gain =
                    state.route_eval(t_vehicle) - route_eval_of(problem, t_vehicle, &t_jobs);
                if !(s_gain + t_gain).is_gain() {
                    continue;
                }

                consider(
                    &mut best,
                    Move::RouteShift(RouteShift {
                        s_vehicle,
                        t_vehicle,
                        shift_to_start,
                        t_jobs,
                        s_gain,
                        t_gain,
                    }),
                    problem,
                    solution,
                    state,
                );
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;

    #[test]
    fn test_route_shift_consolidates_two_short_routes() {
        // v1's single job is on v0's way; shifting v1's route onto v0's end
        // frees v1's fixed cost and shortens travel.
        let problem = test_utils::euclidean_line_problem_with_fixed_costs(
            &[1.0, 2.0],
            &[(0.0, 5.0), (0.0, 5.0)],
        );
        let mut solution = test_utils::solution_with_routes(
            &problem,
            vec![
                test_utils::TestRoute {
                    vehicle: 0,
                    jobs: vec![0],
                },
                test_utils::TestRoute {
                    vehicle: 1,
                    jobs: vec![1],
                },
            ],
        );
        let mut state = SolutionState::new(&problem);
        state.setup(&problem, &solution);

        let mv = find_best(&problem, &solution, &state).expect("route shift should fire");
        mv.apply(&problem, &mut solution);

        let lens = (
            test_utils::route_job_ids(&solution, 0).len(),
            test_utils::route_job_ids(&solution, 1).len(),
        );
        assert!(lens == (2, 0) || lens == (0, 2));
    }
}
