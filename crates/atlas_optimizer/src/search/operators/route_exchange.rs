use crate::problem::{eval::Eval, job::JobIdx, vehicle::VehicleIdx, vrp::VehicleRoutingProblem};
use crate::search::operators::{
    LocalSearchOperator, Move, OperatorName, TieBreaker, VehicleList, consider, route_eval_of,
};
use crate::search::solution::{Solution, tw_route::sequence_is_feasible};
use crate::search::solution_state::SolutionState;

/// Swap the entire job sequences of two vehicles. Useful when vehicles
/// differ in cost, capacity or position; one side may be empty.
#[derive(Debug)]
pub struct RouteExchange {
    s_vehicle: VehicleIdx,
    t_vehicle: VehicleIdx,
    s_jobs: Vec<JobIdx>,
    t_jobs: Vec<JobIdx>,
    s_gain: Eval,
    t_gain: Eval,
}

impl LocalSearchOperator for RouteExchange {
    fn name(&self) -> OperatorName {
        OperatorName::RouteExchange
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
        sequence_is_feasible(problem, self.s_vehicle, &self.s_jobs)
            && sequence_is_feasible(problem, self.t_vehicle, &self.t_jobs)
    }

    fn apply(&self, problem: &VehicleRoutingProblem, solution: &mut Solution) {
        let (s_route, t_route) = solution.route_pair_mut(self.s_vehicle, self.t_vehicle);
        let s_len = s_route.len();
        let t_len = t_route.len();
        s_route.replace(problem, &self.s_jobs, 0, s_len);
        t_route.replace(problem, &self.t_jobs, 0, t_len);
    }

    fn addition_candidates(&self) -> VehicleList {
        VehicleList::from_slice(&[self.s_vehicle, self.t_vehicle])
    }

    fn update_candidates(&self) -> VehicleList {
        VehicleList::from_slice(&[self.s_vehicle, self.t_vehicle])
    }

    fn tie_breaker(&self) -> TieBreaker {
        TieBreaker::new(OperatorName::RouteExchange, self.s_vehicle, 0, self.t_vehicle, 0)
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

        for t in s + 1..vehicles {
            let t_vehicle = VehicleIdx::new(t);
            let t_route = solution.route(t_vehicle);
            if s_route.is_empty() && t_route.is_empty() {
                continue;
            }

            // Each vehicle takes over the other's jobs.
            let s_jobs = t_route.jobs().to_vec();
            let t_jobs = s_route.jobs().to_vec();

            let s_gain = state.route_eval(s_vehicle) - route_eval_of(problem, s_vehicle, &s_jobs);
            let t_gain = state.route_eval(t_vehicle) - route_eval_of(problem, t_vehicle, &t_jobs);
            if !(s_gain + t_gain).is_gain() {
                continue;
            }

            consider(
                &mut best,
                Move::RouteExchange(RouteExchange {
                    s_vehicle,
                    t_vehicle,
                    s_jobs,
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

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;

    #[test]
    fn test_route_exchange_hands_route_to_better_placed_vehicle() {
        // All jobs sit next to v1, but v0 serves them.
        let problem = test_utils::euclidean_line_problem(&[9.0, 11.0], &[0.0, 10.0]);
        let mut solution = test_utils::solution_with_routes(
            &problem,
            vec![
                test_utils::TestRoute {
                    vehicle: 0,
                    jobs: vec![0, 1],
                },
                test_utils::TestRoute {
                    vehicle: 1,
                    jobs: vec![],
                },
            ],
        );
        let mut state = SolutionState::new(&problem);
        state.setup(&problem, &solution);

        let mv = find_best(&problem, &solution, &state).expect("route exchange should fire");
        mv.apply(&problem, &mut solution);

        assert!(test_utils::route_job_ids(&solution, 0).is_empty());
        assert_eq!(test_utils::route_job_ids(&solution, 1), vec![0, 1]);
    }
}
