use crate::problem::{eval::Eval, job::JobIdx, vehicle::VehicleIdx, vrp::VehicleRoutingProblem};
use crate::search::operators::{
    LocalSearchOperator, Move, OperatorName, TieBreaker, VehicleList, consider, route_eval_of,
};
use crate::search::solution::{Solution, tw_route::sequence_is_feasible};
use crate::search::solution_state::SolutionState;

/// 2-opt*: splice the tail of each route onto the other after the cut ranks.
///
/// ```text
/// BEFORE:  R1: a0 .. a_i | a_i+1 ..      R2: b0 .. b_j | b_j+1 ..
/// AFTER:   R1: a0 .. a_i | b_j+1 ..      R2: b0 .. b_j | a_i+1 ..
/// ```
#[derive(Debug)]
pub struct TwoOpt {
    s_vehicle: VehicleIdx,
    s_rank: usize,
    t_vehicle: VehicleIdx,
    t_rank: usize,
    s_jobs: Vec<JobIdx>,
    t_jobs: Vec<JobIdx>,
    s_gain: Eval,
    t_gain: Eval,
}

impl LocalSearchOperator for TwoOpt {
    fn name(&self) -> OperatorName {
        OperatorName::TwoOpt
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
        TieBreaker::new(
            OperatorName::TwoOpt,
            self.s_vehicle,
            self.s_rank,
            self.t_vehicle,
            self.t_rank,
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

        for t in s + 1..vehicles {
            let t_vehicle = VehicleIdx::new(t);
            let t_route = solution.route(t_vehicle);
            if t_route.is_empty() {
                continue;
            }

            for s_rank in 0..s_route.len() {
                for t_rank in 0..t_route.len() {
                    let mut s_jobs: Vec<JobIdx> = s_route.jobs()[..=s_rank].to_vec();
                    s_jobs.extend_from_slice(&t_route.jobs()[t_rank + 1..]);
                    let mut t_jobs: Vec<JobIdx> = t_route.jobs()[..=t_rank].to_vec();
                    t_jobs.extend_from_slice(&s_route.jobs()[s_rank + 1..]);

                    let s_gain = state.route_eval(s_vehicle)
                        - route_eval_of(problem, s_vehicle, &s_jobs);
                    let t_gain = state.route_eval(t_vehicle)
                        - route_eval_of(problem, t_vehicle, &t_jobs);
                    if !(s_gain + t_gain).is_gain() {
                        continue;
                    }

                    consider(
                        &mut best,
                        Move::TwoOpt(TwoOpt {
                            s_vehicle,
                            s_rank,
                            t_vehicle,
                            t_rank,
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
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;

    #[test]
    fn test_two_opt_uncrosses_tails() {
        // v0: 0 -> 1 -> 9, v1: 10 -> 8 -> 2: swapping tails uncrosses.
        let problem = test_utils::euclidean_line_problem(&[1.0, 9.0, 8.0, 2.0], &[0.0, 10.0]);
        let mut solution = test_utils::solution_with_routes(
            &problem,
            vec![
                test_utils::TestRoute {
                    vehicle: 0,
                    jobs: vec![0, 1],
                },
                test_utils::TestRoute {
                    vehicle: 1,
                    jobs: vec![2, 3],
                },
            ],
        );
        let mut state = SolutionState::new(&problem);
        state.setup(&problem, &solution);

        let mv = find_best(&problem, &solution, &state).expect("two-opt should fire");
        let before = state.total_eval().cost;
        mv.apply(&problem, &mut solution);
        state.setup(&problem, &solution);

        assert!((before - state.total_eval().cost - mv.gain().cost).abs() < 1e-9);
        assert_eq!(test_utils::route_job_ids(&solution, 0), vec![0, 3]);
        assert_eq!(test_utils::route_job_ids(&solution, 1), vec![2, 1]);
    }

    #[test]
    fn test_two_opt_single_job_routes_no_gain() {
        let problem = test_utils::euclidean_line_problem(&[1.0, 9.0], &[0.0, 10.0]);
        let solution = test_utils::solution_with_routes(
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

        assert!(find_best(&problem, &solution, &state).is_none());
    }
}
