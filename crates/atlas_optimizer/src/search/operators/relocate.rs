use crate::problem::{eval::Eval, vehicle::VehicleIdx, vrp::VehicleRoutingProblem};
use crate::search::operators::{
    LocalSearchOperator, Move, OperatorName, TieBreaker, VehicleList, consider,
};
use crate::search::solution::{Solution, tw_route::within_travel_bounds};
use crate::search::solution_state::SolutionState;

/// Move one single job from the source route to a position in the target
/// route. The workhorse for load balancing and route emptying.
#[derive(Debug)]
pub struct Relocate {
    s_vehicle: VehicleIdx,
    s_rank: usize,
    t_vehicle: VehicleIdx,
    t_rank: usize,
    s_gain: Eval,
    t_gain: Eval,
}

impl Relocate {
    fn job(&self, solution: &Solution) -> crate::problem::job::JobIdx {
        solution.route(self.s_vehicle).job_at(self.s_rank)
    }
}

impl LocalSearchOperator for Relocate {
    fn name(&self) -> OperatorName {
        OperatorName::Relocate
    }

    fn gain(&self) -> Eval {
        self.s_gain + self.t_gain
    }

    fn is_valid(
        &self,
        problem: &VehicleRoutingProblem,
        solution: &Solution,
        state: &SolutionState,
    ) -> bool {
        let job = self.job(solution);
        let t_route = solution.route(self.t_vehicle);

        // Removal from the source can only relax capacity and timing; the
        // target carries the real checks.
        problem.vehicle_ok_with_job(self.t_vehicle, job)
            && t_route.is_valid_replacement(problem, &[job], self.t_rank, self.t_rank)
            && within_travel_bounds(
                problem,
                self.t_vehicle,
                state.route_eval(self.t_vehicle) - self.t_gain,
            )
    }

    fn apply(&self, problem: &VehicleRoutingProblem, solution: &mut Solution) {
        let job = self.job(solution);
        let (s_route, t_route) = solution.route_pair_mut(self.s_vehicle, self.t_vehicle);
        s_route.replace(problem, &[], self.s_rank, self.s_rank + 1);
        t_route.replace(problem, &[job], self.t_rank, self.t_rank);
    }

    fn addition_candidates(&self) -> VehicleList {
        VehicleList::from_slice(&[self.s_vehicle, self.t_vehicle])
    }

    fn update_candidates(&self) -> VehicleList {
        VehicleList::from_slice(&[self.s_vehicle, self.t_vehicle])
    }

    fn tie_breaker(&self) -> TieBreaker {
        TieBreaker::new(
            OperatorName::Relocate,
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

        for t in 0..vehicles {
            if s == t {
                continue;
            }
            let t_vehicle = VehicleIdx::new(t);
            let t_route = solution.route(t_vehicle);

            for s_rank in 0..s_route.len() {
                let job = s_route.job_at(s_rank);
                if !problem.job(job).is_single()
                    || !problem.vehicle_ok_with_job(t_vehicle, job)
                {
                    continue;
                }

                // Fixed costs move with route emptiness.
                let mut fixed_delta_s = Eval::ZERO;
                if s_route.len() == 1 {
                    fixed_delta_s.cost += problem.fixed_cost(s_vehicle);
                }
                let mut fixed_delta_t = Eval::ZERO;
                if t_route.is_empty() {
                    fixed_delta_t.cost -= problem.fixed_cost(t_vehicle);
                }

                let s_gain =
                    s_route.replacement_gain(problem, &[], s_rank, s_rank + 1) + fixed_delta_s;

                for t_rank in 0..=t_route.len() {
                    let t_gain =
                        t_route.replacement_gain(problem, &[job], t_rank, t_rank) + fixed_delta_t;
                    if !(s_gain + t_gain).is_gain() {
                        continue;
                    }

                    consider(
                        &mut best,
                        Move::Relocate(Relocate {
                            s_vehicle,
                            s_rank,
                            t_vehicle,
                            t_rank,
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
    fn test_relocate_moves_job_to_closer_route() {
        let problem = test_utils::euclidean_line_problem(&[1.0, 9.0], &[0.0, 10.0]);
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

        // v0: 0 -> 1 -> 9 costs 9; moving job 1 to v1 (at x=10) costs 1.
        let mv = find_best(&problem, &solution, &state).expect("relocate should fire");
        mv.apply(&problem, &mut solution);

        assert_eq!(test_utils::route_job_ids(&solution, 0), vec![0]);
        assert_eq!(test_utils::route_job_ids(&solution, 1), vec![1]);
    }

    #[test]
    fn test_relocate_and_mirror_round_trip() {
        let problem = test_utils::euclidean_line_problem(&[1.0, 9.0], &[0.0, 10.0]);
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
        let original = solution.clone();

        let forward = Relocate {
            s_vehicle: VehicleIdx::new(0),
            s_rank: 1,
            t_vehicle: VehicleIdx::new(1),
            t_rank: 0,
            s_gain: Eval::ZERO,
            t_gain: Eval::ZERO,
        };
        let mirror = Relocate {
            s_vehicle: VehicleIdx::new(1),
            s_rank: 0,
            t_vehicle: VehicleIdx::new(0),
            t_rank: 1,
            s_gain: Eval::ZERO,
            t_gain: Eval::ZERO,
        };

        forward.apply(&problem, &mut solution);
        mirror.apply(&problem, &mut solution);

        assert!(solution.is_identical(&original));
    }

    #[test]
    fn test_relocate_counts_fixed_cost_of_waking_a_vehicle() {
        // Same geometry, but vehicle 1 has a fixed cost larger than the
        // routing saving: no move.
        let problem = test_utils::euclidean_line_problem_with_fixed_costs(
            &[1.0, 9.0],
            &[(0.0, 0.0), (10.0, 100.0)],
        );
        let solution = test_utils::solution_with_routes(
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

        assert!(find_best(&problem, &solution, &state).is_none());
    }
}
