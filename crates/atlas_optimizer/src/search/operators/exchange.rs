use crate::problem::{eval::Eval, vehicle::VehicleIdx, vrp::VehicleRoutingProblem};
use crate::search::operators::{
    LocalSearchOperator, Move, OperatorName, TieBreaker, VehicleList, consider,
};
use crate::search::solution::{Solution, tw_route::within_travel_bounds};
use crate::search::solution_state::SolutionState;

/// Swap one single job between two routes, each staying at the other's rank.
///
/// ```text
/// BEFORE:  R1: ... (A) -> [x] -> (B) ...    R2: ... (C) -> [y] -> (D) ...
/// AFTER:   R1: ... (A) -> [y] -> (B) ...    R2: ... (C) -> [x] -> (D) ...
/// ```
#[derive(Debug)]
pub struct Exchange {
    s_vehicle: VehicleIdx,
    s_rank: usize,
    t_vehicle: VehicleIdx,
    t_rank: usize,
    s_gain: Eval,
    t_gain: Eval,
}

impl LocalSearchOperator for Exchange {
    fn name(&self) -> OperatorName {
        OperatorName::Exchange
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
        let s_route = solution.route(self.s_vehicle);
        let t_route = solution.route(self.t_vehicle);
        let s_job = s_route.job_at(self.s_rank);
        let t_job = t_route.job_at(self.t_rank);

        problem.vehicle_ok_with_job(self.s_vehicle, t_job)
            && problem.vehicle_ok_with_job(self.t_vehicle, s_job)
            && s_route.is_valid_replacement(problem, &[t_job], self.s_rank, self.s_rank + 1)
            && t_route.is_valid_replacement(problem, &[s_job], self.t_rank, self.t_rank + 1)
            && within_travel_bounds(
                problem,
                self.s_vehicle,
                state.route_eval(self.s_vehicle) - self.s_gain,
            )
            && within_travel_bounds(
                problem,
                self.t_vehicle,
                state.route_eval(self.t_vehicle) - self.t_gain,
            )
    }

    fn apply(&self, problem: &VehicleRoutingProblem, solution: &mut Solution) {
        let s_job = solution.route(self.s_vehicle).job_at(self.s_rank);
        let t_job = solution.route(self.t_vehicle).job_at(self.t_rank);

        let (s_route, t_route) = solution.route_pair_mut(self.s_vehicle, self.t_vehicle);
        s_route.replace(problem, &[t_job], self.s_rank, self.s_rank + 1);
        t_route.replace(problem, &[s_job], self.t_rank, self.t_rank + 1);
    }

    fn addition_candidates(&self) -> VehicleList {
        VehicleList::from_slice(&[self.s_vehicle, self.t_vehicle])
    }

    fn update_candidates(&self) -> VehicleList {
        VehicleList::from_slice(&[self.s_vehicle, self.t_vehicle])
    }

    fn tie_breaker(&self) -> TieBreaker {
        TieBreaker::new(
            OperatorName::Exchange,
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
                let s_job = s_route.job_at(s_rank);
                if !problem.job(s_job).is_single()
                    || !problem.vehicle_ok_with_job(t_vehicle, s_job)
                {
                    continue;
                }

                for t_rank in 0..t_route.len() {
                    let t_job = t_route.job_at(t_rank);
                    if !problem.job(t_job).is_single()
                        || !problem.vehicle_ok_with_job(s_vehicle, t_job)
                    {
                        continue;
                    }

                    let s_gain =
                        s_route.replacement_gain(problem, &[t_job], s_rank, s_rank + 1);
                    let t_gain =
                        t_route.replacement_gain(problem, &[s_job], t_rank, t_rank + 1);
                    if !(s_gain + t_gain).is_gain() {
                        continue;
                    }

                    consider(
                        &mut best,
                        Move::Exchange(Exchange {
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
    fn test_exchange_swaps_misplaced_jobs() {
        // v0 serves x in {1, 9}, v1 serves x in {10, 2}: swapping the
        // misplaced jobs shortens both routes.
        let problem = test_utils::euclidean_line_problem(&[1.0, 9.0, 10.0, 2.0], &[0.0, 11.0]);
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

        let mv = find_best(&problem, &solution, &state).expect("an improving exchange exists");
        assert!(mv.gain().is_gain());

        let before = state.total_eval().cost;
        mv.apply(&problem, &mut solution);
        state.setup(&problem, &solution);
        let after = state.total_eval().cost;

        assert!((before - after - mv.gain().cost).abs() < 1e-9);
        assert_eq!(
            test_utils::route_job_ids(&solution, 0),
            vec![0, 3],
        );
        assert_eq!(
            test_utils::route_job_ids(&solution, 1),
            vec![2, 1],
        );
    }

    #[test]
    fn test_exchange_apply_twice_round_trips() {
        let problem = test_utils::euclidean_line_problem(&[1.0, 9.0, 10.0, 2.0], &[0.0, 11.0]);
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
        let original = solution.clone();
        let mut state = SolutionState::new(&problem);
        state.setup(&problem, &solution);

        let op = Exchange {
            s_vehicle: VehicleIdx::new(0),
            s_rank: 1,
            t_vehicle: VehicleIdx::new(1),
            t_rank: 1,
            s_gain: Eval::ZERO,
            t_gain: Eval::ZERO,
        };

        // The mirror of an exchange is the exchange itself.
        op.apply(&problem, &mut solution);
        op.apply(&problem, &mut solution);
        assert!(solution.is_identical(&original));

        // Refreshing the touched vehicles yields the same caches as a full
        // rebuild on the restored solution.
        for &vehicle in &op.update_candidates() {
            state.update_route(&problem, &solution, vehicle);
        }
        let mut rebuilt = SolutionState::new(&problem);
        rebuilt.setup(&problem, &solution);
        for v in 0..2 {
            let vehicle_id = VehicleIdx::new(v);
            assert_eq!(state.route_eval(vehicle_id), rebuilt.route_eval(vehicle_id));
            for rank in 0..solution.route(vehicle_id).len() {
                assert_eq!(
                    state.node_gain(vehicle_id, rank),
                    rebuilt.node_gain(vehicle_id, rank)
                );
            }
        }
    }

    #[test]
    fn test_exchange_respects_capacity() {
        // Swapping in a 5-unit delivery against a 1-unit one overloads v0
        // (capacity 3).
        let problem = test_utils::two_vehicle_capacity_problem(&[1, 5], 3, 10);
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

        let op = Exchange {
            s_vehicle: VehicleIdx::new(0),
            s_rank: 0,
            t_vehicle: VehicleIdx::new(1),
            t_rank: 0,
            s_gain: Eval::ZERO,
            t_gain: Eval::ZERO,
        };
        assert!(!op.is_valid(&problem, &solution, &state));
    }
}
