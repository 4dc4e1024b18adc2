use crate::problem::{eval::Eval, job::JobIdx, vehicle::VehicleIdx, vrp::VehicleRoutingProblem};
use crate::search::operators::{
    EdgeKind, LocalSearchOperator, Move, OperatorName, TieBreaker, VehicleList, consider,
    movable_edge,
};
use crate::search::solution::{Solution, tw_route::within_travel_bounds};
use crate::search::solution_state::SolutionState;

/// Move a two-job edge from the source route into the target route,
/// optionally reversed. A pickup/delivery pair moves as a unit and is never
/// reversed.
#[derive(Debug)]
pub struct OrOpt {
    s_vehicle: VehicleIdx,
    s_rank: usize,
    t_vehicle: VehicleIdx,
    t_rank: usize,
    reverse: bool,
    s_gain: Eval,
    t_gain: Eval,
}

impl OrOpt {
    fn edge(&self, solution: &Solution) -> [JobIdx; 2] {
        let s_route = solution.route(self.s_vehicle);
        let (a, b) = (s_route.job_at(self.s_rank), s_route.job_at(self.s_rank + 1));
        if self.reverse { [b, a] } else { [a, b] }
    }
}

impl LocalSearchOperator for OrOpt {
    fn name(&self) -> OperatorName {
        OperatorName::OrOpt
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
        let edge = self.edge(solution);
        let t_route = solution.route(self.t_vehicle);

        edge.iter()
            .all(|&job| problem.vehicle_ok_with_job(self.t_vehicle, job))
            && t_route.is_valid_replacement(problem, &edge, self.t_rank, self.t_rank)
            && within_travel_bounds(
                problem,
                self.t_vehicle,
                state.route_eval(self.t_vehicle) - self.t_gain,
            )
    }

    fn apply(&self, problem: &VehicleRoutingProblem, solution: &mut Solution) {
        let edge = self.edge(solution);
        let (s_route, t_route) = solution.route_pair_mut(self.s_vehicle, self.t_vehicle);
        s_route.replace(problem, &[], self.s_rank, self.s_rank + 2);
        t_route.replace(problem, &edge, self.t_rank, self.t_rank);
    }

    fn addition_candidates(&self) -> VehicleList {
        VehicleList::from_slice(&[self.s_vehicle, self.t_vehicle])
    }

    fn update_candidates(&self) -> VehicleList {
        VehicleList::from_slice(&[self.s_vehicle, self.t_vehicle])
    }

    fn tie_breaker(&self) -> TieBreaker {
        TieBreaker::new(
            OperatorName::OrOpt,
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
        if s_route.len() < 2 {
            continue;
        }

        for t in 0..vehicles {
            if s == t {
                continue;
            }
            let t_vehicle = VehicleIdx::new(t);
            let t_route = solution.route(t_vehicle);

            for s_rank in 0..s_route.len() - 1 {
                let Some(kind) = movable_edge(problem, s_route, s_rank) else {
                    continue;
                };
                let a = s_route.job_at(s_rank);
                let b = s_route.job_at(s_rank + 1);
                if !problem.vehicle_ok_with_job(t_vehicle, a)
                    || !problem.vehicle_ok_with_job(t_vehicle, b)
                {
                    continue;
                }

                let mut fixed_delta_s = Eval::ZERO;
                if s_route.len() == 2 {
                    fixed_delta_s.cost += problem.fixed_cost(s_vehicle);
                }
                let mut fixed_delta_t = Eval::ZERO;
                if t_route.is_empty() {
                    fixed_delta_t.cost -= problem.fixed_cost(t_vehicle);
                }

                let s_gain =
                    s_route.replacement_gain(problem, &[], s_rank, s_rank + 2) + fixed_delta_s;

                for t_rank in 0..=t_route.len() {
                    for reverse in [false, true] {
                        if reverse && kind != EdgeKind::Singles {
                            continue;
                        }
                        let seq = if reverse { [b, a] } else { [a, b] };
                        let t_gain = t_route.replacement_gain(problem, &seq, t_rank, t_rank)
                            + fixed_delta_t;
                        if !(s_gain + t_gain).is_gain() {
                            continue;
                        }

                        consider(
                            &mut best,
                            Move::OrOpt(OrOpt {
                                s_vehicle,
                                s_rank,
                                t_vehicle,
                                t_rank,
                                reverse,
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
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;

    #[test]
    fn test_or_opt_moves_edge_and_may_reverse() {
        // v0 detours far right for two jobs that sit next to v1.
        let problem = test_utils::euclidean_line_problem(&[1.0, 8.0, 9.0], &[0.0, 10.0]);
        let mut solution = test_utils::solution_with_routes(
            &problem,
            vec![
                test_utils::TestRoute {
                    vehicle: 0,
                    jobs: vec![0, 1, 2],
                },
                test_utils::TestRoute {
                    vehicle: 1,
                    jobs: vec![],
                },
            ],
        );
        let mut state = SolutionState::new(&problem);
        state.setup(&problem, &solution);

        let mv = find_best(&problem, &solution, &state).expect("or-opt should fire");
        mv.apply(&problem, &mut solution);

        assert_eq!(test_utils::route_job_ids(&solution, 0), vec![0]);
        // From x=10 the reversed order 9 -> 8 is the cheap one.
        assert_eq!(test_utils::route_job_ids(&solution, 1), vec![2, 1]);
    }

    #[test]
    fn test_pair_edge_is_never_reversed() {
        let problem = test_utils::shipment_problem_two_vehicles();
        let solution = test_utils::solution_with_routes(
            &problem,
            vec![
                test_utils::TestRoute {
                    vehicle: 0,
                    jobs: vec![0, 1],
                },
                test_utils::TestRoute {
                    vehicle: 1,
                    jobs: vec![2],
                },
            ],
        );
        let mut state = SolutionState::new(&problem);
        state.setup(&problem, &solution);

        if let Some(mv) = find_best(&problem, &solution, &state) {
            if let Move::OrOpt(op) = &mv {
                assert!(!op.reverse, "pickup/delivery edge must keep its order");
            }
        }
    }
}
