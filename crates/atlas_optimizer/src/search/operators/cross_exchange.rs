use crate::problem::{eval::Eval, job::JobIdx, vehicle::VehicleIdx, vrp::VehicleRoutingProblem};
use crate::search::operators::{
    EdgeKind, LocalSearchOperator, Move, OperatorName, TieBreaker, VehicleList, consider,
    movable_edge,
};
use crate::search::solution::{Solution, tw_route::within_travel_bounds};
use crate::search::solution_state::SolutionState;

/// Swap a two-job edge between two routes, with independent optional
/// reversal of either edge.
#[derive(Debug)]
pub struct CrossExchange {
    s_vehicle: VehicleIdx,
    s_rank: usize,
    t_vehicle: VehicleIdx,
    t_rank: usize,
    reverse_s: bool,
    reverse_t: bool,
    s_gain: Eval,
    t_gain: Eval,
}

impl CrossExchange {
    /// The t edge as it lands in s, and the s edge as it lands in t.
    fn edges(&self, solution: &Solution) -> ([JobIdx; 2], [JobIdx; 2]) {
        let s_route = solution.route(self.s_vehicle);
        let t_route = solution.route(self.t_vehicle);
        let (sa, sb) = (s_route.job_at(self.s_rank), s_route.job_at(self.s_rank + 1));
        let (ta, tb) = (t_route.job_at(self.t_rank), t_route.job_at(self.t_rank + 1));

        let into_s = if self.reverse_t { [tb, ta] } else { [ta, tb] };
        let into_t = if self.reverse_s { [sb, sa] } else { [sa, sb] };
        (into_s, into_t)
    }
}

impl LocalSearchOperator for CrossExchange {
    fn name(&self) -> OperatorName {
        OperatorName::CrossExchange
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
        let (into_s, into_t) = self.edges(solution);

        into_s
            .iter()
            .all(|&job| problem.vehicle_ok_with_job(self.s_vehicle, job))
            && into_t
                .iter()
                .all(|&job| problem.vehicle_ok_with_job(self.t_vehicle, job))
            && s_route.is_valid_replacement(problem, &into_s, self.s_rank, self.s_rank + 2)
            && t_route.is_valid_replacement(problem, &into_t, self.t_rank, self.t_rank + 2)
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
        let (into_s, into_t) = self.edges(solution);
        let (s_route, t_route) = solution.route_pair_mut(self.s_vehicle, self.t_vehicle);
        s_route.replace(problem, &into_s, self.s_rank, self.s_rank + 2);
        t_route.replace(problem, &into_t, self.t_rank, self.t_rank + 2);
    }

    fn addition_candidates(&self) -> VehicleList {
        VehicleList::from_slice(&[self.s_vehicle, self.t_vehicle])
    }

    fn update_candidates(&self) -> VehicleList {
        VehicleList::from_slice(&[self.s_vehicle, self.t_vehicle])
    }

    fn tie_breaker(&self) -> TieBreaker {
        TieBreaker::new(
            OperatorName::CrossExchange,
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

        for t in s + 1..vehicles {
            let t_vehicle = VehicleIdx::new(t);
            let t_route = solution.route(t_vehicle);
            if t_route.len() < 2 {
                continue;
            }

            for s_rank in 0..s_route.len() - 1 {
                let Some(s_kind) = movable_edge(problem, s_route, s_rank) else {
                    continue;
                };
                for t_rank in 0..t_route.len() - 1 {
                    let Some(t_kind) = movable_edge(problem, t_route, t_rank) else {
                        continue;
                    };

                    for reverse_s in [false, true] {
                        if reverse_s && s_kind != EdgeKind::Singles {
                            continue;
                        }
                        for reverse_t in [false, true] {
                            if reverse_t && t_kind != EdgeKind::Singles {
                                continue;
                            }

                            let op = CrossExchange {
                                s_vehicle,
                                s_rank,
                                t_vehicle,
                                t_rank,
                                reverse_s,
                                reverse_t,
                                s_gain: Eval::ZERO,
                                t_gain: Eval::ZERO,
                            };
                            let (into_s, into_t) = op.edges(solution);
                            let s_gain = s_route
                                .replacement_gain(problem, &into_s, s_rank, s_rank + 2);
                            let t_gain = t_route
                                .replacement_gain(problem, &into_t, t_rank, t_rank + 2);
                            if !(s_gain + t_gain).is_gain() {
                                continue;
                            }

                            consider(
                                &mut best,
                                Move::CrossExchange(CrossExchange { s_gain, t_gain, ..op }),
                                problem,
                                solution,
                                state,
                            );
                        }
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
    fn test_cross_exchange_swaps_edges() {
        // Each vehicle holds the edge that belongs to the other.
        let problem = test_utils::euclidean_line_problem(
            &[8.0, 9.0, 1.0, 2.0],
            &[0.0, 10.0],
        );
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

        let mv = find_best(&problem, &solution, &state).expect("cross exchange should fire");
        let before = state.total_eval().cost;
        mv.apply(&problem, &mut solution);
        state.setup(&problem, &solution);

        assert!((before - state.total_eval().cost - mv.gain().cost).abs() < 1e-9);
        assert_eq!(test_utils::route_job_ids(&solution, 0), vec![2, 3]);
        assert_eq!(test_utils::route_job_ids(&solution, 1), vec![1, 0]);
    }
}
