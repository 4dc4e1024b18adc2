use crate::problem::{eval::Eval, job::JobIdx, vehicle::VehicleIdx, vrp::VehicleRoutingProblem};
use crate::search::operators::{
    EdgeKind, LocalSearchOperator, Move, OperatorName, TieBreaker, VehicleList, consider,
    movable_edge,
};
use crate::search::solution::{Solution, tw_route::within_travel_bounds};
use crate::search::solution_state::SolutionState;

/// Swap two disjoint two-job edges within one route, with independent
/// optional reversal of either edge.
#[derive(Debug)]
pub struct IntraCrossExchange {
    s_vehicle: VehicleIdx,
    first_rank: usize,
    second_rank: usize,
    new_inner: Vec<JobIdx>,
    gain: Eval,
}

impl LocalSearchOperator for IntraCrossExchange {
    fn name(&self) -> OperatorName {
        OperatorName::IntraCrossExchange
    }

    fn gain(&self) -> Eval {
        self.gain
    }

    fn is_valid(
        &self,
        problem: &VehicleRoutingProblem,
        solution: &Solution,
        state: &SolutionState,
    ) -> bool {
        let route = solution.route(self.s_vehicle);
        route.is_valid_replacement(problem, &self.new_inner, self.first_rank, self.second_rank + 2)
            && within_travel_bounds(
                problem,
                self.s_vehicle,
                state.route_eval(self.s_vehicle) - self.gain,
            )
    }

    fn apply(&self, problem: &VehicleRoutingProblem, solution: &mut Solution) {
        solution.route_mut(self.s_vehicle).replace(
            problem,
            &self.new_inner,
            self.first_rank,
            self.second_rank + 2,
        );
    }

    fn addition_candidates(&self) -> VehicleList {
        VehicleList::from_slice(&[self.s_vehicle])
    }

    fn update_candidates(&self) -> VehicleList {
        VehicleList::from_slice(&[self.s_vehicle])
    }

    fn tie_breaker(&self) -> TieBreaker {
        TieBreaker::new(
            OperatorName::IntraCrossExchange,
            self.s_vehicle,
            self.first_rank,
            self.s_vehicle,
            self.second_rank,
        )
    }
}

pub(crate) fn find_best(
    problem: &VehicleRoutingProblem,
    solution: &Solution,
    state: &SolutionState,
) -> Option<Move> {
    let mut best: Option<Move> = None;

    for v in 0..problem.vehicles().len() {
        let vehicle_id = VehicleIdx::new(v);
        let route = solution.route(vehicle_id);
        if route.len() < 4 {
            continue;
        }

        for first_rank in 0..route.len() - 3 {
            let Some(first_kind) = movable_edge(problem, route, first_rank) else {
                continue;
            };
            for second_rank in first_rank + 2..route.len() - 1 {
                let Some(second_kind) = movable_edge(problem, route, second_rank) else {
                    continue;
                };

                let (a, b) = (route.job_at(first_rank), route.job_at(first_rank + 1));
                let (c, d) = (route.job_at(second_rank), route.job_at(second_rank + 1));
                let middle = &route.jobs()[first_rank + 2..second_rank];

                for reverse_first in [false, true] {
                    if reverse_first && first_kind != EdgeKind::Singles {
                        continue;
                    }
                    for reverse_second in [false, true] {
                        if reverse_second && second_kind != EdgeKind::Singles {
                            continue;
                        }

                        let mut new_inner: Vec<JobIdx> =
                            Vec::with_capacity(second_rank + 2 - first_rank);
                        if reverse_second {
                            new_inner.extend_from_slice(&[d, c]);
                        } else {
                            new_inner.extend_from_slice(&[c, d]);
                        }
                        new_inner.extend_from_slice(middle);
                        if reverse_first {
                            new_inner.extend_from_slice(&[b, a]);
                        } else {
                            new_inner.extend_from_slice(&[a, b]);
                        }

                        let gain = route.replacement_gain(
                            problem,
                            &new_inner,
                            first_rank,
                            second_rank + 2,
                        );
                        if !gain.is_gain() {
                            continue;
                        }

                        consider(
                            &mut best,
                            Move::IntraCrossExchange(IntraCrossExchange {
                                s_vehicle: vehicle_id,
                                first_rank,
                                second_rank,
                                new_inner,
                                gain,
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
    fn test_intra_cross_exchange_swaps_edges_in_route() {
        // 0 -> (5,6) -> 9 -> (1,2): swapping the edges sorts the sweep into
        // 0 -> (1,2) -> 9 -> (5,6).
        let problem =
            test_utils::euclidean_line_problem(&[5.0, 6.0, 9.0, 1.0, 2.0], &[0.0]);
        let mut solution = test_utils::solution_with_routes(
            &problem,
            vec![test_utils::TestRoute {
                vehicle: 0,
                jobs: vec![0, 1, 2, 3, 4],
            }],
        );
        let mut state = SolutionState::new(&problem);
        state.setup(&problem, &solution);

        let mv = find_best(&problem, &solution, &state).expect("intra cross should fire");
        let before = state.total_eval().cost;
        mv.apply(&problem, &mut solution);
        state.setup(&problem, &solution);

        assert!(state.total_eval().cost < before);
    }
}
