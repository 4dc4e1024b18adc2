use crate::problem::{eval::Eval, job::JobIdx, vehicle::VehicleIdx, vrp::VehicleRoutingProblem};
use crate::search::operators::{
    EdgeKind, LocalSearchOperator, Move, OperatorName, TieBreaker, VehicleList, consider,
    movable_edge,
};
use crate::search::solution::{Solution, tw_route::within_travel_bounds};
use crate::search::solution_state::SolutionState;

/// Swap one single job against a disjoint two-job edge within the same
/// route, with optional reversal of the edge.
#[derive(Debug)]
pub struct IntraMixedExchange {
    s_vehicle: VehicleIdx,
    single_rank: usize,
    edge_rank: usize,
    span_start: usize,
    span_end: usize,
    new_inner: Vec<JobIdx>,
    gain: Eval,
}

impl LocalSearchOperator for IntraMixedExchange {
    fn name(&self) -> OperatorName {
        OperatorName::IntraMixedExchange
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
        route.is_valid_replacement(problem, &self.new_inner, self.span_start, self.span_end)
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
            self.span_start,
            self.span_end,
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
            OperatorName::IntraMixedExchange,
            self.s_vehicle,
            self.single_rank,
            self.s_vehicle,
            self.edge_rank,
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
        if route.len() < 3 {
            continue;
        }

        for single_rank in 0..route.len() {
            let single = route.job_at(single_rank);
            if !problem.job(single).is_single() {
                continue;
            }

            for edge_rank in 0..route.len() - 1 {
                // The edge must not contain the single job.
                if single_rank == edge_rank || single_rank == edge_rank + 1 {
                    continue;
                }
                let Some(kind) = movable_edge(problem, route, edge_rank) else {
                    continue;
                };
                let (a, b) = (route.job_at(edge_rank), route.job_at(edge_rank + 1));

                for reverse in [false, true] {
                    if reverse && kind != EdgeKind::Singles {
                        continue;
                    }
                    let edge = if reverse { [b, a] } else { [a, b] };

                    let (span_start, span_end, new_inner) = if single_rank < edge_rank {
                        let mut inner = edge.to_vec();
                        inner.extend_from_slice(&route.jobs()[single_rank + 1..edge_rank]);
                        inner.push(single);
                        (single_rank, edge_rank + 2, inner)
                    } else {
                        let mut inner = vec![single];
                        inner.extend_from_slice(&route.jobs()[edge_rank + 2..single_rank]);
                        inner.extend_from_slice(&edge);
                        (edge_rank, single_rank + 1, inner)
                    };

                    let gain =
                        route.replacement_gain(problem, &new_inner, span_start, span_end);
                    if !gain.is_gain() {
                        continue;
                    }

                    consider(
                        &mut best,
                        Move::IntraMixedExchange(IntraMixedExchange {
                            s_vehicle: vehicle_id,
                            single_rank,
                            edge_rank,
                            span_start,
                            span_end,
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

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;

    #[test]
    fn test_intra_mixed_exchange_improves_sweep() {
        // 0 -> 7 -> 1 -> 2: swapping the single x=7 against the edge (1,2)
        // yields 0 -> 1 -> 2 -> 7.
        let problem = test_utils::euclidean_line_problem(&[7.0, 1.0, 2.0], &[0.0]);
        let mut solution = test_utils::solution_with_routes(
            &problem,
            vec![test_utils::TestRoute {
                vehicle: 0,
                jobs: vec![0, 1, 2],
            }],
        );
        let mut state = SolutionState::new(&problem);
        state.setup(&problem, &solution);

        let mv = find_best(&problem, &solution, &state).expect("intra mixed should fire");
        mv.apply(&problem, &mut solution);

        assert_eq!(test_utils::route_job_ids(&solution, 0), vec![1, 2, 0]);
    }
}
