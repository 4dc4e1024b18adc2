use crate::problem::{eval::Eval, job::JobIdx, vehicle::VehicleIdx, vrp::VehicleRoutingProblem};
use crate::search::operators::{
    LocalSearchOperator, Move, OperatorName, TieBreaker, VehicleList, consider,
};
use crate::search::solution::{Solution, tw_route::within_travel_bounds};
use crate::search::solution_state::SolutionState;

/// Move one single job to another position in the same route.
#[derive(Debug)]
pub struct IntraRelocate {
    s_vehicle: VehicleIdx,
    s_rank: usize,
    /// Insertion position measured on the route after removal.
    t_rank: usize,
    span_start: usize,
    span_end: usize,
    new_inner: Vec<JobIdx>,
    gain: Eval,
}

impl LocalSearchOperator for IntraRelocate {
    fn name(&self) -> OperatorName {
        OperatorName::IntraRelocate
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
            OperatorName::IntraRelocate,
            self.s_vehicle,
            self.s_rank,
            self.s_vehicle,
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

    for v in 0..problem.vehicles().len() {
        let vehicle_id = VehicleIdx::new(v);
        let route = solution.route(vehicle_id);
        if route.len() < 2 {
            continue;
        }

        for s_rank in 0..route.len() {
            let job = route.job_at(s_rank);
            if !problem.job(job).is_single() {
                continue;
            }

            for t_rank in 0..route.len() {
                if t_rank == s_rank {
                    continue;
                }

                let (span_start, span_end, new_inner) = if t_rank < s_rank {
                    let mut inner = vec![job];
                    inner.extend_from_slice(&route.jobs()[t_rank..s_rank]);
                    (t_rank, s_rank + 1, inner)
                } else {
                    let mut inner = route.jobs()[s_rank + 1..=t_rank].to_vec();
                    inner.push(job);
                    (s_rank, t_rank + 1, inner)
                };

                let gain = route.replacement_gain(problem, &new_inner, span_start, span_end);
                if !gain.is_gain() {
                    continue;
                }

                consider(
                    &mut best,
                    Move::IntraRelocate(IntraRelocate {
                        s_vehicle: vehicle_id,
                        s_rank,
                        t_rank,
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

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;

    #[test]
    fn test_intra_relocate_moves_stop_into_order() {
        // 0 -> 4 -> 1 -> 2 -> 3: moving x=4 to the end sorts the sweep.
        let problem = test_utils::euclidean_line_problem(&[4.0, 1.0, 2.0, 3.0], &[0.0]);
        let mut solution = test_utils::solution_with_routes(
            &problem,
            vec![test_utils::TestRoute {
                vehicle: 0,
                jobs: vec![0, 1, 2, 3],
            }],
        );
        let mut state = SolutionState::new(&problem);
        state.setup(&problem, &solution);

        let mv = find_best(&problem, &solution, &state).expect("intra relocate should fire");
        mv.apply(&problem, &mut solution);

        assert_eq!(test_utils::route_job_ids(&solution, 0), vec![1, 2, 3, 0]);
    }
}
