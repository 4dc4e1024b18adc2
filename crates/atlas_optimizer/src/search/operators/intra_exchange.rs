use crate::problem::{eval::Eval, job::JobIdx, vehicle::VehicleIdx, vrp::VehicleRoutingProblem};
use crate::search::operators::{
    LocalSearchOperator, Move, OperatorName, TieBreaker, VehicleList, consider,
};
use crate::search::solution::{Solution, tw_route::within_travel_bounds};
use crate::search::solution_state::SolutionState;

/// Swap two single jobs within one route.
#[derive(Debug)]
pub struct IntraExchange {
    s_vehicle: VehicleIdx,
    first_rank: usize,
    second_rank: usize,
    new_inner: Vec<JobIdx>,
    gain: Eval,
}

impl LocalSearchOperator for IntraExchange {
    fn name(&self) -> OperatorName {
        OperatorName::IntraExchange
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
        route.is_valid_replacement(problem, &self.new_inner, self.first_rank, self.second_rank + 1)
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
            self.second_rank + 1,
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
            OperatorName::IntraExchange,
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
        if route.len() < 2 {
            continue;
        }

        for first_rank in 0..route.len() - 1 {
            if !problem.job(route.job_at(first_rank)).is_single() {
                continue;
            }
            for second_rank in first_rank + 1..route.len() {
                if !problem.job(route.job_at(second_rank)).is_single() {
                    continue;
                }

                let mut new_inner: Vec<JobIdx> =
                    route.jobs()[first_rank..=second_rank].to_vec();
                let last = new_inner.len() - 1;
                new_inner.swap(0, last);

                let gain = route.replacement_gain(
                    problem,
                    &new_inner,
                    first_rank,
                    second_rank + 1,
                );
                if !gain.is_gain() {
                    continue;
                }

                consider(
                    &mut best,
                    Move::IntraExchange(IntraExchange {
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

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;

    #[test]
    fn test_intra_exchange_fixes_swapped_stops() {
        let problem = test_utils::euclidean_line_problem(&[3.0, 1.0, 2.0], &[0.0]);
        let mut solution = test_utils::solution_with_routes(
            &problem,
            vec![test_utils::TestRoute {
                vehicle: 0,
                jobs: vec![0, 1, 2],
            }],
        );
        let mut state = SolutionState::new(&problem);
        state.setup(&problem, &solution);

        // 0 -> 3 -> 1 -> 2 costs 3+2+1 = 6; swapping ranks 0 and 1 gives
        // 0 -> 1 -> 3 -> 2 costs 1+2+1 = 4.
        let mv = find_best(&problem, &solution, &state).expect("intra exchange should fire");
        mv.apply(&problem, &mut solution);

        assert_eq!(test_utils::route_job_ids(&solution, 0), vec![1, 0, 2]);
    }
}
