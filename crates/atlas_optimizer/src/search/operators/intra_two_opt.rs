use crate::problem::{eval::Eval, job::JobIdx, vehicle::VehicleIdx, vrp::VehicleRoutingProblem};
use crate::search::operators::{
    LocalSearchOperator, Move, OperatorName, TieBreaker, VehicleList, consider,
};
use crate::search::solution::{Solution, tw_route::within_travel_bounds};
use crate::search::solution_state::SolutionState;

/// Reverse the segment `jobs[first_rank..=second_rank]` of one route.
/// Invalid when the segment contains both halves of a shipment, whose order
/// the reversal would flip.
#[derive(Debug)]
pub struct IntraTwoOpt {
    s_vehicle: VehicleIdx,
    first_rank: usize,
    second_rank: usize,
    new_inner: Vec<JobIdx>,
    gain: Eval,
}

impl LocalSearchOperator for IntraTwoOpt {
    fn name(&self) -> OperatorName {
        OperatorName::IntraTwoOpt
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
        !route.pair_within(problem, self.first_rank, self.second_rank + 1)
            && route.is_valid_replacement(
                problem,
                &self.new_inner,
                self.first_rank,
                self.second_rank + 1,
            )
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
            OperatorName::IntraTwoOpt,
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
            for second_rank in first_rank + 1..route.len() {
                let new_inner: Vec<JobIdx> = route.jobs()[first_rank..=second_rank]
                    .iter()
                    .rev()
                    .copied()
                    .collect();

                let gain =
                    route.replacement_gain(problem, &new_inner, first_rank, second_rank + 1);
                if !gain.is_gain() {
                    continue;
                }

                consider(
                    &mut best,
                    Move::IntraTwoOpt(IntraTwoOpt {
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
    fn test_intra_two_opt_uncrosses_square_route() {
        // Square corners visited criss-cross; reversing a segment uncrosses.
        let problem = test_utils::euclidean_problem(
            &[(0.0, 0.0), (10.0, 0.0), (0.0, 10.0), (10.0, 10.0)],
            &[(0.0, 0.0)],
        );
        let mut solution = test_utils::solution_with_routes(
            &problem,
            vec![test_utils::TestRoute {
                vehicle: 0,
                jobs: vec![0, 2, 1, 3],
            }],
        );
        let mut state = SolutionState::new(&problem);
        state.setup(&problem, &solution);

        let before = state.route_eval(VehicleIdx::new(0)).cost;
        let mv = find_best(&problem, &solution, &state).expect("intra two-opt should fire");
        mv.apply(&problem, &mut solution);
        state.update_route(&problem, &solution, VehicleIdx::new(0));

        let after = state.route_eval(VehicleIdx::new(0)).cost;
        assert!(after < before);
        // Reversing the (1, 3) tail yields the uncrossed sweep around the
        // square.
        assert_eq!(test_utils::route_job_ids(&solution, 0), vec![0, 2, 3, 1]);
    }

    #[test]
    fn test_reversal_and_mirror_round_trip() {
        let problem = test_utils::euclidean_line_problem(&[3.0, 1.0, 4.0, 2.0], &[0.0]);
        let mut solution = test_utils::solution_with_routes(
            &problem,
            vec![test_utils::TestRoute {
                vehicle: 0,
                jobs: vec![0, 1, 2, 3],
            }],
        );
        let original = solution.clone();

        let segment: Vec<crate::problem::job::JobIdx> = solution
            .route(VehicleIdx::new(0))
            .jobs()[1..=2]
            .iter()
            .rev()
            .copied()
            .collect();
        let forward = IntraTwoOpt {
            s_vehicle: VehicleIdx::new(0),
            first_rank: 1,
            second_rank: 2,
            new_inner: segment.clone(),
            gain: Eval::ZERO,
        };
        let mirror = IntraTwoOpt {
            s_vehicle: VehicleIdx::new(0),
            first_rank: 1,
            second_rank: 2,
            new_inner: segment.iter().rev().copied().collect(),
            gain: Eval::ZERO,
        };

        forward.apply(&problem, &mut solution);
        mirror.apply(&problem, &mut solution);

        assert!(solution.is_identical(&original));
    }

    #[test]
    fn test_intra_two_opt_single_job_route_no_gain() {
        let problem = test_utils::euclidean_line_problem(&[5.0], &[0.0]);
        let solution = test_utils::solution_with_routes(
            &problem,
            vec![test_utils::TestRoute {
                vehicle: 0,
                jobs: vec![0],
            }],
        );
        let mut state = SolutionState::new(&problem);
        state.setup(&problem, &solution);

        assert!(find_best(&problem, &solution, &state).is_none());
    }
}
