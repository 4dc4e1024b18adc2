use crate::problem::{eval::Eval, job::JobIdx, vehicle::VehicleIdx, vrp::VehicleRoutingProblem};
use crate::search::operators::{
    LocalSearchOperator, Move, OperatorName, TieBreaker, VehicleList, consider, route_eval_of,
};
use crate::search::solution::{Solution, tw_route::sequence_is_feasible};
use crate::search::solution_state::SolutionState;

/// Split one route across two empty vehicles when serving the two halves
/// separately is cheaper than the single route, fixed costs included.
#[derive(Debug)]
pub struct RouteSplit {
    s_vehicle: VehicleIdx,
    split_rank: usize,
    begin_vehicle: VehicleIdx,
    end_vehicle: VehicleIdx,
    begin_jobs: Vec<JobIdx>,
    end_jobs: Vec<JobIdx>,
    gain: Eval,
}

impl LocalSearchOperator for RouteSplit {
    fn name(&self) -> OperatorName {
        OperatorName::RouteSplit
    }

    fn gain(&self) -> Eval {
        self.gain
    }

    fn is_valid(
        &self,
        problem: &VehicleRoutingProblem,
        solution: &Solution,
        _state: &SolutionState,
    ) -> bool {
        solution.route(self.begin_vehicle).is_empty()
            && solution.route(self.end_vehicle).is_empty()
            && sequence_is_feasible(problem, self.begin_vehicle, &self.begin_jobs)
            && sequence_is_feasible(problem, self.end_vehicle, &self.end_jobs)
    }

    fn apply(&self, problem: &VehicleRoutingProblem, solution: &mut Solution) {
        let s_len = solution.route(self.s_vehicle).len();
        solution
            .route_mut(self.s_vehicle)
            .replace(problem, &[], 0, s_len);
        solution
            .route_mut(self.begin_vehicle)
            .replace(problem, &self.begin_jobs, 0, 0);
        solution
            .route_mut(self.end_vehicle)
            .replace(problem, &self.end_jobs, 0, 0);
    }

    fn addition_candidates(&self) -> VehicleList {
        VehicleList::from_slice(&[self.s_vehicle, self.begin_vehicle, self.end_vehicle])
    }

    fn update_candidates(&self) -> VehicleList {
        VehicleList::from_slice(&[self.s_vehicle, self.begin_vehicle, self.end_vehicle])
    }

    fn tie_breaker(&self) -> TieBreaker {
        TieBreaker::new(
            OperatorName::RouteSplit,
            self.s_vehicle,
            self.split_rank,
            self.begin_vehicle,
            self.end_vehicle.get(),
        )
    }
}

/// `best_known` lets the engine prune: only strictly better splits are
/// reported.
pub(crate) fn find_best(
    problem: &VehicleRoutingProblem,
    solution: &Solution,
    state: &SolutionState,
    best_known: Eval,
) -> Option<Move> {
    let empty_vehicles = solution.empty_vehicles();
    if empty_vehicles.len() < 2 {
        return None;
    }

    let mut best: Option<Move> = None;
    let floor = if best_known.is_no_gain() {
        0.0
    } else {
        best_known.cost
    };

    for s in 0..problem.vehicles().len() {
        let s_vehicle = VehicleIdx::new(s);
        let s_route = solution.route(s_vehicle);
        if s_route.len() < 2 {
            continue;
        }

        for split_rank in 1..s_route.len() {
            if s_route.pair_split_at(problem, split_rank) {
                continue;
            }
            let begin_jobs = s_route.jobs()[..split_rank].to_vec();
            let end_jobs = s_route.jobs()[split_rank..].to_vec();

            for &begin_vehicle in &empty_vehicles {
                if begin_vehicle == s_vehicle {
                    continue;
                }
                let begin_eval = route_eval_of(problem, begin_vehicle, &begin_jobs);

                for &end_vehicle in &empty_vehicles {
                    if end_vehicle == s_vehicle || end_vehicle == begin_vehicle {
                        continue;
                    }
                    let end_eval = route_eval_of(problem, end_vehicle, &end_jobs);
                    let gain = state.route_eval(s_vehicle) - begin_eval - end_eval;
                    if !gain.is_gain() || gain.cost <= floor {
                        continue;
                    }

                    consider(
                        &mut best,
                        Move::RouteSplit(RouteSplit {
                            s_vehicle,
                            split_rank,
                            begin_vehicle,
                            end_vehicle,
                            begin_jobs: begin_jobs.clone(),
                            end_jobs: end_jobs.clone(),
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
    fn test_route_split_uses_two_better_placed_vehicles() {
        // One central vehicle serves two far-apart clusters; two idle
        // vehicles sit right on them.
        let problem = test_utils::euclidean_line_problem(
            &[-10.0, -11.0, 10.0, 11.0],
            &[0.0, -10.0, 10.0],
        );
        let mut solution = test_utils::solution_with_routes(
            &problem,
            vec![
                test_utils::TestRoute {
                    vehicle: 0,
                    jobs: vec![0, 1, 2, 3],
                },
                test_utils::TestRoute {
                    vehicle: 1,
                    jobs: vec![],
                },
                test_utils::TestRoute {
                    vehicle: 2,
                    jobs: vec![],
                },
            ],
        );
        let mut state = SolutionState::new(&problem);
        state.setup(&problem, &solution);

        let mv =
            find_best(&problem, &solution, &state, Eval::NO_GAIN).expect("split should fire");
        mv.apply(&problem, &mut solution);

        assert!(test_utils::route_job_ids(&solution, 0).is_empty());
        assert_eq!(test_utils::route_job_ids(&solution, 1), vec![0, 1]);
        assert_eq!(test_utils::route_job_ids(&solution, 2), vec![2, 3]);
    }
}
