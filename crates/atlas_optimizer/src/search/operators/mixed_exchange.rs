use crate::problem::{eval::Eval, job::JobIdx, vehicle::VehicleIdx, vrp::VehicleRoutingProblem};
use crate::search::operators::{
    EdgeKind, LocalSearchOperator, Move, OperatorName, TieBreaker, VehicleList, consider,
    movable_edge,
};
use crate::search::solution::{Solution, tw_route::within_travel_bounds};
use crate::search::solution_state::SolutionState;

/// Swap one single job in the source route against a two-job edge in the
/// target route, with optional reversal of the edge as it lands in the
/// source.
#[derive(Debug)]
pub struct MixedExchange {
    s_vehicle: VehicleIdx,
    s_rank: usize,
    t_vehicle: VehicleIdx,
    t_rank: usize,
    reverse: bool,
    s_gain: Eval,
    t_gain: Eval,
}

impl MixedExchange {
    fn incoming_edge(&self, solution: &Solution) -> [JobIdx; 2] {
        let t_route = solution.route(self.t_vehicle);
        let (a, b) = (t_route.job_at(self.t_rank), t_route.job_at(self.t_rank + 1));
        if self.reverse { [b, a] } else { [a, b] }
    }
}

impl LocalSearchOperator for MixedExchange {
    fn name(&self) -> OperatorName {
        OperatorName::MixedExchange
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
        let edge = self.incoming_edge(solution);

        problem.vehicle_ok_with_job(self.t_vehicle, s_job)
            && edge
                .iter()
                .all(|&job| problem.vehicle_ok_with_job(self.s_vehicle, job))
            && s_route.is_valid_replacement(problem, &edge, self.s_rank, self.s_rank + 1)
            && t_route.is_valid_replacement(problem, &[s_job], self.t_rank, self.t_rank + 2)
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
        let edge = self.incoming_edge(solution);

        let (s_route, t_route) = solution.route_pair_mut(self.s_vehicle, self.t_vehicle);
        s_route.replace(problem, &edge, self.s_rank, self.s_rank + 1);
        t_route.replace(problem, &[s_job], self.t_rank, self.t_rank + 2);
    }

    fn addition_candidates(&self) -> VehicleList {
        VehicleList::from_slice(&[self.s_vehicle, self.t_vehicle])
    }

    fn update_candidates(&self) -> VehicleList {
        VehicleList::from_slice(&[self.s_vehicle, self.t_vehicle])
    }

    fn tie_breaker(&self) -> TieBreaker {
        TieBreaker::new(
            OperatorName::MixedExchange,
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
            if t_route.len() < 2 {
                continue;
            }

            for s_rank in 0..s_route.len() {
                let s_job = s_route.job_at(s_rank);
                if !problem.job(s_job).is_single()
                    || !problem.vehicle_ok_with_job(t_vehicle, s_job)
                {
                    continue;
                }

                for t_rank in 0..t_route.len() - 1 {
                    let Some(kind) = movable_edge(problem, t_route, t_rank) else {
                        continue;
                    };
                    let a = t_route.job_at(t_rank);
                    let b = t_route.job_at(t_rank + 1);
                    if !problem.vehicle_ok_with_job(s_vehicle, a)
                        || !problem.vehicle_ok_with_job(s_vehicle, b)
                    {
                        continue;
                    }

                    let t_gain =
                        t_route.replacement_gain(problem, &[s_job], t_rank, t_rank + 2);

                    for reverse in [false, true] {
                        if reverse && kind != EdgeKind::Singles {
                            continue;
                        }
                        let edge = if reverse { [b, a] } else { [a, b] };
                        let s_gain =
                            s_route.replacement_gain(problem, &edge, s_rank, s_rank + 1);
                        if !(s_gain + t_gain).is_gain() {
                            continue;
                        }

                        consider(
                            &mut best,
                            Move::MixedExchange(MixedExchange {
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
    fn test_mixed_exchange_applies_cleanly() {
        let problem =
            test_utils::euclidean_line_problem(&[9.0, 1.0, 2.0], &[0.0, 10.0]);
        let mut solution = test_utils::solution_with_routes(
            &problem,
            vec![
                test_utils::TestRoute {
                    vehicle: 0,
                    jobs: vec![0],
                },
                test_utils::TestRoute {
                    vehicle: 1,
                    jobs: vec![1, 2],
                },
            ],
        );
        let mut state = SolutionState::new(&problem);
        state.setup(&problem, &solution);

        // v0 (depot 0) serves x=9, v1 (depot 10) serves x=1,2: swapping the
        // single against the edge fixes both.
        let mv = find_best(&problem, &solution, &state).expect("mixed exchange should fire");
        let before = state.total_eval().cost;
        mv.apply(&problem, &mut solution);
        state.setup(&problem, &solution);

        assert!((before - state.total_eval().cost - mv.gain().cost).abs() < 1e-9);
        assert_eq!(test_utils::route_job_ids(&solution, 0), vec![1, 2]);
        assert_eq!(test_utils::route_job_ids(&solution, 1), vec![0]);
    }
}
