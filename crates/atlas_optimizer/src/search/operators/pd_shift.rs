use crate::problem::{eval::Eval, job::JobIdx, vehicle::VehicleIdx, vrp::VehicleRoutingProblem};
use crate::search::insertion::best_pair_insertion;
use crate::search::operators::{
    LocalSearchOperator, Move, OperatorName, TieBreaker, VehicleList, consider, route_eval_of,
};
use crate::search::solution::{Solution, tw_route::sequence_is_feasible};
use crate::search::solution_state::SolutionState;

/// Move a pickup/delivery pair from the source route to its cheapest
/// feasible rank pair in the target route, pickup kept before delivery.
#[derive(Debug)]
pub struct PdShift {
    s_vehicle: VehicleIdx,
    t_vehicle: VehicleIdx,
    pickup_rank: usize,
    delivery_rank: usize,
    s_jobs: Vec<JobIdx>,
    t_jobs: Vec<JobIdx>,
    s_gain: Eval,
    t_gain: Eval,
}

impl LocalSearchOperator for PdShift {
    fn name(&self) -> OperatorName {
        OperatorName::PdShift
    }

    fn gain(&self) -> Eval {
        self.s_gain + self.t_gain
    }

    fn is_valid(
        &self,
        problem: &VehicleRoutingProblem,
        _solution: &Solution,
        _state: &SolutionState,
    ) -> bool {
        sequence_is_feasible(problem, self.s_vehicle, &self.s_jobs)
            && sequence_is_feasible(problem, self.t_vehicle, &self.t_jobs)
    }

    fn apply(&self, problem: &VehicleRoutingProblem, solution: &mut Solution) {
        let (s_route, t_route) = solution.route_pair_mut(self.s_vehicle, self.t_vehicle);
        let s_len = s_route.len();
        let t_len = t_route.len();
        s_route.replace(problem, &self.s_jobs, 0, s_len);
        t_route.replace(problem, &self.t_jobs, 0, t_len);
    }

    fn addition_candidates(&self) -> VehicleList {
        VehicleList::from_slice(&[self.s_vehicle, self.t_vehicle])
    }

    fn update_candidates(&self) -> VehicleList {
        VehicleList::from_slice(&[self.s_vehicle, self.t_vehicle])
    }

    fn tie_breaker(&self) -> TieBreaker {
        TieBreaker::new(
            OperatorName::PdShift,
            self.s_vehicle,
            self.pickup_rank,
            self.t_vehicle,
            self.delivery_rank,
        )
    }
}

pub(crate) fn find_best(
    problem: &VehicleRoutingProblem,
    solution: &Solution,
    state: &SolutionState,
) -> Option<Move> {
    if !problem.has_shipments() {
        return None;
    }

    let mut best: Option<Move> = None;
    let vehicles = problem.vehicles().len();

    for s in 0..vehicles {
        let s_vehicle = VehicleIdx::new(s);
        let s_route = solution.route(s_vehicle);
        if s_route.len() < 2 {
            continue;
        }

        for pickup_rank in 0..s_route.len() {
            let pickup = s_route.job_at(pickup_rank);
            if !problem.job(pickup).is_pickup() {
                continue;
            }
            let Some(delivery) = problem.paired_job(pickup) else {
                continue;
            };
            let Some(delivery_rank) = s_route.position_of(delivery) else {
                continue;
            };

            // Source after removing both halves.
            let s_jobs: Vec<JobIdx> = s_route
                .jobs()
                .iter()
                .copied()
                .filter(|&job| job != pickup && job != delivery)
                .collect();

            let s_gain =
                state.route_eval(s_vehicle) - route_eval_of(problem, s_vehicle, &s_jobs);

            for t in 0..vehicles {
                if s == t {
                    continue;
                }
                let t_vehicle = VehicleIdx::new(t);
                let t_route = solution.route(t_vehicle);

                let Some((p_rank, d_rank, _)) =
                    best_pair_insertion(problem, t_route, pickup, delivery)
                else {
                    continue;
                };

                let mut t_jobs: Vec<JobIdx> = Vec::with_capacity(t_route.len() + 2);
                t_jobs.extend_from_slice(&t_route.jobs()[..p_rank]);
                t_jobs.push(pickup);
                t_jobs.extend_from_slice(&t_route.jobs()[p_rank..d_rank]);
                t_jobs.push(delivery);
                t_jobs.extend_from_slice(&t_route.jobs()[d_rank..]);

                let t_gain =
                    state.route_eval(t_vehicle) - route_eval_of(problem, t_vehicle, &t_jobs);
                if !(s_gain + t_gain).is_gain() {
                    continue;
                }

                consider(
                    &mut best,
                    Move::PdShift(PdShift {
                        s_vehicle,
                        t_vehicle,
                        pickup_rank,
                        delivery_rank,
                        s_jobs: s_jobs.clone(),
                        t_jobs,
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

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;

    #[test]
    fn test_pd_shift_moves_pair_and_keeps_order() {
        let problem = test_utils::pd_two_vehicle_problem();
        let mut solution = test_utils::solution_with_routes(
            &problem,
            vec![
                test_utils::TestRoute {
                    vehicle: 0,
                    jobs: vec![2, 0, 3, 1],
                },
                test_utils::TestRoute {
                    vehicle: 1,
                    jobs: vec![],
                },
            ],
        );
        let mut state = SolutionState::new(&problem);
        state.setup(&problem, &solution);

        let mv = find_best(&problem, &solution, &state).expect("pd shift should fire");
        mv.apply(&problem, &mut solution);

        let target = test_utils::route_job_ids(&solution, 1);
        let p_pos = target.iter().position(|&j| j == 0).unwrap();
        let d_pos = target.iter().position(|&j| j == 1).unwrap();
        assert!(p_pos < d_pos, "pickup must stay before its delivery");

        let source = test_utils::route_job_ids(&solution, 0);
        assert!(!source.contains(&0) && !source.contains(&1));
    }
}
