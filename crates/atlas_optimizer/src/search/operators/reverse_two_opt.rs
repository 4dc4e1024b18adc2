use crate::problem::{eval::Eval, job::JobIdx, vehicle::VehicleIdx, vrp::VehicleRoutingProblem};
use crate::search::operators::{
    LocalSearchOperator, Move, OperatorName, TieBreaker, VehicleList, consider, route_eval_of,
};
use crate::search::solution::{Solution, tw_route::sequence_is_feasible};
use crate::search::solution_state::SolutionState;

/// 2-opt* with reversal: the source keeps its head and receives the
/// reversed target head; the target keeps its tail preceded by the reversed
/// source tail. Asymmetric, so all ordered route pairs are scanned.
#[derive(Debug)]
pub struct ReverseTwoOpt {
    s_vehicle: VehicleIdx,
    s_rank: usize,
    t_vehicle: VehicleIdx,
    t_rank: usize,
    s_jobs: Vec<JobIdx>,
    t_jobs: Vec<JobIdx>,
    s_gain: Eval,
    t_gain: Eval,
}

impl LocalSearchOperator for ReverseTwoOpt {
    fn name(&self) -> OperatorName {
        OperatorName::ReverseTwoOpt
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
            OperatorName::ReverseTwoOpt,
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
            if t_route.is_empty() {
                continue;
            }

            for s_rank in 0..s_route.len() {
                for t_rank in 0..t_route.len() {
                    let mut s_jobs: Vec<JobIdx> = s_route.jobs()[..=s_rank].to_vec();
                    s_jobs.extend(t_route.jobs()[..=t_rank].iter().rev());
                    let mut t_jobs: Vec<JobIdx> =
                        s_route.jobs()[s_rank + 1..].iter().rev().copied().collect();
                    t_jobs.extend_from_slice(&t_route.jobs()[t_rank + 1..]);

                    let s_gain = state.route_eval(s_vehicle)
                        - route_eval_of(problem, s_vehicle, &s_jobs);
                    let t_gain = state.route_eval(t_vehicle)
                        - route_eval_of(problem, t_vehicle, &t_jobs);
                    if !(s_gain + t_gain).is_gain() {
                        continue;
                    }

                    consider(
                        &mut best,
                        Move::ReverseTwoOpt(ReverseTwoOpt {
                            s_vehicle,
                            s_rank,
                            t_vehicle,
                            t_rank,
                            s_jobs,
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
    }

    best
}
