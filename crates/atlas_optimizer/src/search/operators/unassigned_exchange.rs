use crate::problem::{eval::Eval, job::JobIdx, vehicle::VehicleIdx, vrp::VehicleRoutingProblem};
use crate::search::operators::{
    JobList, LocalSearchOperator, Move, OperatorName, TieBreaker, VehicleList, consider,
    route_eval_of,
};
use crate::search::solution::{Solution, tw_route::sequence_is_feasible};
use crate::search::solution_state::SolutionState;

/// Bring an unassigned job into a route by evicting one assigned job.
/// Worth applying when it raises total priority, or at equal priority when
/// it lowers cost.
#[derive(Debug)]
pub struct UnassignedExchange {
    s_vehicle: VehicleIdx,
    s_rank: usize,
    insert_rank: usize,
    unassigned_job: JobIdx,
    new_jobs: Vec<JobIdx>,
    gain: Eval,
    priority_gain: i64,
}

impl UnassignedExchange {
    fn evicted(&self, solution: &Solution) -> JobIdx {
        solution.route(self.s_vehicle).job_at(self.s_rank)
    }
}

impl LocalSearchOperator for UnassignedExchange {
    fn name(&self) -> OperatorName {
        OperatorName::UnassignedExchange
    }

    fn gain(&self) -> Eval {
        self.gain
    }

    fn priority_gain(&self) -> i64 {
        self.priority_gain
    }

    fn required_unassigned(&self) -> JobList {
        JobList::from_slice(&[self.unassigned_job])
    }

    fn is_valid(
        &self,
        problem: &VehicleRoutingProblem,
        solution: &Solution,
        _state: &SolutionState,
    ) -> bool {
        solution.is_unassigned(self.unassigned_job)
            && sequence_is_feasible(problem, self.s_vehicle, &self.new_jobs)
    }

    fn apply(&self, problem: &VehicleRoutingProblem, solution: &mut Solution) {
        let evicted = self.evicted(solution);
        let len = solution.route(self.s_vehicle).len();
        solution
            .route_mut(self.s_vehicle)
            .replace(problem, &self.new_jobs, 0, len);
        solution.mark_assigned(self.unassigned_job);
        solution.mark_unassigned(evicted);
    }

    fn addition_candidates(&self) -> VehicleList {
        VehicleList::from_slice(&[self.s_vehicle])
    }

    fn update_candidates(&self) -> VehicleList {
        VehicleList::from_slice(&[self.s_vehicle])
    }

    fn tie_breaker(&self) -> TieBreaker {
        TieBreaker::new(
            OperatorName::UnassignedExchange,
            self.s_vehicle,
            self.s_rank,
            self.s_vehicle,
            self.insert_rank,
        )
    }
}

pub(crate) fn find_best(
    problem: &VehicleRoutingProblem,
    solution: &Solution,
    state: &SolutionState,
) -> Option<Move> {
    let mut best: Option<Move> = None;

    for unassigned_job in solution.unassigned_sorted() {
        if !problem.job(unassigned_job).is_single() {
            continue;
        }
        let u_priority = i64::from(problem.job(unassigned_job).priority());

        for v in 0..problem.vehicles().len() {
            let vehicle_id = VehicleIdx::new(v);
            if !problem.vehicle_ok_with_job(vehicle_id, unassigned_job) {
                continue;
            }
            let route = solution.route(vehicle_id);
            if route.is_empty() {
                continue;
            }

            let (begin, end) = state.insertion_range(vehicle_id, unassigned_job);
            if begin > end {
                continue;
            }

            for s_rank in 0..route.len() {
                let evicted = route.job_at(s_rank);
                if !problem.job(evicted).is_single() {
                    continue;
                }
                let priority_gain = u_priority - i64::from(problem.job(evicted).priority());
                if priority_gain < 0 {
                    continue;
                }

                for insert_rank in begin..=end.min(route.len()) {
                    if insert_rank == s_rank + 1 {
                        // Same spot as replacing in place at s_rank.
                        continue;
                    }

                    let mut new_jobs: Vec<JobIdx> = Vec::with_capacity(route.len());
                    new_jobs.extend_from_slice(&route.jobs()[..s_rank]);
                    new_jobs.extend_from_slice(&route.jobs()[s_rank + 1..]);
                    let adjusted = if insert_rank > s_rank {
                        insert_rank - 1
                    } else {
                        insert_rank
                    };
                    new_jobs.insert(adjusted, unassigned_job);

                    let gain = state.route_eval(vehicle_id)
                        - route_eval_of(problem, vehicle_id, &new_jobs);
                    if priority_gain == 0 && !gain.is_gain() {
                        continue;
                    }

                    consider(
                        &mut best,
                        Move::UnassignedExchange(UnassignedExchange {
                            s_vehicle: vehicle_id,
                            s_rank,
                            insert_rank,
                            unassigned_job,
                            new_jobs,
                            gain,
                            priority_gain,
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
