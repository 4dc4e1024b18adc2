use crate::problem::{eval::Eval, job::JobIdx, vehicle::VehicleIdx, vrp::VehicleRoutingProblem};
use crate::search::operators::{
    JobList, LocalSearchOperator, Move, OperatorName, TieBreaker, VehicleList, consider,
    route_eval_of,
};
use crate::search::solution::{Solution, tw_route::sequence_is_feasible};
use crate::search::solution_state::SolutionState;

/// Replace a whole prefix or suffix of a route with one unassigned job of
/// strictly higher priority than everything it displaces. The displaced
/// jobs go back to the unassigned set.
#[derive(Debug)]
pub struct PriorityReplace {
    s_vehicle: VehicleIdx,
    /// Replacing `jobs[..=cut]` when `replace_start`, `jobs[cut..]`
    /// otherwise.
    cut: usize,
    replace_start: bool,
    unassigned_job: JobIdx,
    new_jobs: Vec<JobIdx>,
    displaced: Vec<JobIdx>,
    gain: Eval,
    priority_gain: i64,
}

impl LocalSearchOperator for PriorityReplace {
    fn name(&self) -> OperatorName {
        OperatorName::PriorityReplace
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
        let len = solution.route(self.s_vehicle).len();
        solution
            .route_mut(self.s_vehicle)
            .replace(problem, &self.new_jobs, 0, len);
        solution.mark_assigned(self.unassigned_job);
        for &job in &self.displaced {
            solution.mark_unassigned(job);
        }
    }

    fn addition_candidates(&self) -> VehicleList {
        VehicleList::from_slice(&[self.s_vehicle])
    }

    fn update_candidates(&self) -> VehicleList {
        VehicleList::from_slice(&[self.s_vehicle])
    }

    fn tie_breaker(&self) -> TieBreaker {
        TieBreaker::new(
            OperatorName::PriorityReplace,
            self.s_vehicle,
            self.cut,
            self.s_vehicle,
            usize::from(self.replace_start),
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
        let job = problem.job(unassigned_job);
        if !job.is_single() {
            continue;
        }
        let u_priority = i64::from(job.priority());
        if u_priority == 0 {
            continue;
        }

        for v in 0..problem.vehicles().len() {
            let vehicle_id = VehicleIdx::new(v);
            if !problem.vehicle_ok_with_job(vehicle_id, unassigned_job) {
                continue;
            }
            let route = solution.route(vehicle_id);
            if route.is_empty() {
                continue;
            }

            // Prefix replacement: [0..=cut] -> [u].
            let mut displaced_priority = 0i64;
            for cut in 0..route.len() {
                displaced_priority += i64::from(problem.job(route.job_at(cut)).priority());
                let priority_gain = u_priority - displaced_priority;
                if priority_gain <= 0 {
                    continue;
                }
                if route.pair_split_at(problem, cut + 1) {
                    continue;
                }

                let mut new_jobs = vec![unassigned_job];
                new_jobs.extend_from_slice(&route.jobs()[cut + 1..]);
                let gain =
                    state.route_eval(vehicle_id) - route_eval_of(problem, vehicle_id, &new_jobs);

                consider(
                    &mut best,
                    Move::PriorityReplace(PriorityReplace {
                        s_vehicle: vehicle_id,
                        cut,
                        replace_start: true,
                        unassigned_job,
                        new_jobs,
                        displaced: route.jobs()[..=cut].to_vec(),
                        gain,
                        priority_gain,
                    }),
                    problem,
                    solution,
                    state,
                );
            }

            // Suffix replacement: [cut..] -> [u].
            displaced_priority = 0;
            for cut in (0..route.len()).rev() {
                displaced_priority += i64::from(problem.job(route.job_at(cut)).priority());
                let priority_gain = u_priority - displaced_priority;
                if priority_gain <= 0 {
                    continue;
                }
                if route.pair_split_at(problem, cut) {
                    continue;
                }

                let mut new_jobs = route.jobs()[..cut].to_vec();
                new_jobs.push(unassigned_job);
                let gain =
                    state.route_eval(vehicle_id) - route_eval_of(problem, vehicle_id, &new_jobs);

                consider(
                    &mut best,
                    Move::PriorityReplace(PriorityReplace {
                        s_vehicle: vehicle_id,
                        cut,
                        replace_start: false,
                        unassigned_job,
                        new_jobs,
                        displaced: route.jobs()[cut..].to_vec(),
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

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;

    #[test]
    fn test_priority_replace_displaces_low_priority_suffix() {
        // Three low-priority jobs aboard, one high-priority job waiting that
        // only fits if it takes over part of the route.
        let problem = test_utils::priority_problem(
            &[(1.0, 1), (2.0, 1), (3.0, 1), (1.5, 10)],
            Some(3),
        );
        let mut solution = test_utils::solution_with_routes(
            &problem,
            vec![test_utils::TestRoute {
                vehicle: 0,
                jobs: vec![0, 1, 2],
            }],
        );
        let mut state = SolutionState::new(&problem);
        state.setup(&problem, &solution);

        let mv = find_best(&problem, &solution, &state).expect("priority replace should fire");
        assert!(mv.priority_gain() > 0);
        mv.apply(&problem, &mut solution);

        let route = test_utils::route_job_ids(&solution, 0);
        assert!(route.contains(&3));
        // Displaced jobs are back in the unassigned set.
        let displaced: Vec<usize> = solution
            .unassigned_sorted()
            .iter()
            .map(|j| j.get())
            .collect();
        assert!(!displaced.is_empty());
        assert!(displaced.iter().all(|id| *id != 3));
    }
}
