use crate::problem::{eval::Eval, job::JobIdx, vehicle::VehicleIdx, vrp::VehicleRoutingProblem};
use crate::search::insertion::three_best_insertions;
use crate::search::operators::{
    LocalSearchOperator, Move, OperatorName, TieBreaker, VehicleList, consider, route_eval_of,
};
use crate::search::solution::{Solution, tw_route::sequence_is_feasible};
use crate::search::solution_state::SolutionState;

/// SWAP*: exchange one job between two routes where each job lands at its
/// best re-insertion rank in the other route rather than in place.
///
/// Based on "Hybrid genetic search for the CVRP: Open-source implementation
/// and SWAP* neighborhood", Thibaut Vidal, 2022. Three candidate insertion
/// positions per job are enough: removing one job frees at most two of them.
#[derive(Debug)]
pub struct SwapStar {
    s_vehicle: VehicleIdx,
    t_vehicle: VehicleIdx,
    s_rank: usize,
    t_rank: usize,
    s_jobs: Vec<JobIdx>,
    t_jobs: Vec<JobIdx>,
    s_gain: Eval,
    t_gain: Eval,
}

impl LocalSearchOperator for SwapStar {
    fn name(&self) -> OperatorName {
        OperatorName::SwapStar
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
            OperatorName::SwapStar,
            self.s_vehicle,
            self.s_rank,
            self.t_vehicle,
            self.t_rank,
        )
    }
}

/// Remove `remove`, then place `insert_job` either in place of it
/// (`insert_at == None`) or at an original-coordinates rank.
fn build_sequence(
    jobs: &[JobIdx],
    remove: usize,
    insert_job: JobIdx,
    insert_at: Option<usize>,
) -> Vec<JobIdx> {
    let mut out = Vec::with_capacity(jobs.len());
    match insert_at {
        None => {
            out.extend_from_slice(jobs);
            out[remove] = insert_job;
        }
        Some(rank) => {
            out.extend_from_slice(&jobs[..remove]);
            out.extend_from_slice(&jobs[remove + 1..]);
            let adjusted = if rank > remove { rank - 1 } else { rank };
            out.insert(adjusted, insert_job);
        }
    }
    out
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

        for t in s + 1..vehicles {
            let t_vehicle = VehicleIdx::new(t);
            let t_route = solution.route(t_vehicle);
            if t_route.is_empty() {
                continue;
            }

            // Per-pair preprocessing: three cheapest insertion ranks of every
            // job of one route into the other.
            let top_into_t: Vec<_> = s_route
                .jobs()
                .iter()
                .map(|&job| {
                    if problem.job(job).is_single() {
                        three_best_insertions(problem, t_route, job)
                    } else {
                        Default::default()
                    }
                })
                .collect();
            let top_into_s: Vec<_> = t_route
                .jobs()
                .iter()
                .map(|&job| {
                    if problem.job(job).is_single() {
                        three_best_insertions(problem, s_route, job)
                    } else {
                        Default::default()
                    }
                })
                .collect();

            for s_rank in 0..s_route.len() {
                let s_job = s_route.job_at(s_rank);
                if !problem.job(s_job).is_single()
                    || !problem.vehicle_ok_with_job(t_vehicle, s_job)
                {
                    continue;
                }

                for t_rank in 0..t_route.len() {
                    let t_job = t_route.job_at(t_rank);
                    if !problem.job(t_job).is_single()
                        || !problem.vehicle_ok_with_job(s_vehicle, t_job)
                        || top_into_t[s_rank].is_empty()
                        || top_into_s[t_rank].is_empty()
                    {
                        continue;
                    }

                    // In-place plus the three best foreign ranks, each side.
                    let mut s_options: Vec<Option<usize>> = vec![None];
                    s_options.extend(
                        top_into_s[t_rank]
                            .iter()
                            .map(|(rank, _)| rank)
                            .filter(|&rank| rank != s_rank && rank != s_rank + 1)
                            .map(Some),
                    );
                    let mut t_options: Vec<Option<usize>> = vec![None];
                    t_options.extend(
                        top_into_t[s_rank]
                            .iter()
                            .map(|(rank, _)| rank)
                            .filter(|&rank| rank != t_rank && rank != t_rank + 1)
                            .map(Some),
                    );

                    for &s_insert in &s_options {
                        for &t_insert in &t_options {
                            let s_jobs =
                                build_sequence(s_route.jobs(), s_rank, t_job, s_insert);
                            let t_jobs =
                                build_sequence(t_route.jobs(), t_rank, s_job, t_insert);

                            let s_gain = state.route_eval(s_vehicle)
                                - route_eval_of(problem, s_vehicle, &s_jobs);
                            let t_gain = state.route_eval(t_vehicle)
                                - route_eval_of(problem, t_vehicle, &t_jobs);
                            if !(s_gain + t_gain).is_gain() {
                                continue;
                            }

                            consider(
                                &mut best,
                                Move::SwapStar(SwapStar {
                                    s_vehicle,
                                    t_vehicle,
                                    s_rank,
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
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;

    #[test]
    fn test_swap_star_relocates_both_jobs_to_best_ranks() {
        // The plain in-place exchange of the misplaced jobs is poor; each
        // belongs at a different rank of the other route.
        let problem = test_utils::euclidean_line_problem(
            &[1.0, 3.0, 12.0, 10.0, 8.0, 2.0],
            &[0.0, 11.0],
        );
        let mut solution = test_utils::solution_with_routes(
            &problem,
            vec![
                test_utils::TestRoute {
                    vehicle: 0,
                    jobs: vec![0, 2, 1],
                },
                test_utils::TestRoute {
                    vehicle: 1,
                    jobs: vec![3, 5, 4],
                },
            ],
        );
        let mut state = SolutionState::new(&problem);
        state.setup(&problem, &solution);

        let mv = find_best(&problem, &solution, &state).expect("swap* should fire");
        let before = state.total_eval().cost;
        mv.apply(&problem, &mut solution);
        state.setup(&problem, &solution);

        assert!((before - state.total_eval().cost - mv.gain().cost).abs() < 1e-9);

        // Job 2 (x=12) must end up with the right-hand vehicle and job 5
        // (x=2) with the left-hand one.
        assert!(test_utils::route_job_ids(&solution, 1).contains(&2));
        assert!(test_utils::route_job_ids(&solution, 0).contains(&5));
    }

    #[test]
    fn test_build_sequence_adjusts_rank_after_removal() {
        let jobs: Vec<JobIdx> = (0..4).map(JobIdx::new).collect();

        // Remove rank 1, insert at original rank 3.
        let seq = build_sequence(&jobs, 1, JobIdx::new(9), Some(3));
        let ids: Vec<usize> = seq.iter().map(|j| j.get()).collect();
        assert_eq!(ids, vec![0, 2, 9, 3]);

        // In place.
        let seq = build_sequence(&jobs, 2, JobIdx::new(9), None);
        let ids: Vec<usize> = seq.iter().map(|j| j.get()).collect();
        assert_eq!(ids, vec![0, 1, 9, 3]);
    }
}
