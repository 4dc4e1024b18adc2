use std::sync::Arc;
use std::time::Instant;

use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info};

use crate::problem::{job::JobIdx, vehicle::VehicleIdx, vrp::VehicleRoutingProblem};
use crate::problem::eval::Eval;
use crate::search::local_search::LocalSearch;
use crate::search::score::SolutionScore;
use crate::search::solution::Solution;
use crate::search::solution::raw_route::eval_of_sequence;
use crate::search::violations::{Violations, check_route};
use crate::utils::enumerate_idx::EnumerateIdx;

#[derive(Debug, thiserror::Error)]
pub enum SolverError {
    #[error("thread count must be at least 1")]
    NoThreads,
    #[error("initial solution has {routes} routes for {vehicles} vehicles")]
    RouteCountMismatch { routes: usize, vehicles: usize },
    #[error("job {job} is assigned to a route but still marked unassigned")]
    InconsistentUnassigned { job: usize },
}

/// Everything the core needs from its caller: a validated problem, a seed
/// solution from the constructive heuristic, and the search budget.
pub struct SearchInput {
    pub problem: Arc<VehicleRoutingProblem>,
    pub solution: Solution,
    pub deadline: Option<Instant>,
    pub seed: u64,
    pub max_nb_jobs_removal: usize,
    pub threads: usize,
}

#[derive(Debug)]
pub struct RouteSummary {
    pub vehicle: VehicleIdx,
    pub jobs: Vec<JobIdx>,
    pub eval: Eval,
    pub violations: Violations,
}

#[derive(Debug)]
pub struct SearchOutput {
    pub solution: Solution,
    pub score: SolutionScore,
    pub routes: Vec<RouteSummary>,
    pub unassigned: Vec<JobIdx>,
}

/// Entry point of the core. Runs `threads` independent searches over clones
/// of the initial solution (each with its own PRNG stream) and returns the
/// best result by the lexicographic objective; ties go to the lowest thread
/// index so the outcome is reproducible.
pub fn solve(input: SearchInput) -> Result<SearchOutput, SolverError> {
    validate(&input)?;

    let SearchInput {
        problem,
        solution,
        deadline,
        seed,
        max_nb_jobs_removal,
        threads,
    } = input;

    info!(
        threads,
        seed,
        max_nb_jobs_removal,
        jobs = problem.jobs().len(),
        vehicles = problem.vehicles().len(),
        "starting local search"
    );

    let results: Vec<(Solution, SolutionScore)> = (0..threads)
        .into_par_iter()
        .map(|thread| {
            let search = LocalSearch::new(
                &problem,
                solution.clone(),
                seed.wrapping_add(thread as u64),
                deadline,
                max_nb_jobs_removal,
            );
            search.run()
        })
        .collect();

    let (best, score) = results
        .into_iter()
        .reduce(|current, candidate| {
            if candidate.1.is_better_than(&current.1) {
                candidate
            } else {
                current
            }
        })
        .expect("at least one search thread ran");

    debug!(
        cost = score.cost,
        assigned = score.assigned,
        priority = score.priority,
        "search finished"
    );

    let routes = best
        .routes()
        .iter()
        .enumerate_idx()
        .map(|(vehicle_id, route)| {
            let mut eval = eval_of_sequence(&problem, vehicle_id, route.jobs());
            if !route.is_empty() {
                eval.cost += problem.fixed_cost(vehicle_id);
            }
            RouteSummary {
                vehicle: vehicle_id,
                jobs: route.jobs().to_vec(),
                eval,
                violations: check_route(&problem, vehicle_id, route),
            }
        })
        .collect();

    let unassigned = best.unassigned_sorted();

    Ok(SearchOutput {
        solution: best,
        score,
        routes,
        unassigned,
    })
}

fn validate(input: &SearchInput) -> Result<(), SolverError> {
    if input.threads == 0 {
        return Err(SolverError::NoThreads);
    }

    let routes = input.solution.routes().len();
    let vehicles = input.problem.vehicles().len();
    if routes != vehicles {
        return Err(SolverError::RouteCountMismatch { routes, vehicles });
    }

    for route in input.solution.routes() {
        for &job in route.jobs() {
            if input.solution.is_unassigned(job) {
                return Err(SolverError::InconsistentUnassigned { job: job.get() });
            }
        }
    }

    Ok(())
}
