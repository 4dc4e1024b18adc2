use crate::problem::{eval::Eval, job::JobIdx, vehicle::VehicleIdx, vrp::VehicleRoutingProblem};
use crate::search::solution::{Solution, raw_route::eval_of_sequence, tw_route::TwRoute};

/// Derived per-vehicle caches recomputed lazily when a route is touched.
/// Operators read these instead of the matrices in their hot paths; the
/// engine refreshes exactly the vehicles named by an applied move's
/// candidates.
pub struct SolutionState {
    /// Total route eval, vehicle fixed cost included for non-empty routes.
    route_evals: Vec<Eval>,
    /// `edge_evals_around_node[v][i]`: eval(pred -> i) + eval(i -> succ).
    edge_evals_around_node: Vec<Vec<Eval>>,
    /// Eval saved by removing the job at rank i.
    node_gains: Vec<Vec<Eval>>,
    /// Eval saved by removing the two consecutive jobs at ranks i, i+1.
    edge_gains: Vec<Vec<Eval>>,
    /// Plausible insertion rank window per (vehicle, job), from time-window
    /// screening; the full 0..=len window when the problem has no TWs.
    insertion_ranks_begin: Vec<Vec<usize>>,
    insertion_ranks_end: Vec<Vec<usize>>,
    /// Rank of the route job nearest to each foreign job, by edge cost from
    /// the route job (`from`) or to it (`to`).
    nearest_job_rank_from: Vec<Vec<Option<usize>>>,
    nearest_job_rank_to: Vec<Vec<Option<usize>>>,
}

impl SolutionState {
    pub fn new(problem: &VehicleRoutingProblem) -> Self {
        let vehicles = problem.vehicles().len();
        let jobs = problem.jobs().len();

        SolutionState {
            route_evals: vec![Eval::ZERO; vehicles],
            edge_evals_around_node: vec![Vec::new(); vehicles],
            node_gains: vec![Vec::new(); vehicles],
            edge_gains: vec![Vec::new(); vehicles],
            insertion_ranks_begin: vec![vec![0; jobs]; vehicles],
            insertion_ranks_end: vec![vec![0; jobs]; vehicles],
            nearest_job_rank_from: vec![vec![None; jobs]; vehicles],
            nearest_job_rank_to: vec![vec![None; jobs]; vehicles],
        }
    }

    pub fn setup(&mut self, problem: &VehicleRoutingProblem, solution: &Solution) {
        for rank in 0..problem.vehicles().len() {
            self.update_route(problem, solution, VehicleIdx::new(rank));
        }
    }

    pub fn route_eval(&self, vehicle_id: VehicleIdx) -> Eval {
        self.route_evals[vehicle_id.get()]
    }

    pub fn total_eval(&self) -> Eval {
        self.route_evals.iter().copied().sum()
    }

    pub fn edge_eval_around_node(&self, vehicle_id: VehicleIdx, rank: usize) -> Eval {
        self.edge_evals_around_node[vehicle_id.get()][rank]
    }

    pub fn node_gain(&self, vehicle_id: VehicleIdx, rank: usize) -> Eval {
        self.node_gains[vehicle_id.get()][rank]
    }

    pub fn edge_gain(&self, vehicle_id: VehicleIdx, rank: usize) -> Eval {
        self.edge_gains[vehicle_id.get()][rank]
    }

    /// Insertion rank window `[begin, end]` (inclusive of `end` as an
    /// insertion position) for `job_id` in the route of `vehicle_id`.
    pub fn insertion_range(&self, vehicle_id: VehicleIdx, job_id: JobIdx) -> (usize, usize) {
        (
            self.insertion_ranks_begin[vehicle_id.get()][job_id.get()],
            self.insertion_ranks_end[vehicle_id.get()][job_id.get()],
        )
    }

    pub fn nearest_job_rank_from(&self, vehicle_id: VehicleIdx, job_id: JobIdx) -> Option<usize> {
        self.nearest_job_rank_from[vehicle_id.get()][job_id.get()]
    }

    pub fn nearest_job_rank_to(&self, vehicle_id: VehicleIdx, job_id: JobIdx) -> Option<usize> {
        self.nearest_job_rank_to[vehicle_id.get()][job_id.get()]
    }

    /// Recompute every cache entry of one vehicle.
    pub fn update_route(
        &mut self,
        problem: &VehicleRoutingProblem,
        solution: &Solution,
        vehicle_id: VehicleIdx,
    ) {
        let route = solution.route(vehicle_id);
        let v = vehicle_id.get();
        let n = route.len();

        let mut eval = eval_of_sequence(problem, vehicle_id, route.jobs());
        if n > 0 {
            eval.cost += problem.fixed_cost(vehicle_id);
        }
        self.route_evals[v] = eval;

        self.edge_evals_around_node[v].clear();
        self.node_gains[v].clear();
        self.edge_gains[v].clear();

        for rank in 0..n {
            let location = route.location_at(problem, rank);
            let prev = route.previous_location(problem, rank);
            let next = route.next_location(problem, rank);

            let around = problem.eval_between(vehicle_id, prev, Some(location))
                + problem.eval_between(vehicle_id, Some(location), next);
            self.edge_evals_around_node[v].push(around);
            self.node_gains[v]
                .push(around - problem.eval_between(vehicle_id, prev, next));
        }

        for rank in 0..n.saturating_sub(1) {
            self.edge_gains[v].push(route.replacement_gain(problem, &[], rank, rank + 2));
        }

        self.update_job_caches(problem, route, vehicle_id);
    }

    fn update_job_caches(
        &mut self,
        problem: &VehicleRoutingProblem,
        route: &TwRoute,
        vehicle_id: VehicleIdx,
    ) {
        let v = vehicle_id.get();
        let n = route.len();
        let screen_tw = problem.has_time_windows() && n > 0;

        for (j, job) in problem.jobs().iter().enumerate() {
            let job_id = JobIdx::new(j);

            if !screen_tw {
                self.insertion_ranks_begin[v][j] = 0;
                self.insertion_ranks_end[v][j] = n;
            } else {
                // Both `earliest` and `latest` are nondecreasing along the
                // route. Inserting at rank r is implausible when the step
                // that would follow the job cannot be pushed behind the
                // job's first window, or when the step before r already
                // starts after the job's last window closes.
                let latest_end = job.time_windows().latest_end();
                let earliest_start = job.time_windows().earliest_start();

                let mut begin = 0;
                while begin < n && route.latest(begin) < earliest_start {
                    begin += 1;
                }
                let mut end = n;
                while end > 0 && route.earliest(end - 1) > latest_end {
                    end -= 1;
                }
                self.insertion_ranks_begin[v][j] = begin;
                self.insertion_ranks_end[v][j] = end;
            }

            if n == 0 || route.contains(job_id) {
                self.nearest_job_rank_from[v][j] = None;
                self.nearest_job_rank_to[v][j] = None;
                continue;
            }

            let job_location = job.location_id();
            let mut best_from = (0usize, f64::MAX);
            let mut best_to = (0usize, f64::MAX);
            for rank in 0..n {
                let route_location = route.location_at(problem, rank);
                let from_cost = problem.eval(vehicle_id, route_location, job_location).cost;
                if from_cost < best_from.1 {
                    best_from = (rank, from_cost);
                }
                let to_cost = problem.eval(vehicle_id, job_location, route_location).cost;
                if to_cost < best_to.1 {
                    best_to = (rank, to_cost);
                }
            }
            self.nearest_job_rank_from[v][j] = Some(best_from.0);
            self.nearest_job_rank_to[v][j] = Some(best_to.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;

    #[test]
    fn test_route_eval_matches_scratch_recomputation() {
        let problem = test_utils::euclidean_line_problem(&[1.0, 4.0, 2.0], &[0.0]);
        let solution = test_utils::solution_with_routes(
            &problem,
            vec![test_utils::TestRoute {
                vehicle: 0,
                jobs: vec![0, 1, 2],
            }],
        );

        let mut state = SolutionState::new(&problem);
        state.setup(&problem, &solution);

        // depot(0) -> 1 -> 4 -> 2, open end: 1 + 3 + 2 = 6.
        assert_eq!(state.route_eval(VehicleIdx::new(0)).cost, 6.0);
    }

    #[test]
    fn test_node_gain() {
        let problem = test_utils::euclidean_line_problem(&[1.0, 4.0, 2.0], &[0.0]);
        let solution = test_utils::solution_with_routes(
            &problem,
            vec![test_utils::TestRoute {
                vehicle: 0,
                jobs: vec![0, 1, 2],
            }],
        );
        let mut state = SolutionState::new(&problem);
        state.setup(&problem, &solution);

        // Removing the middle job (x=4): edges 1->4 (3) and 4->2 (2) go,
        // edge 1->2 (1) appears: gain 4.
        assert_eq!(state.node_gain(VehicleIdx::new(0), 1).cost, 4.0);

        // Removing the last job of an open route saves its approach edge.
        assert_eq!(state.node_gain(VehicleIdx::new(0), 2).cost, 2.0);
    }

    #[test]
    fn test_edge_gain_and_job_caches() {
        let problem = test_utils::euclidean_line_problem(&[1.0, 5.0, 6.0, 2.0], &[0.0]);
        let solution = test_utils::solution_with_routes(
            &problem,
            vec![test_utils::TestRoute {
                vehicle: 0,
                jobs: vec![0, 1, 2],
            }],
        );
        let mut state = SolutionState::new(&problem);
        state.setup(&problem, &solution);
        let vehicle_id = VehicleIdx::new(0);

        // Removing the pair (5, 6): edges 1->5 (4), 5->6 (1), 6->end (0) go,
        // nothing is added on an open route.
        assert_eq!(state.edge_gain(vehicle_id, 1).cost, 5.0);

        // Edge evals around the middle node: 1->5 plus 5->6.
        assert_eq!(state.edge_eval_around_node(vehicle_id, 1).cost, 5.0);

        // Job 3 (x=2) is nearest to the route job at rank 0 (x=1) in both
        // directions on a symmetric matrix.
        assert_eq!(state.nearest_job_rank_from(vehicle_id, JobIdx::new(3)), Some(0));
        assert_eq!(state.nearest_job_rank_to(vehicle_id, JobIdx::new(3)), Some(0));

        // No time windows: the whole rank range is plausible.
        assert_eq!(state.insertion_range(vehicle_id, JobIdx::new(3)), (0, 3));
    }

    #[test]
    fn test_cache_consistency_after_incremental_update() {
        let problem = test_utils::euclidean_line_problem(&[1.0, 4.0, 2.0, 7.0], &[0.0, 0.0]);
        let mut solution = test_utils::solution_with_routes(
            &problem,
            vec![
                test_utils::TestRoute {
                    vehicle: 0,
                    jobs: vec![0, 1],
                },
                test_utils::TestRoute {
                    vehicle: 1,
                    jobs: vec![2, 3],
                },
            ],
        );

        let mut state = SolutionState::new(&problem);
        state.setup(&problem, &solution);

        // Mutate route 0 and refresh only it.
        let jobs = [crate::problem::job::JobIdx::new(1)];
        solution
            .route_mut(VehicleIdx::new(0))
            .replace(&problem, &jobs, 0, 2);
        state.update_route(&problem, &solution, VehicleIdx::new(0));

        // A full rebuild must agree with the incremental refresh.
        let mut rebuilt = SolutionState::new(&problem);
        rebuilt.setup(&problem, &solution);
        for v in 0..2 {
            let vehicle_id = VehicleIdx::new(v);
            assert_eq!(state.route_eval(vehicle_id), rebuilt.route_eval(vehicle_id));
            for rank in 0..solution.route(vehicle_id).len() {
                assert_eq!(
                    state.node_gain(vehicle_id, rank),
                    rebuilt.node_gain(vehicle_id, rank)
                );
            }
        }
    }
}
