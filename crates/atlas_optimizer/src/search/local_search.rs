use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

use rand::{Rng, SeedableRng, rngs::SmallRng};
use tracing::debug;

use crate::problem::{eval::Eval, job::JobIdx, vehicle::VehicleIdx, vrp::VehicleRoutingProblem};
use crate::search::insertion::{best_pair_insertion, best_single_insertion};
use crate::search::operators::{
    Move, OperatorName, cross_exchange, exchange, intra_cross_exchange, intra_exchange,
    intra_mixed_exchange, intra_or_opt, intra_relocate, intra_two_opt, mixed_exchange, or_opt,
    pd_shift, priority_replace, relocate, reverse_two_opt, route_exchange, route_shift,
    route_split, swap_star, tsp_fix, two_opt, unassigned_exchange,
};
use crate::search::score::SolutionScore;
use crate::search::solution::Solution;
use crate::search::solution_state::SolutionState;

/// Bias exponent for ruin victim selection: high node-gain jobs are removed
/// much more often than cheap ones.
const RUIN_DETERMINISM: f64 = 3.0;

/// Per-invocation budget of the TSP repair inside a round.
const TSP_FIX_BUDGET: Duration = Duration::from_millis(50);

struct RankedMove {
    mv: Move,
}

impl PartialEq for RankedMove {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RankedMove {}

impl PartialOrd for RankedMove {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RankedMove {
    fn cmp(&self, other: &Self) -> Ordering {
        self.mv
            .priority_gain()
            .cmp(&other.mv.priority_gain())
            .then(self.mv.gain().cost.total_cmp(&other.mv.gain().cost))
            // Max-heap: at equal gain the smaller tie-break key wins.
            .then_with(|| other.mv.tie_breaker().cmp(&self.mv.tie_breaker()))
    }
}

/// The local-search engine: repeated best-move rounds over the operator
/// catalog, with ruin-and-recreate perturbation at quiescence. One instance
/// owns its solution, caches and PRNG; no state is shared across instances.
pub struct LocalSearch<'a> {
    problem: &'a VehicleRoutingProblem,
    solution: Solution,
    state: SolutionState,
    rng: SmallRng,
    deadline: Option<Instant>,
    max_nb_jobs_removal: usize,
    best: Solution,
    best_score: SolutionScore,
}

impl<'a> LocalSearch<'a> {
    pub fn new(
        problem: &'a VehicleRoutingProblem,
        solution: Solution,
        seed: u64,
        deadline: Option<Instant>,
        max_nb_jobs_removal: usize,
    ) -> Self {
        let best = solution.clone();
        let best_score = SolutionScore::of(problem, &best);

        LocalSearch {
            problem,
            solution,
            state: SolutionState::new(problem),
            rng: SmallRng::seed_from_u64(seed),
            deadline,
            max_nb_jobs_removal,
            best,
            best_score,
        }
    }

    /// Run to quiescence with perturbations, returning the best solution
    /// seen and its score.
    pub fn run(mut self) -> (Solution, SolutionScore) {
        self.state.setup(self.problem, &self.solution);
        self.descend();
        self.capture_if_better();

        let mut unproductive = 0;
        while unproductive < self.max_nb_jobs_removal && !self.deadline_exceeded() {
            let removal = 1 + self.rng.random_range(0..self.max_nb_jobs_removal);
            debug!(removal, "perturbation");

            self.ruin(removal);
            self.recreate();
            self.descend();

            if self.capture_if_better() {
                unproductive = 0;
            } else {
                unproductive += 1;
                self.solution = self.best.clone();
                self.state.setup(self.problem, &self.solution);
            }
        }

        (self.best, self.best_score)
    }

    fn capture_if_better(&mut self) -> bool {
        let score = SolutionScore::of(self.problem, &self.solution);
        if score.is_better_than(&self.best_score) {
            self.best = self.solution.clone();
            self.best_score = score;
            true
        } else {
            false
        }
    }

    fn deadline_exceeded(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    fn tsp_deadline(&self) -> Option<Instant> {
        let budget = Instant::now() + TSP_FIX_BUDGET;
        Some(match self.deadline {
            Some(deadline) => deadline.min(budget),
            None => budget,
        })
    }

    fn find_best_of_class(&self, name: OperatorName) -> Option<Move> {
        let (problem, solution, state) = (self.problem, &self.solution, &self.state);
        match name {
            OperatorName::Exchange => exchange::find_best(problem, solution, state),
            OperatorName::CrossExchange => cross_exchange::find_best(problem, solution, state),
            OperatorName::MixedExchange => mixed_exchange::find_best(problem, solution, state),
            OperatorName::Relocate => relocate::find_best(problem, solution, state),
            OperatorName::OrOpt => or_opt::find_best(problem, solution, state),
            OperatorName::TwoOpt => two_opt::find_best(problem, solution, state),
            OperatorName::ReverseTwoOpt => reverse_two_opt::find_best(problem, solution, state),
            OperatorName::RouteExchange => route_exchange::find_best(problem, solution, state),
            OperatorName::RouteShift => route_shift::find_best(problem, solution, state),
            OperatorName::SwapStar => swap_star::find_best(problem, solution, state),
            OperatorName::PdShift => pd_shift::find_best(problem, solution, state),
            OperatorName::UnassignedExchange => {
                unassigned_exchange::find_best(problem, solution, state)
            }
            OperatorName::PriorityReplace => priority_replace::find_best(problem, solution, state),
            OperatorName::RouteSplit => {
                route_split::find_best(problem, solution, state, Eval::NO_GAIN)
            }
            OperatorName::IntraExchange => intra_exchange::find_best(problem, solution, state),
            OperatorName::IntraCrossExchange => {
                intra_cross_exchange::find_best(problem, solution, state)
            }
            OperatorName::IntraMixedExchange => {
                intra_mixed_exchange::find_best(problem, solution, state)
            }
            OperatorName::IntraRelocate => intra_relocate::find_best(problem, solution, state),
            OperatorName::IntraOrOpt => intra_or_opt::find_best(problem, solution, state),
            OperatorName::IntraTwoOpt => intra_two_opt::find_best(problem, solution, state),
            OperatorName::TspFix => {
                tsp_fix::find_best(problem, solution, state, self.tsp_deadline())
            }
        }
    }

    fn descend(&mut self) {
        while !self.deadline_exceeded() {
            if !self.run_round() {
                break;
            }
        }
    }

    /// One inner round: materialise the best move per operator class, then
    /// keep applying the queue head, recomputing entries whose routes were
    /// touched by an earlier application.
    fn run_round(&mut self) -> bool {
        let mut heap: BinaryHeap<RankedMove> = OperatorName::ALL
            .iter()
            .filter_map(|&name| self.find_best_of_class(name))
            .map(|mv| RankedMove { mv })
            .collect();

        let mut touched: Vec<VehicleIdx> = Vec::new();
        let mut improved = false;

        while let Some(RankedMove { mv }) = heap.pop() {
            if self.deadline_exceeded() {
                break;
            }
            if mv.priority_gain() <= 0 && !mv.gain().is_gain() {
                break;
            }

            let stale = touched.iter().any(|&vehicle| mv.invalidated_by(vehicle))
                || mv
                    .required_unassigned()
                    .iter()
                    .any(|&job| !self.solution.is_unassigned(job));
            let name = mv.name();
            if stale {
                if let Some(fresh) = self.find_best_of_class(name) {
                    heap.push(RankedMove { mv: fresh });
                }
                continue;
            }

            debug_assert!(mv.is_valid(self.problem, &self.solution, &self.state));
            debug!(
                operator = name.as_str(),
                gain = mv.gain().cost,
                priority_gain = mv.priority_gain(),
                "apply"
            );

            mv.apply(self.problem, &mut self.solution);
            improved = true;

            for &vehicle in mv
                .update_candidates()
                .iter()
                .chain(mv.addition_candidates().iter())
            {
                if !touched.contains(&vehicle) {
                    touched.push(vehicle);
                }
                self.state.update_route(self.problem, &self.solution, vehicle);
            }

            if let Some(fresh) = self.find_best_of_class(name) {
                heap.push(RankedMove { mv: fresh });
            }
        }

        improved
    }

    /// Remove up to `count` jobs, biased toward the ones whose removal saves
    /// the most. Shipment halves leave together.
    fn ruin(&mut self, count: usize) {
        let mut removed = 0;
        while removed < count {
            let mut candidates: Vec<(VehicleIdx, usize, f64)> = Vec::new();
            for v in 0..self.problem.vehicles().len() {
                let vehicle_id = VehicleIdx::new(v);
                let route = self.solution.route(vehicle_id);
                for rank in 0..route.len() {
                    candidates.push((vehicle_id, rank, self.state.node_gain(vehicle_id, rank).cost));
                }
            }
            if candidates.is_empty() {
                return;
            }
            candidates.sort_by(|a, b| {
                b.2.total_cmp(&a.2).then(a.0.cmp(&b.0)).then(a.1.cmp(&b.1))
            });

            let y: f64 = self.rng.random_range(0.0..1.0);
            let index = ((y.powf(RUIN_DETERMINISM)) * candidates.len() as f64) as usize;
            let (vehicle_id, rank, _) = candidates[index.min(candidates.len() - 1)];
            let job = self.solution.route(vehicle_id).job_at(rank);

            removed += self.remove_job(vehicle_id, job);
        }
    }

    fn remove_job(&mut self, vehicle_id: VehicleIdx, job: JobIdx) -> usize {
        let partner = self.problem.paired_job(job);
        let route = self.solution.route(vehicle_id);
        let len = route.len();

        let keep: Vec<JobIdx> = route
            .jobs()
            .iter()
            .copied()
            .filter(|&other| other != job && Some(other) != partner)
            .collect();
        let removed = len - keep.len();

        self.solution
            .route_mut(vehicle_id)
            .replace(self.problem, &keep, 0, len);
        self.solution.mark_unassigned(job);
        if let Some(partner) = partner {
            self.solution.mark_unassigned(partner);
        }
        self.state
            .update_route(self.problem, &self.solution, vehicle_id);

        removed
    }

    /// Cheapest-insertion recreate over all vehicles. Candidates are tried
    /// in descending priority; among equal priorities the higher job index
    /// goes first, so when capacity binds, the lowest-indexed job of the
    /// lowest priority class is the one left unassigned.
    fn recreate(&mut self) {
        loop {
            if self.deadline_exceeded() {
                return;
            }

            let mut candidates = self.solution.unassigned_sorted();
            candidates.sort_by(|a, b| {
                self.problem
                    .job(*b)
                    .priority()
                    .cmp(&self.problem.job(*a).priority())
                    .then(b.cmp(a))
            });

            let mut inserted = false;
            for job_id in candidates {
                let job = self.problem.job(job_id);
                if job.is_delivery() {
                    // Inserted together with its pickup.
                    continue;
                }

                if job.is_pickup() {
                    if self.insert_pair(job_id) {
                        inserted = true;
                        break;
                    }
                } else if self.insert_single(job_id) {
                    inserted = true;
                    break;
                }
            }

            if !inserted {
                return;
            }
        }
    }

    fn insert_single(&mut self, job_id: JobIdx) -> bool {
        let mut best: Option<(VehicleIdx, usize, f64)> = None;
        for v in 0..self.problem.vehicles().len() {
            let vehicle_id = VehicleIdx::new(v);
            let route = self.solution.route(vehicle_id);
            if let Some((rank, eval)) = best_single_insertion(self.problem, route, job_id) {
                let mut cost = eval.cost;
                if route.is_empty() {
                    cost += self.problem.fixed_cost(vehicle_id);
                }
                if best.is_none_or(|(_, _, b)| cost < b) {
                    best = Some((vehicle_id, rank, cost));
                }
            }
        }

        let Some((vehicle_id, rank, _)) = best else {
            return false;
        };
        self.solution
            .route_mut(vehicle_id)
            .replace(self.problem, &[job_id], rank, rank);
        self.solution.mark_assigned(job_id);
        self.state
            .update_route(self.problem, &self.solution, vehicle_id);
        true
    }

    fn insert_pair(&mut self, pickup: JobIdx) -> bool {
        let Some(delivery) = self.problem.paired_job(pickup) else {
            return false;
        };

        let mut best: Option<(VehicleIdx, usize, usize, f64)> = None;
        for v in 0..self.problem.vehicles().len() {
            let vehicle_id = VehicleIdx::new(v);
            let route = self.solution.route(vehicle_id);
            if let Some((p_rank, d_rank, eval)) =
                best_pair_insertion(self.problem, route, pickup, delivery)
            {
                let mut cost = eval.cost;
                if route.is_empty() {
                    cost += self.problem.fixed_cost(vehicle_id);
                }
                if best.is_none_or(|(_, _, _, b)| cost < b) {
                    best = Some((vehicle_id, p_rank, d_rank, cost));
                }
            }
        }

        let Some((vehicle_id, p_rank, d_rank, _)) = best else {
            return false;
        };

        let route = self.solution.route(vehicle_id);
        let mut inner: Vec<JobIdx> = Vec::with_capacity(d_rank - p_rank + 2);
        inner.push(pickup);
        inner.extend_from_slice(&route.jobs()[p_rank..d_rank]);
        inner.push(delivery);

        self.solution
            .route_mut(vehicle_id)
            .replace(self.problem, &inner, p_rank, d_rank);
        self.solution.mark_assigned(pickup);
        self.solution.mark_assigned(delivery);
        self.state
            .update_route(self.problem, &self.solution, vehicle_id);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;

    fn run_search(
        problem: &VehicleRoutingProblem,
        solution: Solution,
        max_nb_jobs_removal: usize,
    ) -> (Solution, SolutionScore) {
        LocalSearch::new(problem, solution, 42, None, max_nb_jobs_removal).run()
    }

    #[test]
    fn test_optimal_line_route_is_a_fixed_point() {
        let problem = test_utils::euclidean_line_problem(&[0.0, 1.0, 2.0], &[0.0]);
        let solution = test_utils::solution_with_routes(
            &problem,
            vec![test_utils::TestRoute {
                vehicle: 0,
                jobs: vec![0, 1, 2],
            }],
        );

        let (best, score) = run_search(&problem, solution.clone(), 2);
        assert!(best.is_identical(&solution));
        assert_eq!(score.cost, 2.0);
    }

    #[test]
    fn test_square_route_is_uncrossed() {
        // Four corners, closed route; the crossed tour costs 40 + sqrt(200),
        // the uncrossed one exactly 40.
        let problem = test_utils::closed_euclidean_problem(
            &[(0.0, 0.0), (10.0, 0.0), (0.0, 10.0), (10.0, 10.0)],
            (0.0, 0.0),
        );
        let solution = test_utils::solution_with_routes(
            &problem,
            vec![test_utils::TestRoute {
                vehicle: 0,
                jobs: vec![0, 2, 1, 3],
            }],
        );

        let (_, score) = run_search(&problem, solution, 2);
        assert!((score.cost - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_two_vehicles_share_the_load_when_fixed_cost_allows() {
        let problem = test_utils::euclidean_line_problem_with_fixed_costs(
            &[1.0, 9.0],
            &[(0.0, 0.0), (10.0, 1.0)],
        );
        let solution = test_utils::solution_with_routes(
            &problem,
            vec![
                test_utils::TestRoute {
                    vehicle: 0,
                    jobs: vec![0, 1],
                },
                test_utils::TestRoute {
                    vehicle: 1,
                    jobs: vec![],
                },
            ],
        );

        let (best, score) = run_search(&problem, solution, 2);
        assert_eq!(best.route(VehicleIdx::new(0)).len(), 1);
        assert_eq!(best.route(VehicleIdx::new(1)).len(), 1);
        // 1 (v0 to x=1) + 1 (v1 to x=9) + fixed 1.
        assert!((score.cost - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_capacity_leaves_lowest_priority_lowest_index_unassigned() {
        // Capacity 10, four deliveries of 3: only three fit.
        let problem = test_utils::capacity_scenario_problem();
        let solution = Solution::new(&problem);

        let (best, _) = run_search(&problem, solution, 2);
        let unassigned = best.unassigned_sorted();
        assert_eq!(unassigned.len(), 1);
        assert_eq!(unassigned[0].get(), 0);
    }

    #[test]
    fn test_pd_pair_moves_together_to_cheaper_vehicle() {
        let problem = test_utils::pd_two_vehicle_problem();
        let solution = test_utils::solution_with_routes(
            &problem,
            vec![
                test_utils::TestRoute {
                    vehicle: 0,
                    jobs: vec![0, 2, 3, 1],
                },
                test_utils::TestRoute {
                    vehicle: 1,
                    jobs: vec![],
                },
            ],
        );

        let (best, _) = run_search(&problem, solution, 2);

        // Wherever the pair landed, pickup precedes delivery on one route.
        let (vehicle, p_rank) = best.route_of_job(JobIdx::new(0)).expect("pickup assigned");
        let (d_vehicle, d_rank) = best.route_of_job(JobIdx::new(1)).expect("delivery assigned");
        assert_eq!(vehicle, d_vehicle);
        assert!(p_rank < d_rank);
    }

    #[test]
    fn test_priority_replace_scenario() {
        let problem = test_utils::priority_problem(
            &[(1.0, 1), (2.0, 1), (3.0, 1), (1.5, 10)],
            Some(3),
        );
        let initial = test_utils::solution_with_routes(
            &problem,
            vec![test_utils::TestRoute {
                vehicle: 0,
                jobs: vec![0, 1, 2],
            }],
        );

        let (best, score) = run_search(&problem, initial, 2);
        assert!(best.route_of_job(JobIdx::new(3)).is_some());
        assert!(score.priority >= 10);
    }

    #[test]
    fn test_same_seed_same_result() {
        let problem = test_utils::euclidean_line_problem(
            &[3.0, 7.0, 1.0, 9.0, 4.0, 6.0],
            &[0.0, 10.0],
        );
        let solution = test_utils::solution_with_routes(
            &problem,
            vec![
                test_utils::TestRoute {
                    vehicle: 0,
                    jobs: vec![0, 1, 2],
                },
                test_utils::TestRoute {
                    vehicle: 1,
                    jobs: vec![3, 4, 5],
                },
            ],
        );

        let (first, first_score) =
            LocalSearch::new(&problem, solution.clone(), 7, None, 3).run();
        let (second, second_score) = LocalSearch::new(&problem, solution, 7, None, 3).run();

        assert!(first.is_identical(&second));
        assert_eq!(first_score.cost, second_score.cost);
    }

    #[test]
    fn test_cost_never_increases_within_descent() {
        let problem = test_utils::euclidean_line_problem(
            &[5.0, 2.0, 8.0, 1.0],
            &[0.0, 10.0],
        );
        let solution = test_utils::solution_with_routes(
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
        let before = SolutionScore::of(&problem, &solution);

        let mut search = LocalSearch::new(&problem, solution, 1, None, 0);
        search.state.setup(search.problem, &search.solution);
        search.descend();
        let after = SolutionScore::of(&problem, &search.solution);

        assert!(after.cost <= before.cost);
    }
}
