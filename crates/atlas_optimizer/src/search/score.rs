use serde::Serialize;

use crate::problem::vrp::VehicleRoutingProblem;
use crate::search::solution::Solution;
use crate::search::solution::raw_route::eval_of_sequence;
use crate::utils::enumerate_idx::EnumerateIdx;

/// Lexicographic objective: maximise assigned priority, then assigned task
/// count, then minimise cost.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SolutionScore {
    pub priority: u64,
    pub assigned: usize,
    pub cost: f64,
}

impl SolutionScore {
    pub fn of(problem: &VehicleRoutingProblem, solution: &Solution) -> Self {
        let mut priority = 0u64;
        let mut assigned = 0usize;
        let mut cost = 0.0;

        for (vehicle_id, route) in
            solution.routes().iter().enumerate_idx::<crate::problem::vehicle::VehicleIdx>()
        {
            if route.is_empty() {
                continue;
            }
            assigned += route.len();
            for &job_id in route.jobs() {
                priority += u64::from(problem.job(job_id).priority());
            }
            cost += eval_of_sequence(problem, vehicle_id, route.jobs()).cost
                + problem.fixed_cost(vehicle_id);
        }

        SolutionScore {
            priority,
            assigned,
            cost,
        }
    }

    pub fn is_better_than(&self, other: &SolutionScore) -> bool {
        if self.priority != other.priority {
            return self.priority > other.priority;
        }
        if self.assigned != other.assigned {
            return self.assigned > other.assigned;
        }
        self.cost < other.cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(priority: u64, assigned: usize, cost: f64) -> SolutionScore {
        SolutionScore {
            priority,
            assigned,
            cost,
        }
    }

    #[test]
    fn test_lexicographic_ordering() {
        // Priority dominates everything.
        assert!(score(10, 1, 100.0).is_better_than(&score(9, 5, 1.0)));
        // Then assigned count.
        assert!(score(10, 5, 100.0).is_better_than(&score(10, 4, 1.0)));
        // Then cost.
        assert!(score(10, 5, 1.0).is_better_than(&score(10, 5, 2.0)));
        assert!(!score(10, 5, 2.0).is_better_than(&score(10, 5, 2.0)));
    }
}
