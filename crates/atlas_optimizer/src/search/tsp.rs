use std::time::Instant;

use crate::problem::{eval::MIN_GAIN, job::JobIdx, vehicle::VehicleIdx, vrp::VehicleRoutingProblem};

/// Single-route TSP repair: nearest-neighbour seed then 2-opt and or-opt
/// descent on edge cost, stopping at quiescence or the sub-deadline. Route
/// ends follow the vehicle's start/end locations (either may be open).
pub(crate) fn solve_tsp(
    problem: &VehicleRoutingProblem,
    vehicle_id: VehicleIdx,
    jobs: &[JobIdx],
    deadline: Option<Instant>,
) -> Vec<JobIdx> {
    if jobs.len() < 2 {
        return jobs.to_vec();
    }

    let vehicle = problem.vehicle(vehicle_id);
    let cost = |from: JobIdx, to: JobIdx| -> f64 {
        problem
            .eval(
                vehicle_id,
                problem.job(from).location_id(),
                problem.job(to).location_id(),
            )
            .cost
    };
    let start_cost = |to: JobIdx| -> f64 {
        vehicle.start_location_id().map_or(0.0, |start| {
            problem
                .eval(vehicle_id, start, problem.job(to).location_id())
                .cost
        })
    };
    let end_cost = |from: JobIdx| -> f64 {
        vehicle.end_location_id().map_or(0.0, |end| {
            problem
                .eval(vehicle_id, problem.job(from).location_id(), end)
                .cost
        })
    };

    // Nearest-neighbour seed from the vehicle start.
    let mut remaining: Vec<JobIdx> = jobs.to_vec();
    let mut tour: Vec<JobIdx> = Vec::with_capacity(jobs.len());
    let first = remaining
        .iter()
        .enumerate()
        .min_by(|&(_, &a), &(_, &b)| start_cost(a).total_cmp(&start_cost(b)))
        .map(|(index, _)| index)
        .unwrap_or(0);
    tour.push(remaining.swap_remove(first));
    while !remaining.is_empty() {
        let last = *tour.last().expect("tour is non-empty");
        let next = remaining
            .iter()
            .enumerate()
            .min_by(|&(_, &a), &(_, &b)| cost(last, a).total_cmp(&cost(last, b)))
            .map(|(index, _)| index)
            .unwrap_or(0);
        tour.push(remaining.swap_remove(next));
    }

    // Descent: segment reversals and single-job relocations.
    let n = tour.len();
    let mut improved = true;
    while improved {
        improved = false;
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }

        for i in 0..n - 1 {
            for j in i + 1..n {
                let before = if i == 0 { start_cost(tour[i]) } else { cost(tour[i - 1], tour[i]) };
                let after = if j == n - 1 { end_cost(tour[j]) } else { cost(tour[j], tour[j + 1]) };
                let new_before = if i == 0 {
                    start_cost(tour[j])
                } else {
                    cost(tour[i - 1], tour[j])
                };
                let new_after = if j == n - 1 {
                    end_cost(tour[i])
                } else {
                    cost(tour[i], tour[j + 1])
                };

                if before + after - new_before - new_after > MIN_GAIN {
                    tour[i..=j].reverse();
                    improved = true;
                }
            }
        }

        for from in 0..n {
            for to in 0..n {
                if to == from || to == from + 1 {
                    continue;
                }
                let job = tour[from];
                let mut candidate = tour.clone();
                candidate.remove(from);
                candidate.insert(if to > from { to - 1 } else { to }, job);

                let current = tour_cost(&tour, &start_cost, &end_cost, &cost);
                let with_move = tour_cost(&candidate, &start_cost, &end_cost, &cost);
                if current - with_move > MIN_GAIN {
                    tour = candidate;
                    improved = true;
                }
            }
        }
    }

    tour
}

fn tour_cost(
    tour: &[JobIdx],
    start_cost: &impl Fn(JobIdx) -> f64,
    end_cost: &impl Fn(JobIdx) -> f64,
    cost: &impl Fn(JobIdx, JobIdx) -> f64,
) -> f64 {
    let mut total = start_cost(tour[0]) + end_cost(tour[tour.len() - 1]);
    for pair in tour.windows(2) {
        total += cost(pair[0], pair[1]);
    }
    total
}
