use crate::problem::{eval::Eval, job::JobIdx, vrp::VehicleRoutingProblem};
use crate::search::solution::tw_route::TwRoute;

/// Extra eval incurred by inserting `job_id` at `rank`:
/// `eval(prev, job) + eval(job, next) - eval(prev, next)`.
pub(crate) fn insertion_eval(
    problem: &VehicleRoutingProblem,
    route: &TwRoute,
    job_id: JobIdx,
    rank: usize,
) -> Eval {
    -route.replacement_gain(problem, &[job_id], rank, rank)
}

/// Cheapest feasible insertion of a single job, if any.
pub(crate) fn best_single_insertion(
    problem: &VehicleRoutingProblem,
    route: &TwRoute,
    job_id: JobIdx,
) -> Option<(usize, Eval)> {
    if !problem.vehicle_ok_with_job(route.vehicle_id(), job_id) {
        return None;
    }

    let mut best: Option<(usize, Eval)> = None;
    for rank in 0..=route.len() {
        let eval = insertion_eval(problem, route, job_id, rank);
        if best.is_some_and(|(_, b)| b <= eval) {
            continue;
        }
        if route.is_valid_replacement(problem, &[job_id], rank, rank) {
            best = Some((rank, eval));
        }
    }
    best
}

/// Cheapest feasible insertion of a pickup/delivery pair, pickup first.
/// Quadratic over the rank pairs, evaluated with the pickup already spliced
/// in mind for the delivery's boundary edges.
pub(crate) fn best_pair_insertion(
    problem: &VehicleRoutingProblem,
    route: &TwRoute,
    pickup: JobIdx,
    delivery: JobIdx,
) -> Option<(usize, usize, Eval)> {
    if !problem.vehicle_ok_with_job(route.vehicle_id(), pickup)
        || !problem.vehicle_ok_with_job(route.vehicle_id(), delivery)
    {
        return None;
    }

    let mut best: Option<(usize, usize, Eval)> = None;
    let mut candidate: Vec<JobIdx> = Vec::with_capacity(route.len() + 2);

    for p_rank in 0..=route.len() {
        for d_rank in p_rank..=route.len() {
            // Candidate span [p_rank, d_rank) with pickup and delivery
            // wrapped around the preserved middle.
            candidate.clear();
            candidate.push(pickup);
            candidate.extend_from_slice(&route.jobs()[p_rank..d_rank]);
            candidate.push(delivery);

            let eval = -route.replacement_gain(problem, &candidate, p_rank, d_rank);
            if best.is_some_and(|(_, _, b)| b <= eval) {
                continue;
            }
            if route.is_valid_replacement(problem, &candidate, p_rank, d_rank) {
                best = Some((p_rank, d_rank, eval));
            }
        }
    }
    best
}

/// The three cheapest insertion positions of a job in a route, by eval cost
/// alone; feasibility is the caller's concern. Three is enough for SWAP*:
/// at most two positions become unavailable after removing one job.
#[derive(Default, Clone)]
pub(crate) struct ThreeBestInsertions {
    entries: [Option<(usize, Eval)>; 3],
}

impl ThreeBestInsertions {
    pub fn is_empty(&self) -> bool {
        self.entries[0].is_none()
    }

    fn cost(&self, slot: usize) -> f64 {
        self.entries[slot].map_or(f64::MAX, |(_, eval)| eval.cost)
    }

    pub fn update(&mut self, rank: usize, eval: Eval) {
        if eval.cost < self.cost(0) {
            self.entries[2] = self.entries[1].take();
            self.entries[1] = self.entries[0].take();
            self.entries[0] = Some((rank, eval));
        } else if eval.cost < self.cost(1) {
            self.entries[2] = self.entries[1].take();
            self.entries[1] = Some((rank, eval));
        } else if eval.cost < self.cost(2) {
            self.entries[2] = Some((rank, eval));
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, Eval)> + '_ {
        self.entries.iter().filter_map(|entry| *entry)
    }
}

pub(crate) fn three_best_insertions(
    problem: &VehicleRoutingProblem,
    route: &TwRoute,
    job_id: JobIdx,
) -> ThreeBestInsertions {
    let mut best = ThreeBestInsertions::default();
    if !problem.vehicle_ok_with_job(route.vehicle_id(), job_id) {
        return best;
    }

    for rank in 0..=route.len() {
        best.update(rank, insertion_eval(problem, route, job_id, rank));
    }
    best
}
