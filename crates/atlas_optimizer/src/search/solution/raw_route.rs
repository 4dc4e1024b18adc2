use fxhash::FxHashMap;

use crate::problem::{
    amount::Amount,
    eval::Eval,
    job::JobIdx,
    location::LocationIdx,
    vehicle::{Vehicle, VehicleIdx},
    vrp::VehicleRoutingProblem,
};

/// Ordered job sequence for one vehicle with incremental load caches.
///
/// Load model: deliveries are on board from the start and decrease along the
/// route, pickups accumulate. `current_loads[k]` is the load carried between
/// step `k-1` and step `k` (`current_loads[0]` is the initial load), so the
/// vector has `len() + 1` entries and capacity feasibility is
/// `current_loads[k] <= capacity` at every `k`.
#[derive(Debug, Clone)]
pub struct RawRoute {
    vehicle_id: VehicleIdx,
    jobs: Vec<JobIdx>,
    positions: FxHashMap<JobIdx, usize>,

    /// `fwd_pickups[i]`: pickups of jobs `0..=i`.
    fwd_pickups: Vec<Amount>,
    /// `bwd_deliveries[i]`: deliveries of jobs `i..`; entry `len()` is zero.
    bwd_deliveries: Vec<Amount>,
    current_loads: Vec<Amount>,
    /// `fwd_peaks[k]`: max of `current_loads[0..=k]`.
    fwd_peaks: Vec<Amount>,
    /// `bwd_peaks[k]`: max of `current_loads[k..]`.
    bwd_peaks: Vec<Amount>,
}

impl RawRoute {
    pub fn empty(problem: &VehicleRoutingProblem, vehicle_id: VehicleIdx) -> Self {
        let capacity = problem.compatible_jobs_count(vehicle_id);
        let mut route = RawRoute {
            vehicle_id,
            jobs: Vec::with_capacity(capacity),
            positions: FxHashMap::default(),
            fwd_pickups: Vec::with_capacity(capacity),
            bwd_deliveries: Vec::with_capacity(capacity + 1),
            current_loads: Vec::with_capacity(capacity + 1),
            fwd_peaks: Vec::with_capacity(capacity + 1),
            bwd_peaks: Vec::with_capacity(capacity + 1),
        };
        route.update_loads(problem);
        route
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn jobs(&self) -> &[JobIdx] {
        &self.jobs
    }

    pub fn job_at(&self, rank: usize) -> JobIdx {
        self.jobs[rank]
    }

    pub fn position_of(&self, job_id: JobIdx) -> Option<usize> {
        self.positions.get(&job_id).copied()
    }

    pub fn contains(&self, job_id: JobIdx) -> bool {
        self.positions.contains_key(&job_id)
    }

    pub fn vehicle_id(&self) -> VehicleIdx {
        self.vehicle_id
    }

    pub fn vehicle<'a>(&self, problem: &'a VehicleRoutingProblem) -> &'a Vehicle {
        problem.vehicle(self.vehicle_id)
    }

    pub fn location_at(&self, problem: &VehicleRoutingProblem, rank: usize) -> LocationIdx {
        problem.job(self.jobs[rank]).location_id()
    }

    /// Location preceding `rank`: the previous job, or the vehicle start.
    pub fn previous_location(
        &self,
        problem: &VehicleRoutingProblem,
        rank: usize,
    ) -> Option<LocationIdx> {
        if rank == 0 {
            self.vehicle(problem).start_location_id()
        } else {
            Some(self.location_at(problem, rank - 1))
        }
    }

    /// Location following `rank`: the next job, or the vehicle end.
    pub fn next_location(
        &self,
        problem: &VehicleRoutingProblem,
        rank: usize,
    ) -> Option<LocationIdx> {
        if rank + 1 < self.jobs.len() {
            Some(self.location_at(problem, rank + 1))
        } else {
            self.vehicle(problem).end_location_id()
        }
    }

    pub fn load_at_step(&self, step: usize) -> &Amount {
        &self.current_loads[step]
    }

    pub fn max_load(&self) -> &Amount {
        &self.fwd_peaks[self.jobs.len()]
    }

    /// Sum of delivery amounts over the whole route (= initial load).
    pub fn job_deliveries_sum(&self) -> &Amount {
        &self.bwd_deliveries[0]
    }

    /// Sum of pickup amounts over the whole route (= final load).
    pub fn job_pickups_sum(&self) -> &Amount {
        &self.current_loads[self.jobs.len()]
    }

    /// Peak load of `jobs[0..rank]` taken as a standalone route: the cached
    /// prefix peak minus the deliveries the prefix only carries for later
    /// steps.
    pub fn sub_route_max_load_before(&self, rank: usize) -> Amount {
        if rank == 0 {
            return Amount::empty();
        }
        &self.fwd_peaks[rank] - &self.bwd_deliveries[rank]
    }

    /// Peak load of `jobs[rank..]` taken as a standalone route.
    pub fn sub_route_max_load_after(&self, rank: usize) -> Amount {
        if rank == 0 {
            return self.bwd_peaks[0].clone();
        }
        &self.bwd_peaks[rank] - &self.fwd_pickups[rank - 1]
    }

    /// Whether replacing `jobs[at..upto]` with `range` keeps every prefix
    /// load within capacity. `delivery_sum` must equal the sum of delivery
    /// amounts inside `range`; runs in O(|range|) using the cached
    /// standalone prefix/suffix peaks.
    pub fn is_valid_addition_for_capacity(
        &self,
        problem: &VehicleRoutingProblem,
        delivery_sum: &Amount,
        range: &[JobIdx],
        at: usize,
        upto: usize,
    ) -> bool {
        debug_assert!(at <= upto && upto <= self.jobs.len());

        let capacity = self.vehicle(problem).capacity();
        let suffix_deliveries = &self.bwd_deliveries[upto];
        let prefix_pickups = if at == 0 {
            Amount::empty()
        } else {
            self.fwd_pickups[at - 1].clone()
        };

        if at > 0 {
            let mut prefix_peak = self.sub_route_max_load_before(at);
            prefix_peak += delivery_sum;
            prefix_peak += suffix_deliveries;
            if !prefix_peak.fits_within(capacity) {
                return false;
            }
        }

        // Load entering the replaced region, then the profile inside it.
        let mut current = &prefix_pickups + delivery_sum;
        current += suffix_deliveries;
        if !current.fits_within(capacity) {
            return false;
        }

        let mut range_pickups = Amount::empty();
        for &job_id in range {
            let job = problem.job(job_id);
            current -= job.delivery();
            current += job.pickup();
            range_pickups += job.pickup();
            if !current.fits_within(capacity) {
                return false;
            }
        }

        if upto < self.jobs.len() {
            let mut suffix_peak = self.sub_route_max_load_after(upto);
            suffix_peak += &prefix_pickups;
            suffix_peak += &range_pickups;
            if !suffix_peak.fits_within(capacity) {
                return false;
            }
        }

        true
    }

    pub fn is_valid_addition_for_max_tasks(
        &self,
        problem: &VehicleRoutingProblem,
        added: usize,
        removed: usize,
    ) -> bool {
        match self.vehicle(problem).max_tasks() {
            Some(max_tasks) => self.jobs.len() + added - removed <= max_tasks,
            None => true,
        }
    }

    /// Splice `range` over `jobs[at..upto]` and refresh the load caches.
    /// Feasibility is the caller's responsibility.
    pub(crate) fn splice(
        &mut self,
        problem: &VehicleRoutingProblem,
        range: &[JobIdx],
        at: usize,
        upto: usize,
    ) {
        self.jobs.splice(at..upto, range.iter().copied());
        self.update_loads(problem);
    }

    pub(crate) fn update_loads(&mut self, problem: &VehicleRoutingProblem) {
        let n = self.jobs.len();
        let zero = problem.zero_amount();

        self.positions.clear();
        self.positions
            .extend(self.jobs.iter().enumerate().map(|(rank, &job)| (job, rank)));

        self.fwd_pickups.resize_with(n, || zero.clone());
        self.bwd_deliveries.resize_with(n + 1, || zero.clone());
        self.current_loads.resize_with(n + 1, || zero.clone());
        self.fwd_peaks.resize_with(n + 1, || zero.clone());
        self.bwd_peaks.resize_with(n + 1, || zero.clone());

        let mut acc = zero.clone();
        for i in 0..n {
            acc += problem.job(self.jobs[i]).pickup();
            self.fwd_pickups[i].update(&acc);
        }

        acc.reset();
        self.bwd_deliveries[n].update(&acc);
        for i in (0..n).rev() {
            acc += problem.job(self.jobs[i]).delivery();
            self.bwd_deliveries[i].update(&acc);
        }

        self.current_loads[0].update(&self.bwd_deliveries[0]);
        for k in 1..=n {
            let load = &self.fwd_pickups[k - 1] + &self.bwd_deliveries[k];
            self.current_loads[k].update(&load);
        }

        let mut peak = self.current_loads[0].clone();
        self.fwd_peaks[0].update(&peak);
        for k in 1..=n {
            peak.max_with(&self.current_loads[k]);
            self.fwd_peaks[k].update(&peak);
        }

        peak.update(&self.current_loads[n]);
        self.bwd_peaks[n].update(&peak);
        for k in (0..n).rev() {
            peak.max_with(&self.current_loads[k]);
            self.bwd_peaks[k].update(&peak);
        }
    }

    /// Eval of the edges spanned by `jobs[at..upto]`, boundary edges
    /// included.
    pub fn segment_eval(&self, problem: &VehicleRoutingProblem, at: usize, upto: usize) -> Eval {
        let jobs = self.jobs[at..upto].to_vec();
        self.segment_eval_with(problem, &jobs, at, upto)
    }

    /// Eval of the edges `jobs[at..upto]` would span if replaced by `seq`.
    pub fn segment_eval_with(
        &self,
        problem: &VehicleRoutingProblem,
        seq: &[JobIdx],
        at: usize,
        upto: usize,
    ) -> Eval {
        if seq.is_empty() && at == 0 && upto == self.jobs.len() {
            // The whole route goes away, including start/end legs.
            return Eval::ZERO;
        }

        let prev = if at == 0 {
            self.vehicle(problem).start_location_id()
        } else {
            Some(self.location_at(problem, at - 1))
        };
        let next = if upto < self.jobs.len() {
            Some(self.location_at(problem, upto))
        } else {
            self.vehicle(problem).end_location_id()
        };

        let mut eval = Eval::ZERO;
        let mut cursor = prev;
        for &job_id in seq {
            let location = problem.job(job_id).location_id();
            eval += problem.eval_between(self.vehicle_id, cursor, Some(location));
            cursor = Some(location);
        }
        eval += problem.eval_between(self.vehicle_id, cursor, next);
        eval
    }

    /// `old edges - new edges` for replacing `jobs[at..upto]` with `seq`.
    pub fn replacement_gain(
        &self,
        problem: &VehicleRoutingProblem,
        seq: &[JobIdx],
        at: usize,
        upto: usize,
    ) -> Eval {
        self.segment_eval(problem, at, upto) - self.segment_eval_with(problem, seq, at, upto)
    }

    /// True when some shipment has exactly one member in `jobs[0..cut]`.
    pub fn pair_split_at(&self, problem: &VehicleRoutingProblem, cut: usize) -> bool {
        self.jobs[..cut].iter().any(|&job_id| {
            problem
                .paired_job(job_id)
                .and_then(|partner| self.position_of(partner))
                .is_some_and(|partner_rank| partner_rank >= cut)
        })
    }

    /// True when some shipment has both members inside `jobs[from..to]`.
    pub fn pair_within(&self, problem: &VehicleRoutingProblem, from: usize, to: usize) -> bool {
        self.jobs[from..to].iter().any(|&job_id| {
            problem
                .paired_job(job_id)
                .and_then(|partner| self.position_of(partner))
                .is_some_and(|partner_rank| from <= partner_rank && partner_rank < to)
        })
    }
}

/// Eval of a full start-to-end sequence under a vehicle, fixed cost excluded.
pub(crate) fn eval_of_sequence(
    problem: &VehicleRoutingProblem,
    vehicle_id: VehicleIdx,
    jobs: &[JobIdx],
) -> Eval {
    if jobs.is_empty() {
        return Eval::ZERO;
    }

    let vehicle = problem.vehicle(vehicle_id);
    let mut eval = Eval::ZERO;
    let mut cursor = vehicle.start_location_id();
    for &job_id in jobs {
        let location = problem.job(job_id).location_id();
        eval += problem.eval_between(vehicle_id, cursor, Some(location));
        cursor = Some(location);
    }
    eval += problem.eval_between(vehicle_id, cursor, vehicle.end_location_id());
    eval
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;

    #[test]
    fn test_load_caches() {
        let problem = test_utils::mixed_problem(
            10,
            &[(3, 0), (0, 2), (4, 0)], // (delivery, pickup)
        );
        let mut route = RawRoute::empty(&problem, VehicleIdx::new(0));
        route.splice(
            &problem,
            &[JobIdx::new(0), JobIdx::new(1), JobIdx::new(2)],
            0,
            0,
        );

        // Initial load = deliveries, then -3, +2, -4.
        assert_eq!(*route.load_at_step(0), Amount::from_vec(vec![7]));
        assert_eq!(*route.load_at_step(1), Amount::from_vec(vec![4]));
        assert_eq!(*route.load_at_step(2), Amount::from_vec(vec![6]));
        assert_eq!(*route.load_at_step(3), Amount::from_vec(vec![2]));
        assert_eq!(*route.max_load(), Amount::from_vec(vec![7]));
        assert_eq!(*route.job_deliveries_sum(), Amount::from_vec(vec![7]));
        assert_eq!(*route.job_pickups_sum(), Amount::from_vec(vec![2]));
    }

    #[test]
    fn test_sub_route_max_loads_match_standalone_routes() {
        let problem = test_utils::mixed_problem(
            10,
            &[(3, 0), (0, 2), (4, 0), (0, 1)],
        );
        let all: Vec<JobIdx> = (0..4).map(JobIdx::new).collect();
        let mut route = RawRoute::empty(&problem, VehicleIdx::new(0));
        route.splice(&problem, &all, 0, 0);

        for cut in 1..4 {
            let mut prefix = RawRoute::empty(&problem, VehicleIdx::new(0));
            prefix.splice(&problem, &all[..cut], 0, 0);
            let mut suffix = RawRoute::empty(&problem, VehicleIdx::new(0));
            suffix.splice(&problem, &all[cut..], 0, 0);

            assert_eq!(route.sub_route_max_load_before(cut), *prefix.max_load());
            assert_eq!(route.sub_route_max_load_after(cut), *suffix.max_load());
        }
    }

    #[test]
    fn test_capacity_check_matches_brute_force() {
        let problem = test_utils::mixed_problem(
            6,
            &[(3, 0), (0, 2), (2, 0), (0, 3), (1, 0)],
        );
        let all: Vec<JobIdx> = (0..5).map(JobIdx::new).collect();
        let mut route = RawRoute::empty(&problem, VehicleIdx::new(0));
        route.splice(&problem, &all[..3], 0, 0);

        for at in 0..=3 {
            for upto in at..=3 {
                for insert in [&all[3..4], &all[3..5], &all[0..0]] {
                    let mut delivery_sum = Amount::empty();
                    for &job in insert {
                        delivery_sum += problem.job(job).delivery();
                    }

                    let fast = route.is_valid_addition_for_capacity(
                        &problem,
                        &delivery_sum,
                        insert,
                        at,
                        upto,
                    );

                    let mut candidate: Vec<JobIdx> = route.jobs()[..at].to_vec();
                    candidate.extend_from_slice(insert);
                    candidate.extend_from_slice(&route.jobs()[upto..]);
                    let mut rebuilt = RawRoute::empty(&problem, VehicleIdx::new(0));
                    rebuilt.splice(&problem, &candidate, 0, 0);
                    let slow = rebuilt
                        .max_load()
                        .fits_within(problem.vehicle(VehicleIdx::new(0)).capacity());

                    assert_eq!(fast, slow, "at={at} upto={upto} insert={insert:?}");
                }
            }
        }
    }

    #[test]
    fn test_capacity_boundary_exact_fit() {
        // Capacity exactly equal to the job's delivery must be accepted.
        let problem = test_utils::delivery_problem(3, &[3]);
        let route = RawRoute::empty(&problem, VehicleIdx::new(0));
        assert!(route.is_valid_addition_for_capacity(
            &problem,
            &Amount::from_vec(vec![3]),
            &[JobIdx::new(0)],
            0,
            0,
        ));

        // One unit less must be rejected.
        let problem = test_utils::delivery_problem(2, &[3]);
        let route = RawRoute::empty(&problem, VehicleIdx::new(0));
        assert!(!route.is_valid_addition_for_capacity(
            &problem,
            &Amount::from_vec(vec![3]),
            &[JobIdx::new(0)],
            0,
            0,
        ));
    }

    #[test]
    fn test_pair_helpers() {
        let problem = test_utils::shipment_problem();
        let mut route = RawRoute::empty(&problem, VehicleIdx::new(0));
        // pickup (0), single (2), delivery (1)
        route.splice(
            &problem,
            &[JobIdx::new(0), JobIdx::new(2), JobIdx::new(1)],
            0,
            0,
        );

        assert!(route.pair_split_at(&problem, 1));
        assert!(route.pair_split_at(&problem, 2));
        assert!(!route.pair_split_at(&problem, 3));
        assert!(route.pair_within(&problem, 0, 3));
        assert!(!route.pair_within(&problem, 1, 3));
    }
}
