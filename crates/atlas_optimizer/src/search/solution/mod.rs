pub mod raw_route;
pub mod tw_route;

use fxhash::FxHashSet;

use crate::problem::{job::JobIdx, vehicle::VehicleIdx, vrp::VehicleRoutingProblem};
use crate::search::solution::tw_route::TwRoute;
use crate::utils::enumerate_idx::EnumerateIdx;

/// One route per vehicle (position = vehicle rank, possibly empty) plus the
/// set of unassigned jobs. Routes are exclusively owned here; operators
/// address them by vehicle rank and borrow mutably only inside `apply`.
#[derive(Debug, Clone)]
pub struct Solution {
    routes: Vec<TwRoute>,
    unassigned: FxHashSet<JobIdx>,
}

impl Solution {
    pub fn new(problem: &VehicleRoutingProblem) -> Self {
        let routes = (0..problem.vehicles().len())
            .map(|rank| TwRoute::empty(problem, VehicleIdx::new(rank)))
            .collect();
        let unassigned = (0..problem.jobs().len()).map(JobIdx::new).collect();

        Solution { routes, unassigned }
    }

    pub fn routes(&self) -> &[TwRoute] {
        &self.routes
    }

    pub fn route(&self, vehicle_id: VehicleIdx) -> &TwRoute {
        &self.routes[vehicle_id.get()]
    }

    pub fn route_mut(&mut self, vehicle_id: VehicleIdx) -> &mut TwRoute {
        &mut self.routes[vehicle_id.get()]
    }

    /// Disjoint mutable borrows of two routes, for two-route operators.
    pub fn route_pair_mut(
        &mut self,
        first: VehicleIdx,
        second: VehicleIdx,
    ) -> (&mut TwRoute, &mut TwRoute) {
        assert_ne!(first, second);
        let (a, b) = (first.get(), second.get());
        if a < b {
            let (left, right) = self.routes.split_at_mut(b);
            (&mut left[a], &mut right[0])
        } else {
            let (left, right) = self.routes.split_at_mut(a);
            (&mut right[0], &mut left[b])
        }
    }

    pub fn unassigned(&self) -> &FxHashSet<JobIdx> {
        &self.unassigned
    }

    /// Unassigned jobs in ascending index order, for deterministic scans.
    pub fn unassigned_sorted(&self) -> Vec<JobIdx> {
        let mut jobs: Vec<JobIdx> = self.unassigned.iter().copied().collect();
        jobs.sort_unstable();
        jobs
    }

    pub fn is_unassigned(&self, job_id: JobIdx) -> bool {
        self.unassigned.contains(&job_id)
    }

    pub(crate) fn mark_assigned(&mut self, job_id: JobIdx) {
        self.unassigned.remove(&job_id);
    }

    pub(crate) fn mark_unassigned(&mut self, job_id: JobIdx) {
        self.unassigned.insert(job_id);
    }

    pub fn assigned_count(&self, problem: &VehicleRoutingProblem) -> usize {
        problem.jobs().len() - self.unassigned.len()
    }

    pub fn route_of_job(&self, job_id: JobIdx) -> Option<(VehicleIdx, usize)> {
        self.routes
            .iter()
            .enumerate_idx()
            .find_map(|(vehicle_id, route): (VehicleIdx, &TwRoute)| {
                route.position_of(job_id).map(|rank| (vehicle_id, rank))
            })
    }

    /// Vehicles whose route is currently empty, in rank order.
    pub fn empty_vehicles(&self) -> Vec<VehicleIdx> {
        self.routes
            .iter()
            .enumerate_idx()
            .filter(|(_, route): &(VehicleIdx, &TwRoute)| route.is_empty())
            .map(|(vehicle_id, _)| vehicle_id)
            .collect()
    }

    /// Structural equality: same job sequence per vehicle and same
    /// unassigned set.
    pub fn is_identical(&self, other: &Solution) -> bool {
        self.routes.len() == other.routes.len()
            && self
                .routes
                .iter()
                .zip(&other.routes)
                .all(|(a, b)| a.jobs() == b.jobs())
            && self.unassigned == other.unassigned
    }
}
