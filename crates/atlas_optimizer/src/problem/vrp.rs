use fixedbitset::FixedBitSet;
use fxhash::FxHashMap;
use jiff::SignedDuration;

use crate::problem::{
    amount::Amount,
    eval::Eval,
    job::{Job, JobIdx, JobKind},
    location::{Location, LocationIdx},
    profile::Profile,
    vehicle::{Vehicle, VehicleIdx},
};

/// Validated, immutable problem description consumed by the search. Derived
/// data (shipment pairing, vehicle-job compatibility, flags) is computed once
/// at build time.
pub struct VehicleRoutingProblem {
    jobs: Vec<Job>,
    vehicles: Vec<Vehicle>,
    profiles: Vec<Profile>,
    locations: Vec<Location>,
    amount_dimensions: usize,
    paired_job: Vec<Option<JobIdx>>,
    compatibility: Vec<FixedBitSet>,
    has_time_windows: bool,
    has_shipments: bool,
}

impl VehicleRoutingProblem {
    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn job(&self, job_id: JobIdx) -> &Job {
        &self.jobs[job_id]
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn vehicle(&self, vehicle_id: VehicleIdx) -> &Vehicle {
        &self.vehicles[vehicle_id]
    }

    pub fn profiles(&self) -> &[Profile] {
        &self.profiles
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn amount_dimensions(&self) -> usize {
        self.amount_dimensions
    }

    pub fn zero_amount(&self) -> Amount {
        Amount::with_dimensions(self.amount_dimensions)
    }

    pub fn has_time_windows(&self) -> bool {
        self.has_time_windows
    }

    pub fn has_shipments(&self) -> bool {
        self.has_shipments
    }

    /// The other half of a shipment, for pickup/delivery jobs.
    pub fn paired_job(&self, job_id: JobIdx) -> Option<JobIdx> {
        self.paired_job[job_id.get()]
    }

    pub fn vehicle_ok_with_job(&self, vehicle_id: VehicleIdx, job_id: JobIdx) -> bool {
        self.compatibility[vehicle_id.get()].contains(job_id.get())
    }

    /// Number of jobs a vehicle may serve at all; routes are preallocated to
    /// this bound.
    pub fn compatible_jobs_count(&self, vehicle_id: VehicleIdx) -> usize {
        self.compatibility[vehicle_id.get()].count_ones(..)
    }

    pub fn travel_duration(
        &self,
        vehicle: &Vehicle,
        from: LocationIdx,
        to: LocationIdx,
    ) -> SignedDuration {
        self.profiles[vehicle.profile_id()].matrices().duration(from, to)
    }

    pub fn travel_distance(&self, vehicle: &Vehicle, from: LocationIdx, to: LocationIdx) -> f64 {
        self.profiles[vehicle.profile_id()].matrices().distance(from, to)
    }

    /// Cost, duration and distance of one edge under a vehicle. The profile's
    /// cost matrix wins when present, otherwise the vehicle's travel rates
    /// apply.
    pub fn eval(&self, vehicle_id: VehicleIdx, from: LocationIdx, to: LocationIdx) -> Eval {
        let vehicle = &self.vehicles[vehicle_id];
        let matrices = self.profiles[vehicle.profile_id()].matrices();
        let duration = matrices.duration(from, to);
        let distance = matrices.distance(from, to);

        let cost = match matrices.cost(from, to) {
            Some(cost) => cost,
            None => {
                vehicle.costs().per_hour * duration.as_secs_f64() / 3600.0
                    + vehicle.costs().per_km * distance / 1000.0
            }
        };

        Eval::new(cost, duration, distance)
    }

    /// Edge eval where either endpoint may be absent (open route ends).
    pub fn eval_between(
        &self,
        vehicle_id: VehicleIdx,
        from: Option<LocationIdx>,
        to: Option<LocationIdx>,
    ) -> Eval {
        match (from, to) {
            (Some(from), Some(to)) => self.eval(vehicle_id, from, to),
            _ => Eval::ZERO,
        }
    }

    pub fn fixed_cost(&self, vehicle_id: VehicleIdx) -> f64 {
        self.vehicles[vehicle_id].costs().fixed
    }
}

#[derive(Default)]
pub struct VehicleRoutingProblemBuilder {
    jobs: Vec<Job>,
    vehicles: Vec<Vehicle>,
    profiles: Vec<Profile>,
    locations: Vec<Location>,
}

impl VehicleRoutingProblemBuilder {
    pub fn set_jobs(&mut self, jobs: Vec<Job>) -> &mut Self {
        self.jobs = jobs;
        self
    }

    pub fn set_vehicles(&mut self, vehicles: Vec<Vehicle>) -> &mut Self {
        self.vehicles = vehicles;
        self
    }

    pub fn set_profiles(&mut self, profiles: Vec<Profile>) -> &mut Self {
        self.profiles = profiles;
        self
    }

    pub fn set_locations(&mut self, locations: Vec<Location>) -> &mut Self {
        self.locations = locations;
        self
    }

    pub fn build(self) -> VehicleRoutingProblem {
        let amount_dimensions = self
            .jobs
            .iter()
            .flat_map(|job| [job.delivery().len(), job.pickup().len()])
            .chain(self.vehicles.iter().map(|v| v.capacity().len()))
            .max()
            .unwrap_or(0);

        let paired_job = Self::pair_shipments(&self.jobs);

        let compatibility = self
            .vehicles
            .iter()
            .map(|vehicle| {
                let mut bits = FixedBitSet::with_capacity(self.jobs.len());
                for (index, job) in self.jobs.iter().enumerate() {
                    if vehicle.can_serve(job) {
                        bits.insert(index);
                    }
                }
                bits
            })
            .collect();

        let has_time_windows = self.jobs.iter().any(|job| !job.time_windows().is_trivial())
            || self.vehicles.iter().any(|vehicle| {
                *vehicle.time_window() != crate::problem::time_window::TimeWindow::whole_horizon()
                    || !vehicle.breaks().is_empty()
            });

        let has_shipments = self.jobs.iter().any(|job| !job.is_single());

        VehicleRoutingProblem {
            jobs: self.jobs,
            vehicles: self.vehicles,
            profiles: self.profiles,
            locations: self.locations,
            amount_dimensions,
            paired_job,
            compatibility,
            has_time_windows,
            has_shipments,
        }
    }

    fn pair_shipments(jobs: &[Job]) -> Vec<Option<JobIdx>> {
        let mut pickups: FxHashMap<&str, JobIdx> = FxHashMap::default();
        let mut deliveries: FxHashMap<&str, JobIdx> = FxHashMap::default();

        for (index, job) in jobs.iter().enumerate() {
            if let Some(shipment_id) = job.shipment_id() {
                match job.kind() {
                    JobKind::Pickup => {
                        pickups.insert(shipment_id, JobIdx::new(index));
                    }
                    JobKind::Delivery => {
                        deliveries.insert(shipment_id, JobIdx::new(index));
                    }
                    JobKind::Single => {}
                }
            }
        }

        jobs.iter()
            .map(|job| {
                job.shipment_id().and_then(|shipment_id| match job.kind() {
                    JobKind::Pickup => deliveries.get(shipment_id).copied(),
                    JobKind::Delivery => pickups.get(shipment_id).copied(),
                    JobKind::Single => None,
                })
            })
            .collect()
    }
}
