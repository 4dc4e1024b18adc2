use jiff::SignedDuration;

use crate::problem::{
    amount::Amount,
    brk::Break,
    job::{Job, JobBuilder, JobIdx, JobKind},
    location::Location,
    matrix::TravelMatrices,
    profile::Profile,
    time_window::{TimeWindow, TimeWindows},
    vehicle::{Vehicle, VehicleBuilder, VehicleIdx},
    vrp::{VehicleRoutingProblem, VehicleRoutingProblemBuilder},
};
use crate::search::solution::Solution;

/// Convention shared by all helpers: job `i` sits at location `i`, vehicle
/// `j` at location `jobs.len() + j`. Matrices are unit-speed Euclidean with
/// cost equal to distance.
fn build_problem(
    locations: Vec<Location>,
    jobs: Vec<Job>,
    vehicles: Vec<Vehicle>,
) -> VehicleRoutingProblem {
    let mut builder = VehicleRoutingProblemBuilder::default();
    builder
        .set_profiles(vec![Profile::new(
            "car",
            TravelMatrices::from_euclidean(&locations),
        )])
        .set_jobs(jobs)
        .set_vehicles(vehicles)
        .set_locations(locations);
    builder.build()
}

fn line_locations(job_xs: &[f64], vehicle_xs: &[f64]) -> Vec<Location> {
    job_xs
        .iter()
        .chain(vehicle_xs.iter())
        .map(|&x| Location::new(x, 0.0))
        .collect()
}

fn basic_job(index: usize) -> JobBuilder {
    let mut builder = JobBuilder::default();
    builder.set_external_id(index.to_string()).set_location_id(index);
    builder
}

fn basic_vehicle(index: usize, location_id: usize) -> VehicleBuilder {
    let mut builder = VehicleBuilder::default();
    builder
        .set_external_id(format!("vehicle_{index}"))
        .set_profile_id(0)
        .set_start_location_id(location_id);
    builder
}

pub fn euclidean_line_problem(job_xs: &[f64], vehicle_xs: &[f64]) -> VehicleRoutingProblem {
    let locations = line_locations(job_xs, vehicle_xs);
    let jobs = (0..job_xs.len()).map(|i| basic_job(i).build()).collect();
    let vehicles = (0..vehicle_xs.len())
        .map(|j| basic_vehicle(j, job_xs.len() + j).build())
        .collect();
    build_problem(locations, jobs, vehicles)
}

pub fn euclidean_line_problem_with_fixed_costs(
    job_xs: &[f64],
    vehicles_with_fixed: &[(f64, f64)],
) -> VehicleRoutingProblem {
    let vehicle_xs: Vec<f64> = vehicles_with_fixed.iter().map(|&(x, _)| x).collect();
    let locations = line_locations(job_xs, &vehicle_xs);
    let jobs = (0..job_xs.len()).map(|i| basic_job(i).build()).collect();
    let vehicles = vehicles_with_fixed
        .iter()
        .enumerate()
        .map(|(j, &(_, fixed))| {
            let mut builder = basic_vehicle(j, job_xs.len() + j);
            builder.set_fixed_cost(fixed);
            builder.build()
        })
        .collect();
    build_problem(locations, jobs, vehicles)
}

pub fn euclidean_problem(
    job_coords: &[(f64, f64)],
    vehicle_coords: &[(f64, f64)],
) -> VehicleRoutingProblem {
    let locations: Vec<Location> = job_coords
        .iter()
        .chain(vehicle_coords.iter())
        .map(|&(x, y)| Location::new(x, y))
        .collect();
    let jobs = (0..job_coords.len()).map(|i| basic_job(i).build()).collect();
    let vehicles = (0..vehicle_coords.len())
        .map(|j| basic_vehicle(j, job_coords.len() + j).build())
        .collect();
    build_problem(locations, jobs, vehicles)
}

/// Single vehicle that starts and ends at `depot`.
pub fn closed_euclidean_problem(
    job_coords: &[(f64, f64)],
    depot: (f64, f64),
) -> VehicleRoutingProblem {
    let locations: Vec<Location> = job_coords
        .iter()
        .copied()
        .chain(std::iter::once(depot))
        .map(|(x, y)| Location::new(x, y))
        .collect();
    let jobs = (0..job_coords.len()).map(|i| basic_job(i).build()).collect();
    let mut vehicle = basic_vehicle(0, job_coords.len());
    vehicle.set_end_location_id(job_coords.len());
    build_problem(locations, jobs, vec![vehicle.build()])
}

/// One vehicle of the given capacity; job `i` at `x = i + 1` with the given
/// delivery amount.
pub fn delivery_problem(capacity: i64, deliveries: &[i64]) -> VehicleRoutingProblem {
    let job_xs: Vec<f64> = (0..deliveries.len()).map(|i| (i + 1) as f64).collect();
    let locations = line_locations(&job_xs, &[0.0]);
    let jobs = deliveries
        .iter()
        .enumerate()
        .map(|(i, &delivery)| {
            let mut builder = basic_job(i);
            builder.set_delivery(Amount::from_vec(vec![delivery]));
            builder.build()
        })
        .collect();
    let mut vehicle = basic_vehicle(0, deliveries.len());
    vehicle.set_capacity(Amount::from_vec(vec![capacity]));
    build_problem(locations, jobs, vec![vehicle.build()])
}

/// One vehicle; job `i` at `x = i + 1` with `(delivery, pickup)` amounts.
pub fn mixed_problem(capacity: i64, amounts: &[(i64, i64)]) -> VehicleRoutingProblem {
    let job_xs: Vec<f64> = (0..amounts.len()).map(|i| (i + 1) as f64).collect();
    let locations = line_locations(&job_xs, &[0.0]);
    let jobs = amounts
        .iter()
        .enumerate()
        .map(|(i, &(delivery, pickup))| {
            let mut builder = basic_job(i);
            builder
                .set_delivery(Amount::from_vec(vec![delivery]))
                .set_pickup(Amount::from_vec(vec![pickup]));
            builder.build()
        })
        .collect();
    let mut vehicle = basic_vehicle(0, amounts.len());
    vehicle.set_capacity(Amount::from_vec(vec![capacity]));
    build_problem(locations, jobs, vec![vehicle.build()])
}

/// Two vehicles at x = 0 with the given capacities; job `i` at `x = i + 1`.
pub fn two_vehicle_capacity_problem(
    deliveries: &[i64],
    first_capacity: i64,
    second_capacity: i64,
) -> VehicleRoutingProblem {
    let job_xs: Vec<f64> = (0..deliveries.len()).map(|i| (i + 1) as f64).collect();
    let locations = line_locations(&job_xs, &[0.0, 0.0]);
    let jobs = deliveries
        .iter()
        .enumerate()
        .map(|(i, &delivery)| {
            let mut builder = basic_job(i);
            builder.set_delivery(Amount::from_vec(vec![delivery]));
            builder.build()
        })
        .collect();
    let vehicles = [first_capacity, second_capacity]
        .iter()
        .enumerate()
        .map(|(j, &capacity)| {
            let mut builder = basic_vehicle(j, deliveries.len() + j);
            builder.set_capacity(Amount::from_vec(vec![capacity]));
            builder.build()
        })
        .collect();
    build_problem(locations, jobs, vehicles)
}

/// Pickup (job 0, x=1) and delivery (job 1, x=2) of one shipment plus a
/// single (job 2, x=3); one vehicle at x=0, capacity 10.
pub fn shipment_problem() -> VehicleRoutingProblem {
    let locations = line_locations(&[1.0, 2.0, 3.0], &[0.0]);

    let mut pickup = basic_job(0);
    pickup
        .set_kind(JobKind::Pickup)
        .set_shipment_id("s1")
        .set_pickup(Amount::from_vec(vec![1]));
    let mut delivery = basic_job(1);
    delivery
        .set_kind(JobKind::Delivery)
        .set_shipment_id("s1")
        .set_delivery(Amount::from_vec(vec![1]));
    let single = basic_job(2).build();

    let mut vehicle = basic_vehicle(0, 3);
    vehicle.set_capacity(Amount::from_vec(vec![10]));

    build_problem(
        locations,
        vec![pickup.build(), delivery.build(), single],
        vec![vehicle.build()],
    )
}

/// Same shipment plus single layout, with a second vehicle at x=10.
pub fn shipment_problem_two_vehicles() -> VehicleRoutingProblem {
    let locations = line_locations(&[1.0, 2.0, 8.0], &[0.0, 10.0]);

    let mut pickup = basic_job(0);
    pickup
        .set_kind(JobKind::Pickup)
        .set_shipment_id("s1")
        .set_pickup(Amount::from_vec(vec![1]));
    let mut delivery = basic_job(1);
    delivery
        .set_kind(JobKind::Delivery)
        .set_shipment_id("s1")
        .set_delivery(Amount::from_vec(vec![1]));
    let single = basic_job(2).build();

    let vehicles = (0..2)
        .map(|j| {
            let mut builder = basic_vehicle(j, 3 + j);
            builder.set_capacity(Amount::from_vec(vec![10]));
            builder.build()
        })
        .collect();

    build_problem(
        locations,
        vec![pickup.build(), delivery.build(), single],
        vehicles,
    )
}

/// A shipment pair living next to the second vehicle: pickup (job 0, x=8),
/// delivery (job 1, x=9), singles at x=1 (job 2) and x=2 (job 3); vehicles
/// at x=0 and x=10.
pub fn pd_two_vehicle_problem() -> VehicleRoutingProblem {
    let locations = line_locations(&[8.0, 9.0, 1.0, 2.0], &[0.0, 10.0]);

    let mut pickup = basic_job(0);
    pickup
        .set_kind(JobKind::Pickup)
        .set_shipment_id("s1")
        .set_pickup(Amount::from_vec(vec![1]));
    let mut delivery = basic_job(1);
    delivery
        .set_kind(JobKind::Delivery)
        .set_shipment_id("s1")
        .set_delivery(Amount::from_vec(vec![1]));

    let vehicles = (0..2)
        .map(|j| {
            let mut builder = basic_vehicle(j, 4 + j);
            builder.set_capacity(Amount::from_vec(vec![10]));
            builder.build()
        })
        .collect();

    build_problem(
        locations,
        vec![
            pickup.build(),
            delivery.build(),
            basic_job(2).build(),
            basic_job(3).build(),
        ],
        vehicles,
    )
}

/// One vehicle at x=0 with window [0s, 10000s]; jobs `(x, tw_start, tw_end)`
/// in seconds, zero service time.
pub fn tw_line_problem(jobs_spec: &[(f64, i64, i64)]) -> VehicleRoutingProblem {
    let job_xs: Vec<f64> = jobs_spec.iter().map(|&(x, _, _)| x).collect();
    let locations = line_locations(&job_xs, &[0.0]);
    let jobs = jobs_spec
        .iter()
        .enumerate()
        .map(|(i, &(_, start, end))| {
            let mut builder = basic_job(i);
            builder.set_time_window(TimeWindow::from_seconds(start, end));
            builder.build()
        })
        .collect();
    let mut vehicle = basic_vehicle(0, jobs_spec.len());
    vehicle.set_time_window(TimeWindow::from_seconds(0, 10_000));
    build_problem(locations, jobs, vec![vehicle.build()])
}

/// Two jobs (x=1, x=2, windows [0s, 100s]) and one vehicle break with the
/// given window and service seconds.
pub fn tw_break_problem(
    break_start: i64,
    break_end: i64,
    break_service: i64,
) -> VehicleRoutingProblem {
    let locations = line_locations(&[1.0, 2.0], &[0.0]);
    let jobs = (0..2)
        .map(|i| {
            let mut builder = basic_job(i);
            builder.set_time_window(TimeWindow::from_seconds(0, 100));
            builder.build()
        })
        .collect();

    let mut vehicle = basic_vehicle(0, 2);
    vehicle
        .set_time_window(TimeWindow::from_seconds(0, 1_000))
        .set_breaks(vec![Break::new(
            "lunch",
            TimeWindows::from_vec(vec![TimeWindow::from_seconds(break_start, break_end)]),
            SignedDuration::from_secs(break_service),
        )]);

    build_problem(locations, jobs, vec![vehicle.build()])
}

/// One vehicle at x=0; jobs `(x, priority)` with unit deliveries and an
/// optional cap on route length.
pub fn priority_problem(
    jobs_spec: &[(f64, u32)],
    max_tasks: Option<usize>,
) -> VehicleRoutingProblem {
    let job_xs: Vec<f64> = jobs_spec.iter().map(|&(x, _)| x).collect();
    let locations = line_locations(&job_xs, &[0.0]);
    let jobs = jobs_spec
        .iter()
        .enumerate()
        .map(|(i, &(_, priority))| {
            let mut builder = basic_job(i);
            builder
                .set_priority(priority)
                .set_delivery(Amount::from_vec(vec![1]));
            builder.build()
        })
        .collect();

    let mut vehicle = basic_vehicle(0, jobs_spec.len());
    vehicle.set_capacity(Amount::from_vec(vec![100]));
    if let Some(max_tasks) = max_tasks {
        vehicle.set_max_tasks(max_tasks);
    }
    build_problem(locations, jobs, vec![vehicle.build()])
}

/// Capacity 10, four interchangeable deliveries of 3 units at the same
/// stop: exactly one must stay unassigned, and with all costs equal the
/// tie-break decides which.
pub fn capacity_scenario_problem() -> VehicleRoutingProblem {
    let locations = line_locations(&[1.0, 1.0, 1.0, 1.0], &[0.0]);
    let jobs = (0..4)
        .map(|i| {
            let mut builder = basic_job(i);
            builder.set_delivery(Amount::from_vec(vec![3]));
            builder.build()
        })
        .collect();
    let mut vehicle = basic_vehicle(0, 4);
    vehicle.set_capacity(Amount::from_vec(vec![10]));
    build_problem(locations, jobs, vec![vehicle.build()])
}

pub struct TestRoute {
    pub vehicle: usize,
    pub jobs: Vec<usize>,
}

pub fn solution_with_routes(
    problem: &VehicleRoutingProblem,
    routes: Vec<TestRoute>,
) -> Solution {
    let mut solution = Solution::new(problem);
    for route in routes {
        let jobs: Vec<JobIdx> = route.jobs.iter().map(|&j| JobIdx::new(j)).collect();
        solution
            .route_mut(VehicleIdx::new(route.vehicle))
            .replace(problem, &jobs, 0, 0);
        for job in jobs {
            solution.mark_assigned(job);
        }
    }
    solution
}

pub fn route_job_ids(solution: &Solution, vehicle: usize) -> Vec<usize> {
    solution
        .route(VehicleIdx::new(vehicle))
        .jobs()
        .iter()
        .map(|job| job.get())
        .collect()
}
