use std::hint::black_box;
use std::sync::Arc;

use atlas_optimizer::problem::{
    job::JobBuilder,
    location::Location,
    matrix::TravelMatrices,
    profile::Profile,
    vehicle::VehicleBuilder,
    vrp::{VehicleRoutingProblem, VehicleRoutingProblemBuilder},
};
use atlas_optimizer::search::solution::Solution;
use atlas_optimizer::search::solver::{SearchInput, solve};
use criterion::{Criterion, criterion_group, criterion_main};
use rand::{Rng, SeedableRng, rngs::SmallRng};

fn random_problem(jobs: usize, vehicles: usize, seed: u64) -> VehicleRoutingProblem {
    let mut rng = SmallRng::seed_from_u64(seed);
    let locations: Vec<Location> = (0..jobs + vehicles)
        .map(|_| Location::new(rng.random_range(0.0..100.0), rng.random_range(0.0..100.0)))
        .collect();

    let job_list = (0..jobs)
        .map(|i| {
            let mut builder = JobBuilder::default();
            builder.set_external_id(i.to_string()).set_location_id(i);
            builder.build()
        })
        .collect();
    let vehicle_list = (0..vehicles)
        .map(|j| {
            let mut builder = VehicleBuilder::default();
            builder
                .set_external_id(format!("vehicle_{j}"))
                .set_profile_id(0)
                .set_start_location_id(jobs + j);
            builder.build()
        })
        .collect();

    let mut builder = VehicleRoutingProblemBuilder::default();
    builder
        .set_profiles(vec![Profile::new(
            "car",
            TravelMatrices::from_euclidean(&locations),
        )])
        .set_jobs(job_list)
        .set_vehicles(vehicle_list)
        .set_locations(locations);
    builder.build()
}

fn search_benchmark(c: &mut Criterion) {
    let problem = Arc::new(random_problem(40, 4, 1234));

    c.bench_function("local search 40 jobs 4 vehicles", |b| {
        b.iter(|| {
            let output = solve(SearchInput {
                problem: Arc::clone(&problem),
                solution: Solution::new(&problem),
                deadline: None,
                seed: 99,
                max_nb_jobs_removal: 4,
                threads: 1,
            })
            .expect("solve succeeds");
            black_box(output.score.cost)
        })
    });
}

criterion_group!(benches, search_benchmark);
criterion_main!(benches);
