use serde::Serialize;

use crate::problem::{vehicle::VehicleIdx, vrp::VehicleRoutingProblem};
use crate::search::solution::raw_route::eval_of_sequence;
use crate::search::solution::tw_route::{TwRoute, simulate_sequence};

/// A relaxed constraint observed on a finished route. Feasible problems
/// produce none of these; the audit exists so callers can trust (or
/// distrust) what they are given back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ViolationKind {
    Capacity,
    TimeWindow,
    Skills,
    Precedence,
    MaxTasks,
    TravelBounds,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Violations {
    kinds: Vec<ViolationKind>,
}

impl Violations {
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn kinds(&self) -> &[ViolationKind] {
        &self.kinds
    }

    fn record(&mut self, kind: ViolationKind) {
        if !self.kinds.contains(&kind) {
            self.kinds.push(kind);
        }
    }
}

/// Post-hoc audit of one route against every hard constraint.
pub fn check_route(
    problem: &VehicleRoutingProblem,
    vehicle_id: VehicleIdx,
    route: &TwRoute,
) -> Violations {
    let mut violations = Violations::default();
    if route.is_empty() {
        return violations;
    }

    let vehicle = problem.vehicle(vehicle_id);

    if !route.max_load().fits_within(vehicle.capacity()) {
        violations.record(ViolationKind::Capacity);
    }

    if vehicle.max_tasks().is_some_and(|max| route.len() > max) {
        violations.record(ViolationKind::MaxTasks);
    }

    for &job_id in route.jobs() {
        if !problem.vehicle_ok_with_job(vehicle_id, job_id) {
            violations.record(ViolationKind::Skills);
        }
        if let Some(partner) = problem.paired_job(job_id) {
            let job = problem.job(job_id);
            let partner_rank = route.position_of(partner);
            let rank = route
                .position_of(job_id)
                .expect("job taken from the route itself");
            let ordered = match partner_rank {
                Some(partner_rank) if job.is_pickup() => rank < partner_rank,
                Some(partner_rank) => partner_rank < rank,
                None => false,
            };
            if !ordered {
                violations.record(ViolationKind::Precedence);
            }
        }
    }

    if problem.has_time_windows() && simulate_sequence(problem, vehicle_id, route.jobs()).is_none()
    {
        violations.record(ViolationKind::TimeWindow);
    }

    let eval = eval_of_sequence(problem, vehicle_id, route.jobs());
    if vehicle
        .max_travel_duration()
        .is_some_and(|max| eval.duration > max)
        || vehicle.max_distance().is_some_and(|max| eval.distance > max)
    {
        violations.record(ViolationKind::TravelBounds);
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;

    #[test]
    fn test_feasible_route_has_no_violations() {
        let problem = test_utils::euclidean_line_problem(&[1.0, 2.0], &[0.0]);
        let solution = test_utils::solution_with_routes(
            &problem,
            vec![test_utils::TestRoute {
                vehicle: 0,
                jobs: vec![0, 1],
            }],
        );

        let violations = check_route(&problem, VehicleIdx::new(0), solution.route(VehicleIdx::new(0)));
        assert!(violations.is_empty());
    }
}
