use fxhash::FxHashSet;
use jiff::SignedDuration;
use serde::Serialize;

use crate::define_index_newtype;
use crate::problem::{
    amount::Amount, brk::Break, job::Job, location::LocationIdx, profile::ProfileIdx, skill::Skill,
    time_window::TimeWindow,
};

define_index_newtype!(VehicleIdx, Vehicle);

/// Fixed activation cost plus travel rates. When the vehicle's profile
/// carries an explicit cost matrix the rates are ignored for edge costs.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct VehicleCosts {
    pub fixed: f64,
    pub per_hour: f64,
    pub per_km: f64,
}

impl Default for VehicleCosts {
    fn default() -> Self {
        VehicleCosts {
            fixed: 0.0,
            per_hour: 3600.0,
            per_km: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Vehicle {
    external_id: String,
    profile_id: ProfileIdx,
    start_location_id: Option<LocationIdx>,
    end_location_id: Option<LocationIdx>,
    capacity: Amount,
    skills: FxHashSet<Skill>,
    time_window: TimeWindow,
    costs: VehicleCosts,
    max_travel_duration: Option<SignedDuration>,
    max_distance: Option<f64>,
    max_tasks: Option<usize>,
    breaks: Vec<Break>,
}

impl Vehicle {
    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    pub fn profile_id(&self) -> ProfileIdx {
        self.profile_id
    }

    pub fn start_location_id(&self) -> Option<LocationIdx> {
        self.start_location_id
    }

    pub fn end_location_id(&self) -> Option<LocationIdx> {
        self.end_location_id
    }

    pub fn capacity(&self) -> &Amount {
        &self.capacity
    }

    pub fn skills(&self) -> &FxHashSet<Skill> {
        &self.skills
    }

    pub fn time_window(&self) -> &TimeWindow {
        &self.time_window
    }

    pub fn costs(&self) -> &VehicleCosts {
        &self.costs
    }

    pub fn max_travel_duration(&self) -> Option<SignedDuration> {
        self.max_travel_duration
    }

    pub fn max_distance(&self) -> Option<f64> {
        self.max_distance
    }

    pub fn max_tasks(&self) -> Option<usize> {
        self.max_tasks
    }

    pub fn breaks(&self) -> &[Break] {
        &self.breaks
    }

    /// Skill compatibility: the vehicle must carry every skill the job needs.
    pub fn can_serve(&self, job: &Job) -> bool {
        job.skills().is_subset(&self.skills)
    }
}

#[derive(Default)]
pub struct VehicleBuilder {
    external_id: Option<String>,
    profile_id: Option<usize>,
    start_location_id: Option<usize>,
    end_location_id: Option<usize>,
    capacity: Option<Amount>,
    skills: Option<Vec<Skill>>,
    time_window: Option<TimeWindow>,
    costs: Option<VehicleCosts>,
    max_travel_duration: Option<SignedDuration>,
    max_distance: Option<f64>,
    max_tasks: Option<usize>,
    breaks: Option<Vec<Break>>,
}

impl VehicleBuilder {
    pub fn set_external_id(&mut self, external_id: impl Into<String>) -> &mut Self {
        self.external_id = Some(external_id.into());
        self
    }

    pub fn set_profile_id(&mut self, profile_id: usize) -> &mut Self {
        self.profile_id = Some(profile_id);
        self
    }

    pub fn set_start_location_id(&mut self, location_id: usize) -> &mut Self {
        self.start_location_id = Some(location_id);
        self
    }

    pub fn set_end_location_id(&mut self, location_id: usize) -> &mut Self {
        self.end_location_id = Some(location_id);
        self
    }

    pub fn set_capacity(&mut self, capacity: Amount) -> &mut Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn set_skills(&mut self, skills: Vec<String>) -> &mut Self {
        self.skills = Some(skills.into_iter().map(Skill::new).collect());
        self
    }

    pub fn set_time_window(&mut self, time_window: TimeWindow) -> &mut Self {
        self.time_window = Some(time_window);
        self
    }

    pub fn set_costs(&mut self, costs: VehicleCosts) -> &mut Self {
        self.costs = Some(costs);
        self
    }

    pub fn set_fixed_cost(&mut self, fixed: f64) -> &mut Self {
        let mut costs = self.costs.unwrap_or_default();
        costs.fixed = fixed;
        self.costs = Some(costs);
        self
    }

    pub fn set_max_travel_duration(&mut self, duration: SignedDuration) -> &mut Self {
        self.max_travel_duration = Some(duration);
        self
    }

    pub fn set_max_distance(&mut self, distance: f64) -> &mut Self {
        self.max_distance = Some(distance);
        self
    }

    pub fn set_max_tasks(&mut self, max_tasks: usize) -> &mut Self {
        self.max_tasks = Some(max_tasks);
        self
    }

    pub fn set_breaks(&mut self, breaks: Vec<Break>) -> &mut Self {
        self.breaks = Some(breaks);
        self
    }

    pub fn build(self) -> Vehicle {
        Vehicle {
            external_id: self.external_id.expect("external id is required"),
            profile_id: self.profile_id.expect("profile id is required").into(),
            start_location_id: self.start_location_id.map(|id| id.into()),
            end_location_id: self.end_location_id.map(|id| id.into()),
            capacity: self.capacity.unwrap_or(Amount::EMPTY),
            skills: FxHashSet::from_iter(self.skills.unwrap_or_default()),
            time_window: self.time_window.unwrap_or_else(TimeWindow::whole_horizon),
            costs: self.costs.unwrap_or_default(),
            max_travel_duration: self.max_travel_duration,
            max_distance: self.max_distance,
            max_tasks: self.max_tasks,
            breaks: self.breaks.unwrap_or_default(),
        }
    }
}
