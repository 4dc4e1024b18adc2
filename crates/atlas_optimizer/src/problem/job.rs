use fxhash::FxHashSet;
use jiff::SignedDuration;
use serde::Serialize;

use crate::define_index_newtype;
use crate::problem::{
    amount::Amount,
    location::LocationIdx,
    skill::Skill,
    time_window::{TimeWindow, TimeWindows},
};

define_index_newtype!(JobIdx, Job);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JobKind {
    Single,
    Pickup,
    Delivery,
}

/// A task at one location. `Pickup` and `Delivery` jobs sharing a shipment id
/// form a same-route, ordered pair; the pairing itself is resolved at problem
/// build time.
#[derive(Debug, Serialize)]
pub struct Job {
    external_id: String,
    location_id: LocationIdx,
    kind: JobKind,
    shipment_id: Option<String>,
    delivery: Amount,
    pickup: Amount,
    service_duration: SignedDuration,
    setup_duration: SignedDuration,
    time_windows: TimeWindows,
    skills: FxHashSet<Skill>,
    priority: u32,
}

impl Job {
    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    pub fn location_id(&self) -> LocationIdx {
        self.location_id
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    pub fn is_single(&self) -> bool {
        self.kind == JobKind::Single
    }

    pub fn is_pickup(&self) -> bool {
        self.kind == JobKind::Pickup
    }

    pub fn is_delivery(&self) -> bool {
        self.kind == JobKind::Delivery
    }

    pub fn shipment_id(&self) -> Option<&str> {
        self.shipment_id.as_deref()
    }

    pub fn delivery(&self) -> &Amount {
        &self.delivery
    }

    pub fn pickup(&self) -> &Amount {
        &self.pickup
    }

    pub fn service_duration(&self) -> SignedDuration {
        self.service_duration
    }

    pub fn setup_duration(&self) -> SignedDuration {
        self.setup_duration
    }

    pub fn time_windows(&self) -> &TimeWindows {
        &self.time_windows
    }

    pub fn skills(&self) -> &FxHashSet<Skill> {
        &self.skills
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }
}

#[derive(Default)]
pub struct JobBuilder {
    external_id: Option<String>,
    location_id: Option<usize>,
    kind: Option<JobKind>,
    shipment_id: Option<String>,
    delivery: Option<Amount>,
    pickup: Option<Amount>,
    service_duration: Option<SignedDuration>,
    setup_duration: Option<SignedDuration>,
    time_windows: Option<TimeWindows>,
    skills: Option<Vec<Skill>>,
    priority: Option<u32>,
}

impl JobBuilder {
    pub fn set_external_id(&mut self, external_id: impl Into<String>) -> &mut Self {
        self.external_id = Some(external_id.into());
        self
    }

    pub fn set_location_id(&mut self, location_id: usize) -> &mut Self {
        self.location_id = Some(location_id);
        self
    }

    pub fn set_kind(&mut self, kind: JobKind) -> &mut Self {
        self.kind = Some(kind);
        self
    }

    pub fn set_shipment_id(&mut self, shipment_id: impl Into<String>) -> &mut Self {
        self.shipment_id = Some(shipment_id.into());
        self
    }

    pub fn set_delivery(&mut self, delivery: Amount) -> &mut Self {
        self.delivery = Some(delivery);
        self
    }

    pub fn set_pickup(&mut self, pickup: Amount) -> &mut Self {
        self.pickup = Some(pickup);
        self
    }

    pub fn set_service_duration(&mut self, duration: SignedDuration) -> &mut Self {
        self.service_duration = Some(duration);
        self
    }

    pub fn set_setup_duration(&mut self, duration: SignedDuration) -> &mut Self {
        self.setup_duration = Some(duration);
        self
    }

    pub fn set_time_window(&mut self, time_window: TimeWindow) -> &mut Self {
        self.time_windows = Some(TimeWindows::from_vec(vec![time_window]));
        self
    }

    pub fn set_time_windows(&mut self, time_windows: Vec<TimeWindow>) -> &mut Self {
        self.time_windows = Some(TimeWindows::from_vec(time_windows));
        self
    }

    pub fn set_skills(&mut self, skills: Vec<String>) -> &mut Self {
        self.skills = Some(skills.into_iter().map(Skill::new).collect());
        self
    }

    pub fn set_priority(&mut self, priority: u32) -> &mut Self {
        self.priority = Some(priority);
        self
    }

    pub fn build(self) -> Job {
        let kind = self.kind.unwrap_or(JobKind::Single);
        debug_assert!(
            kind == JobKind::Single || self.shipment_id.is_some(),
            "pickup/delivery jobs need a shipment id"
        );

        Job {
            external_id: self.external_id.expect("external id is required"),
            location_id: self.location_id.expect("location id is required").into(),
            kind,
            shipment_id: self.shipment_id,
            delivery: self.delivery.unwrap_or_default(),
            pickup: self.pickup.unwrap_or_default(),
            service_duration: self.service_duration.unwrap_or(SignedDuration::ZERO),
            setup_duration: self.setup_duration.unwrap_or(SignedDuration::ZERO),
            time_windows: self.time_windows.unwrap_or_default(),
            skills: FxHashSet::from_iter(self.skills.unwrap_or_default()),
            priority: self.priority.unwrap_or(0),
        }
    }
}
