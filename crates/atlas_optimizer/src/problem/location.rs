use serde::Serialize;

use crate::define_index_newtype;

define_index_newtype!(LocationIdx, Location);

/// Planar location used by the synthetic matrix builders. The search itself
/// only ever sees `LocationIdx` and matrix lookups.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Location {
    x: f64,
    y: f64,
}

impl Location {
    pub fn new(x: f64, y: f64) -> Self {
        Location { x, y }
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn euclidean_distance(&self, other: &Location) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}
