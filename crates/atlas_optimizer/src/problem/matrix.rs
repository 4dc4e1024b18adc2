use jiff::SignedDuration;
use serde::Deserialize;

use crate::problem::location::{Location, LocationIdx};

pub type Distance = f64;
pub type Duration = f64;
pub type Cost = f64;

/// Flat duration/distance (and optionally cost) matrices for one routing
/// profile. `index = from * num_locations + to`.
#[derive(Debug, Deserialize)]
pub struct TravelMatrices {
    durations: Vec<Duration>,
    distances: Vec<Distance>,
    costs: Option<Vec<Cost>>,
    num_locations: usize,
}

impl TravelMatrices {
    pub fn new(
        durations: Vec<Vec<Duration>>,
        distances: Vec<Vec<Distance>>,
        costs: Option<Vec<Vec<Cost>>>,
    ) -> Self {
        let num_locations = durations.len();
        debug_assert!(durations.iter().all(|row| row.len() == num_locations));
        debug_assert_eq!(distances.len(), num_locations);

        TravelMatrices {
            durations: durations.into_iter().flatten().collect(),
            distances: distances.into_iter().flatten().collect(),
            costs: costs.map(|costs| costs.into_iter().flatten().collect()),
            num_locations,
        }
    }

    /// Unit-speed Euclidean matrices, with cost equal to distance.
    pub fn from_euclidean(locations: &[Location]) -> Self {
        let num_locations = locations.len();
        let mut distances = vec![0.0; num_locations * num_locations];

        for (i, from) in locations.iter().enumerate() {
            for (j, to) in locations.iter().enumerate() {
                distances[i * num_locations + j] = from.euclidean_distance(to);
            }
        }

        TravelMatrices {
            durations: distances.clone(),
            costs: Some(distances.clone()),
            distances,
            num_locations,
        }
    }

    pub fn from_constant(
        num_locations: usize,
        duration: Duration,
        distance: Distance,
        cost: Cost,
    ) -> Self {
        let cells = num_locations * num_locations;
        TravelMatrices {
            durations: vec![duration; cells],
            distances: vec![distance; cells],
            costs: Some(vec![cost; cells]),
            num_locations,
        }
    }

    #[inline(always)]
    fn index(&self, from: LocationIdx, to: LocationIdx) -> usize {
        from.get() * self.num_locations + to.get()
    }

    #[inline(always)]
    pub fn duration(&self, from: LocationIdx, to: LocationIdx) -> SignedDuration {
        if from == to {
            return SignedDuration::ZERO;
        }
        SignedDuration::from_secs_f64(self.durations[self.index(from, to)])
    }

    #[inline(always)]
    pub fn distance(&self, from: LocationIdx, to: LocationIdx) -> Distance {
        if from == to {
            return 0.0;
        }
        self.distances[self.index(from, to)]
    }

    /// Explicit per-edge cost when the profile provides one.
    #[inline(always)]
    pub fn cost(&self, from: LocationIdx, to: LocationIdx) -> Option<Cost> {
        if from == to {
            return Some(0.0);
        }
        self.costs
            .as_ref()
            .map(|costs| costs[self.index(from, to)])
    }

    pub fn num_locations(&self) -> usize {
        self.num_locations
    }
}
