use crate::define_index_newtype;
use crate::problem::matrix::TravelMatrices;

define_index_newtype!(ProfileIdx, Profile);

/// A routing profile: one set of travel matrices shared by every vehicle
/// referencing it.
#[derive(Debug)]
pub struct Profile {
    name: String,
    matrices: TravelMatrices,
}

impl Profile {
    pub fn new(name: impl Into<String>, matrices: TravelMatrices) -> Self {
        Profile {
            name: name.into(),
            matrices,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn matrices(&self) -> &TravelMatrices {
        &self.matrices
    }
}
