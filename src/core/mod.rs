// Domain-layer modules and shared errors/models
pub mod pipeline {
    pub use crate::pipeline::*;
}

pub mod normalizer {
    pub use crate::normalizer::*;
}

pub mod property_mapper {
    pub use crate::property_mapper::*;
}

pub mod card {
    pub use crate::card::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod errors {
    pub use crate::errors::*;
}
