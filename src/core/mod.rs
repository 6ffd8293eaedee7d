// Workflow steps and shared errors/models
pub mod ingest {
    pub use crate::ingest::*;
}

pub mod normalizer {
    pub use crate::normalizer::*;
}

pub mod validation {
    pub use crate::validation::*;
}

pub mod enrichment {
    pub use crate::enrichment::*;
}

pub mod scoring {
    pub use crate::scoring::*;
}

pub mod pipeline {
    pub use crate::pipeline::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod errors {
    pub use crate::errors::*;
}
