//! External service integrations.

pub mod services {
    pub use crate::services::*;
}

pub mod circuit_breaker {
    pub use crate::circuit_breaker::*;
}

pub mod model {
    pub use crate::model::*;
}
