//! External service integrations.

pub mod kickbox_client {
    pub use crate::kickbox_client::*;
}

pub mod hubspot_client {
    pub use crate::hubspot_client::*;
}

pub mod invocation_models {
    pub use crate::invocation_models::*;
}
