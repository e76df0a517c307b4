//! CRM sync adapters.

mod hubspot;
mod logging;

pub use hubspot::{HubSpotClientConfig, HubSpotCrmSync};
pub use logging::LoggingCrmSync;
