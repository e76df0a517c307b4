//! Delivery channel adapters.

mod logging;
mod whatsapp;

pub use logging::LoggingDeliveryChannel;
pub use whatsapp::{normalize_mexican_number, WhatsAppClientConfig, WhatsAppDeliveryChannel};
