//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Persistence
//!
//! - `ConversationStore` - load/create/patch/overwrite of conversations
//!
//! ## Collaborators
//!
//! - `FieldExtractor` - Slot-filling pipeline (best-effort)
//! - `ReplyGenerator` - Automated bot replies
//! - `DeliveryChannel` - Outbound messages to the lead
//! - `CrmSync` - Fire-and-forget CRM mirror

mod conversation_store;
mod crm_sync;
mod delivery_channel;
mod field_extractor;
mod reply_generator;

pub use conversation_store::{ConversationStore, PatchOutcome, StoreError};
pub use crm_sync::{CrmSync, SyncError};
pub use delivery_channel::{DeliveryChannel, DeliveryError};
pub use field_extractor::{ExtractionError, FieldExtractor};
pub use reply_generator::{ReplyError, ReplyGenerator};
