//! Reply generator adapters.

mod inventory;
mod scripted;

pub use inventory::{inventory_answer, is_inventory_question, models_for, InventoryItem};
pub use scripted::{ScriptedReplyGenerator, CLOSING_REPLY, CLOSING_REPLY_OTHER};
