//! leadline - Lead-qualification conversations with bot/agent hand-off
//!
//! Tracks multi-turn conversations with leads over a messaging channel.
//! Each conversation is driven either by the automated pipeline (bot mode)
//! or by a human operator (agent mode), and returns to the bot after a
//! period of operator inactivity. State is persisted as deltas with a
//! full-snapshot fallback.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
