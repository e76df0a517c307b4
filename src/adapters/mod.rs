//! Adapters - Implementations of the ports plus the HTTP surface.
//!
//! - `storage` - conversation stores (in-memory, YAML file, PostgreSQL)
//! - `extraction` - field extractors (keyword rules, HTTP service)
//! - `replies` - scripted reply generator
//! - `delivery` - outbound channels (WhatsApp Cloud API, logging)
//! - `crm` - CRM mirrors (HubSpot, logging)
//! - `http` - axum REST API

pub mod crm;
pub mod delivery;
pub mod extraction;
pub mod http;
pub mod replies;
pub mod storage;
