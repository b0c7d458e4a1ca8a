//! FarmKonnect - Bulk operation progress service
//!
//! This crate broadcasts the progress of long-running bulk farm-record
//! operations (batch edits, imports, exports, bulk registrations) to the
//! browsers watching them over WebSocket, and answers polling queries
//! about what is currently running.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
