//! Domain layer containing business types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors)
//! - `bulk_operation` - Bulk operation progress snapshots and their lifecycle states

pub mod bulk_operation;
pub mod foundation;
