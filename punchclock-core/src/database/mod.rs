//! Local database layer for the attendance terminal.
//!
//! This module handles connection management and schema creation for
//! the device-local state: session, tenant configuration, sync
//! metadata, and the punch log.

pub mod schema;

pub use schema::Database;
