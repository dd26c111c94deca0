//! Event handling and background work for the support relay.
//!
//! This module provides:
//! - Routing of inbound messages between customers and their topics in the staff group
//! - Periodic expiry of tickets that have gone quiet

pub mod router;
pub mod sweeper;
