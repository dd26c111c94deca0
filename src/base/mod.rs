//! Core components, types, and utilities for the support relay.
//!
//! This module contains fundamental building blocks used throughout the application:
//! - Configuration loading, with defaults persisted on first run.
//! - Identity, ticket, and message types shared by the services.
//! - Common result handling.

pub mod config;
pub mod types;
