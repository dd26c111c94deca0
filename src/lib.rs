//! Library root for `support-relay`.
//!
//! Support-relay is a Telegram bot that connects customers to a support team:
//! - Each customer gets a ticket: a dedicated topic in the staff forum group
//! - Customer messages are forwarded into their topic, staff replies back to the customer
//! - Photos and documents keep their captions and formatting
//! - Tickets that go quiet for too long are expired by a background sweeper
//!
//! The bot integrates with Telegram for chat and SurrealDB for storage. The
//! architecture is built around traits that allow for different implementations
//! of each service.

pub mod base;
pub mod interaction;
pub mod runtime;
pub mod service;

use base::{config::Config, types::Void};
use rustls::crypto;
use tracing::{info, warn};

/// Public async entry for the binary crate.
///
/// Sets up necessary services and starts the relay runtime:
/// - Initializes the crypto provider
/// - Creates the runtime context with the ticket store and chat client
/// - Starts the sweeper and the main event loop for processing messages
pub async fn start(config: Config) -> Void {
    info!("Starting support-relay ...");

    // Start the crypto provider.
    if crypto::ring::default_provider().install_default().is_err() {
        warn!("A crypto provider was already installed.");
    }

    // Initialize the runtime.
    let runtime = runtime::Runtime::new(config).await?;

    // Start the runtime.
    runtime.start().await?;

    Ok(())
}
