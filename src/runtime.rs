//! Runtime services and shared state for the support relay.

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::{
    base::{
        config::Config,
        types::{Res, Void},
    },
    interaction::{
        router::Router,
        sweeper::{self, SweeperSettings},
    },
    service::{chat::ChatClient, db::DbClient},
};

/// Runtime service context that can be shared across the application.
///
/// This struct holds the database client, chat client, and configuration.
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct Runtime {
    /// The configuration for the application.
    pub config: Config,
    /// The ticket store.
    pub db: DbClient,
    /// The chat client instance.
    pub chat: ChatClient,
}

impl Runtime {
    /// Create a new runtime instance.
    ///
    /// Fails if the ticket store cannot be opened or the bot token is rejected.
    #[instrument(skip_all)]
    pub async fn new(config: Config) -> Res<Self> {
        // Initialize the database.
        let db = DbClient::surreal_file(&config.db_path).await?;

        // Initialize the chat client.
        let chat = ChatClient::telegram(&config).await?;

        Ok(Self { config, db, chat })
    }

    /// The router over this runtime's services.
    pub fn router(&self) -> Router {
        Router::new(self.config.clone(), self.db.clone(), self.chat.clone())
    }

    /// The sweeper settings from the configuration.
    pub fn sweeper_settings(&self) -> SweeperSettings {
        SweeperSettings {
            expiry_days: self.config.expiry_day,
            initial_delay: self.config.sweep_delay(),
            interval: self.config.sweep_interval(),
        }
    }

    /// Runs the sweeper and the chat listener until the listener is interrupted.
    pub async fn start(&self) -> Void {
        let shutdown = CancellationToken::new();

        let _sweeper = sweeper::spawn_sweeper(self.db.clone(), self.sweeper_settings(), shutdown.clone());

        let result = self.chat.start(self.router()).await;

        info!("Shutting down ...");
        shutdown.cancel();

        result
    }
}
