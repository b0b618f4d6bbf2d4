pub mod auth;
pub mod config;
pub mod db;
pub mod gateway;
pub mod models;
pub mod routes;
pub mod store;

use std::sync::Arc;

use auth::Authenticator;
use config::Config;
use gateway::calls::CallRegistry;
use gateway::fanout::RelayBroadcast;
use gateway::presence::PresenceRegistry;
use gateway::relay::MessageRelay;
use store::MessageStore;

/// Shared application state available to all route handlers and sessions.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub auth: Arc<dyn Authenticator>,
    pub store: Arc<dyn MessageStore>,
    pub presence: Arc<PresenceRegistry>,
    pub calls: Arc<CallRegistry>,
    pub relay: Arc<MessageRelay>,
    pub broadcast: RelayBroadcast,
}
