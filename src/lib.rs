pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::http::{ProxyPolicy, ResilientTransport, RetryPolicy};
pub use config::{destinations::DestinationTable, CliConfig};
pub use core::{
    dispatcher::TelegramDispatcher,
    engine::{BroadcastEngine, RunFilter},
    search::CommonsSearch,
};
pub use utils::error::{BotError, Result};
