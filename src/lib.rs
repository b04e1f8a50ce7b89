//! Object browser client for an object-storage console.
//!
//! Uploads and downloads run as cancellable tasks tracked in a transfer
//! registry, with their progress reduced into a shared [`store::Store`]. The
//! navigator keeps the listing, version and rewind views of a bucket.

pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod download;
pub mod errors;
pub mod license;
pub mod navigator;
pub mod store;
pub mod transfer;
pub mod upload;
pub mod validation;

use api::ConsoleClient;
use config::ConsoleConfig;
use errors::ConsoleResult;
use store::Store;

/// Everything a session needs: settings, the API client and the UI state.
pub struct Console {
    pub config: ConsoleConfig,
    pub client: ConsoleClient,
    pub store: Store,
}

impl Console {
    pub fn new(config: ConsoleConfig) -> ConsoleResult<Self> {
        let client = ConsoleClient::from_config(&config)?;
        Ok(Self {
            config,
            client,
            store: Store::new(),
        })
    }
}
