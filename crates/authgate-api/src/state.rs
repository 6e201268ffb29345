//! Application state management
//!
//! Author: hephaex@gmail.com

use crate::auth::TokenService;
use crate::store::CredentialStore;
use authgate_core::{AppConfig, Result};
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Token service, which also owns the credential store handle
    pub tokens: TokenService,
    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    /// Build state from configuration and the store selected at start-up
    pub fn new(config: AppConfig, store: Arc<dyn CredentialStore>) -> Result<Self> {
        let tokens = TokenService::new(&config, store)?;
        Ok(Self {
            config,
            tokens,
            start_time: Instant::now(),
        })
    }

    pub fn store(&self) -> &dyn CredentialStore {
        self.tokens.store()
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
