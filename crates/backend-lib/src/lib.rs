// ============================
// identity-backend-lib/src/lib.rs
// ============================
//! Core backend-lib functionality for the identity service: credential
//! storage, lockout, claims and bearer tokens behind an axum surface.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod metrics;
pub mod middleware;
pub mod router;
pub mod storage;
pub mod validation;

use crate::auth::{AuthService, AuthenticationEngine, Clock};
use crate::config::{Settings, StorageBackend};
use crate::storage::{FlatFileStore, IdentityStore, InMemoryStore};
use std::sync::Arc;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Authentication service
    pub auth: Arc<dyn AuthService>,
}

impl AppState {
    pub fn new(auth: Arc<dyn AuthService>) -> Self {
        Self { auth }
    }

    /// Build the engine over `store`, seed the reference claims and the
    /// configured administrator
    pub async fn with_store<S>(store: Arc<S>, settings: &Settings) -> anyhow::Result<Self>
    where
        S: IdentityStore + ?Sized + 'static,
    {
        Self::with_store_and_clock(store, settings, None).await
    }

    /// As [`with_store`](Self::with_store), reading time from `clock` when given
    pub async fn with_store_and_clock<S>(
        store: Arc<S>,
        settings: &Settings,
        clock: Option<Arc<dyn Clock>>,
    ) -> anyhow::Result<Self>
    where
        S: IdentityStore + ?Sized + 'static,
    {
        let mut engine = AuthenticationEngine::new(store, settings)?;
        if let Some(clock) = clock {
            engine = engine.with_clock(clock);
        }
        engine.bootstrap().await?;
        if let Some(admin) = &settings.bootstrap_admin {
            engine.bootstrap_admin(admin).await?;
        }
        Ok(Self::new(Arc::new(engine)))
    }

    /// Build state from settings, opening the configured store
    pub async fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let store: Arc<dyn IdentityStore> = match settings.storage.backend {
            StorageBackend::Memory => Arc::new(InMemoryStore::new()),
            StorageBackend::File => Arc::new(FlatFileStore::open(&settings.storage.path).await?),
        };
        tracing::info!("Using {:?} identity store", settings.storage.backend);
        Self::with_store(store, settings).await
    }
}
