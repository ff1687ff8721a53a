//! # Application State
//!
//! This module defines the shared application state (`AppState`) and the
//! logic for building it at startup. The `AppState` holds the configuration,
//! the database provider, and the two stores, making them accessible to all
//! request handlers.

use crate::config::AppConfig;
use onboard::{
    files::LocalFileStorage,
    notify::{NotificationDispatcher, QueueDispatcher},
    FormStore, SqliteProvider, SubmissionStore,
};
use std::sync::Arc;

/// The shared application state, accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The application's configuration, loaded from `config.yml`.
    pub config: Arc<AppConfig>,
    /// The primary database provider.
    pub sqlite_provider: Arc<SqliteProvider>,
    /// Form and field definitions.
    pub forms: FormStore,
    /// Submission intake and review.
    pub submissions: SubmissionStore,
}

/// Builds the shared application state from the configuration, spawning the
/// notification worker that delivers new-submission notices.
pub async fn build_app_state(config: AppConfig) -> anyhow::Result<AppState> {
    let dispatcher = Arc::new(QueueDispatcher::spawn(config.admin_contact.clone()));
    build_app_state_with_dispatcher(config, dispatcher).await
}

/// Like [`build_app_state`], but with an injected dispatcher so tests can
/// observe what would have been delivered.
pub async fn build_app_state_with_dispatcher(
    config: AppConfig,
    dispatcher: Arc<dyn NotificationDispatcher>,
) -> anyhow::Result<AppState> {
    if let Some(parent) = std::path::Path::new(&config.db_url).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let sqlite_provider = SqliteProvider::new(&config.db_url).await?;
    tracing::info!(db_path = %config.db_url, "Initialized local storage provider (SQLite).");
    // Ensure the database schema is up-to-date on startup.
    sqlite_provider.initialize_schema().await?;

    let storage = Arc::new(LocalFileStorage::new(config.upload_root.clone()));
    let forms = FormStore::new(&sqlite_provider);
    let submissions = SubmissionStore::new(&sqlite_provider, storage, dispatcher);

    Ok(AppState {
        config: Arc::new(config),
        sqlite_provider: Arc::new(sqlite_provider),
        forms,
        submissions,
    })
}
