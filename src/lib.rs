//! Lead pipeline engine.
//!
//! Snapshot in, derived views out: leads are partitioned into ranked stage buckets,
//! aggregated into pipeline metrics, classified by health and windowed for display. Stage
//! changes go through a [`TransitionController`] that validates them against the last-seen
//! snapshot and writes them to a [`LeadStore`].

pub mod db;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod settings;
pub mod store;
pub mod transition;
pub mod utils;
pub mod windowing;

use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};

pub use db::Database;
pub use metrics::{aggregate, PipelineMetrics, StageMetrics};
pub use models::{Activity, ActivityNote, ActivityType, Lead, LeadSnapshot, Priority, Stage};
pub use pipeline::{
    classify_health, compare_leads, partition, HealthTier, Partitioned, PipelineView,
};
pub use settings::{PipelineSettings, SettingsStore};
pub use store::LeadStore;
pub use transition::{
    ControllerConfig, GestureEvent, PipelineEvent, PipelineEventSink, TransitionAck,
    TransitionController, TransitionError, TransitionRequest,
};
pub use windowing::{window_for, RenderWindow, WindowMode, WindowingStrategy};

/// Initialize logging from `RUST_LOG`, falling back to `info` when it is unset.
///
/// Errors if a logger is already installed, e.g. by the embedding application.
pub fn init_logging() -> Result<(), log::SetLoggerError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).try_init()
}

/// Database, settings and controller wired together over one data directory.
pub struct Workspace {
    db: Database,
    settings: SettingsStore,
    controller: TransitionController,
}

impl Workspace {
    pub async fn open(
        data_dir: impl AsRef<Path>,
        sink: Arc<dyn PipelineEventSink>,
    ) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        std::fs::create_dir_all(data_dir).with_context(|| {
            format!("failed to create data directory {}", data_dir.display())
        })?;

        let database = Database::new(data_dir.join("leadflow.sqlite3"))?;
        let settings = SettingsStore::new(data_dir.join("settings.json"))?;
        let pipeline = settings.pipeline().with_env_overrides();

        let controller = TransitionController::new(
            Arc::new(database.clone()),
            sink,
            ControllerConfig::from(&pipeline),
        );
        controller
            .refresh()
            .await
            .context("failed to load initial lead snapshot")?;

        log::info!("Workspace opened at {}", data_dir.display());

        Ok(Self {
            db: database,
            settings,
            controller,
        })
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn controller(&self) -> &TransitionController {
        &self.controller
    }

    pub fn windowing(&self) -> WindowingStrategy {
        WindowingStrategy::new(self.settings.pipeline().windowing)
    }

    pub fn health_thresholds(&self) -> pipeline::HealthThresholds {
        self.settings.pipeline().health
    }

    pub async fn close(&self) {
        self.controller.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_logging_reports_an_installed_logger() {
        // Another test may have installed it first; either way a second call must fail.
        let _ = init_logging();
        assert!(init_logging().is_err());
    }
}
