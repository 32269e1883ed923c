use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock, time::Duration};

use crate::pipeline::config::{HealthThresholds, WindowingConfig};

const THROTTLE_ENV_VAR: &str = "LEADFLOW_THROTTLE_MS";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineSettings {
    /// Quiet period after which a gesture's latest transition is applied.
    pub throttle_window_ms: u64,
    /// Upper bound on any single store call.
    pub store_timeout_ms: u64,
    pub windowing: WindowingConfig,
    pub health: HealthThresholds,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            throttle_window_ms: 100,
            store_timeout_ms: 5_000,
            windowing: WindowingConfig::default(),
            health: HealthThresholds::default(),
        }
    }
}

impl PipelineSettings {
    pub fn throttle_window(&self) -> Duration {
        Duration::from_millis(self.throttle_window_ms)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    /// Apply `LEADFLOW_THROTTLE_MS` when it holds a valid number.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(ms) = std::env::var(THROTTLE_ENV_VAR)
            .ok()
            .and_then(|value| value.trim().parse::<u64>().ok())
        {
            self.throttle_window_ms = ms;
        }
        self
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<PipelineSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            PipelineSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn pipeline(&self) -> PipelineSettings {
        match self.data.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn update_pipeline(&self, settings: PipelineSettings) -> Result<()> {
        let mut guard = self
            .data
            .write()
            .map_err(|_| anyhow!("settings lock poisoned"))?;
        *guard = settings;
        self.persist(&guard)
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)?;
        let data: PipelineSettings = serde_json::from_str(&contents)?;
        let mut guard = self
            .data
            .write()
            .map_err(|_| anyhow!("settings lock poisoned"))?;
        *guard = data;
        Ok(())
    }

    fn persist(&self, data: &PipelineSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
