use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::chunking::ChunkingConfig;
use crate::features::FeatureConfig;

const ENABLE_LOGS: bool = true;

use crate::log_warn;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineSettings {
    pub chunking: ChunkingConfig,
    pub features: FeatureConfig,
    /// VADER-format lexicon; the built-in one is used when unset
    pub lexicon_path: Option<PathBuf>,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<PipelineSettings>,
}

impl SettingsStore {
    /// Loads `path`. A missing file gives defaults; an unparsable one gives
    /// defaults and a warning, and is overwritten on the next persist.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log_warn!("ignoring unreadable settings {}: {err}", path.display());
                PipelineSettings::default()
            })
        } else {
            PipelineSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn settings(&self) -> PipelineSettings {
        self.read().clone()
    }

    pub fn update(&self, settings: PipelineSettings) -> Result<()> {
        let mut guard = self.write();
        *guard = settings;
        self.write_file(&guard)
    }

    pub fn persist(&self) -> Result<()> {
        let guard = self.read();
        self.write_file(&guard)
    }

    fn write_file(&self, data: &PipelineSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    // The data is plain values, so a poisoned lock still holds a usable copy.
    fn read(&self) -> RwLockReadGuard<'_, PipelineSettings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, PipelineSettings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
