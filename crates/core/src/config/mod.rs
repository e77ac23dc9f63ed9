use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    state::DEFAULT_MASTER_VOLUME, AudioSettings, GlitchError, Palette, RenderRequest, Result,
    ScrambleOptions, Theme,
};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub audio: AudioConfig,
    pub render: RenderConfig,
    pub scramble: ScrambleOptions,
}

impl AppConfig {
    /// Reads a JSON config file. Missing sections and fields take defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let config = Self::from_json(&raw)?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.scramble.tick_interval_ms == 0 {
            return Err(GlitchError::InvalidInput(
                "scramble.tick_interval_ms must be at least 1",
            ));
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Configuration specific to the audio subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Sample rate used for offline cue rendering.
    pub sample_rate: u32,
    pub enabled: bool,
    pub master_volume: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            enabled: true,
            master_volume: DEFAULT_MASTER_VOLUME,
        }
    }
}

impl AudioConfig {
    pub fn settings(&self) -> AudioSettings {
        AudioSettings {
            enabled: self.enabled,
            ..AudioSettings::default()
        }
        .with_volume(self.master_volume)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub pixel_size: u32,
    pub bold: bool,
    pub theme: Theme,
    pub palette: Palette,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            pixel_size: 3,
            bold: false,
            theme: Theme::Dark,
            palette: Palette::default(),
        }
    }
}

impl RenderConfig {
    /// A request for `text` carrying the configured size and weight.
    pub fn request(&self, text: impl Into<String>) -> RenderRequest {
        RenderRequest::new(text)
            .pixel_size(self.pixel_size)
            .bold(self.bold)
    }
}
