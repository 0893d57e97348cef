use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const CONFIG_FILE: &str = "attendanced.toml";

/// Per-workspace settings, read from `attendanced.toml` when present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Fixture path, relative to the workspace unless absolute.
    pub fixture_file: String,
    pub coins: CoinsConfig,
    pub detection: DetectionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoinsConfig {
    /// Flat credit for each present or late mark.
    pub attendance_award: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub delay_ms: u64,
    /// Probability that a rostered student is "seen" by the camera.
    pub hit_rate: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fixture_file: "fakeData.json".to_string(),
            coins: CoinsConfig::default(),
            detection: DetectionConfig::default(),
        }
    }
}

impl Default for CoinsConfig {
    fn default() -> Self {
        Self {
            attendance_award: 5,
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            delay_ms: 2000,
            hit_rate: 0.7,
        }
    }
}

impl Settings {
    pub fn load(workspace: &Path) -> anyhow::Result<Self> {
        let path = workspace.join(CONFIG_FILE);
        if !path.is_file() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.to_string_lossy()))?;
        Self::from_toml(&text).with_context(|| format!("invalid {}", path.to_string_lossy()))
    }

    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        let settings: Settings = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if !(0.0..=1.0).contains(&self.detection.hit_rate) {
            return Err(anyhow!(
                "detection.hit_rate must be between 0 and 1, got {}",
                self.detection.hit_rate
            ));
        }
        if self.coins.attendance_award < 0 {
            return Err(anyhow!("coins.attendance_award must not be negative"));
        }
        if self.fixture_file.trim().is_empty() {
            return Err(anyhow!("fixture_file must not be empty"));
        }
        Ok(())
    }

    pub fn fixture_path(&self, workspace: &Path) -> std::path::PathBuf {
        let p = Path::new(&self.fixture_file);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            workspace.join(p)
        }
    }
}
