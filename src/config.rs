use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::classify::{FrameClassifier, DEFAULT_ASSOCIATION_IOU};
use crate::detect::DEFAULT_MIN_CONFIDENCE;
use crate::ingest::MAX_FRAME_DIMENSION;
use crate::tracker::DEFAULT_DUPLICATE_IOU;

const DEFAULT_VEHICLE_LABELS: &[&str] = &[
    "box_truck",
    "dump_truck",
    "tank_truck",
    "pickup_truck",
    "truck",
];
const DEFAULT_CARGO_LABEL: &str = "overdimension_load";
const DEFAULT_SOURCE_URL: &str = "stub://csi0";
const DEFAULT_SOURCE_WIDTH: u32 = 1280;
const DEFAULT_SOURCE_HEIGHT: u32 = 720;
const DEFAULT_SOURCE_FPS: u32 = 30;
const DEFAULT_REPORT_SECS: u64 = 5;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct CounterConfigFile {
    labels: Option<LabelsConfigFile>,
    thresholds: Option<ThresholdsConfigFile>,
    detector: Option<DetectorConfigFile>,
    source: Option<SourceConfigFile>,
    report: Option<ReportConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct LabelsConfigFile {
    vehicles: Option<Vec<String>>,
    cargo: Option<String>,
    path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ThresholdsConfigFile {
    association_iou: Option<f32>,
    duplicate_iou: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DetectorConfigFile {
    min_confidence: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct SourceConfigFile {
    url: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    target_fps: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ReportConfigFile {
    interval_secs: Option<u64>,
}

/// Static configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct CounterConfig {
    pub labels: LabelSettings,
    pub thresholds: Thresholds,
    pub min_confidence: f32,
    pub source: SourceSettings,
    pub report_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct LabelSettings {
    pub vehicles: BTreeSet<String>,
    pub cargo: String,
    /// Optional `labels.txt` mapping class ids to labels.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Vehicle/cargo IoU above which a vehicle is ODOL.
    pub association_iou: f32,
    /// IoU above which a vehicle re-detects an already counted one.
    pub duplicate_iou: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            association_iou: DEFAULT_ASSOCIATION_IOU,
            duplicate_iou: DEFAULT_DUPLICATE_IOU,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub target_fps: u32,
}

impl Default for CounterConfig {
    fn default() -> Self {
        // The empty file yields only defaults and cannot fail.
        Self::from_file(CounterConfigFile::default())
    }
}

impl CounterConfig {
    /// Loads from `ODOL_CONFIG` (if set), then applies environment overrides.
    pub fn load() -> Result<Self> {
        let path = std::env::var("ODOL_CONFIG").ok().map(PathBuf::from);
        Self::load_from(path.as_deref())
    }

    /// Loads from an explicit file (JSON, or TOML for `.toml` paths), then
    /// applies environment overrides.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => read_config_file(path)?,
            None => CounterConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: CounterConfigFile) -> Self {
        let labels = file.labels.unwrap_or_default();
        let thresholds = file.thresholds.unwrap_or_default();
        let source = file.source.unwrap_or_default();
        Self {
            labels: LabelSettings {
                vehicles: labels
                    .vehicles
                    .map(|v| v.into_iter().collect())
                    .unwrap_or_else(default_vehicle_labels),
                cargo: labels
                    .cargo
                    .unwrap_or_else(|| DEFAULT_CARGO_LABEL.to_string()),
                path: labels.path,
            },
            thresholds: Thresholds {
                association_iou: thresholds
                    .association_iou
                    .unwrap_or(DEFAULT_ASSOCIATION_IOU),
                duplicate_iou: thresholds.duplicate_iou.unwrap_or(DEFAULT_DUPLICATE_IOU),
            },
            min_confidence: file
                .detector
                .and_then(|d| d.min_confidence)
                .unwrap_or(DEFAULT_MIN_CONFIDENCE),
            source: SourceSettings {
                url: source
                    .url
                    .unwrap_or_else(|| DEFAULT_SOURCE_URL.to_string()),
                width: source.width.unwrap_or(DEFAULT_SOURCE_WIDTH),
                height: source.height.unwrap_or(DEFAULT_SOURCE_HEIGHT),
                target_fps: source.target_fps.unwrap_or(DEFAULT_SOURCE_FPS),
            },
            report_interval: Duration::from_secs(
                file.report
                    .and_then(|r| r.interval_secs)
                    .unwrap_or(DEFAULT_REPORT_SECS),
            ),
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(labels) = std::env::var("ODOL_VEHICLE_LABELS") {
            let parsed = split_csv(&labels);
            if !parsed.is_empty() {
                self.labels.vehicles = parsed.into_iter().collect();
            }
        }
        if let Ok(cargo) = std::env::var("ODOL_CARGO_LABEL") {
            if !cargo.trim().is_empty() {
                self.labels.cargo = cargo.trim().to_string();
            }
        }
        if let Ok(path) = std::env::var("ODOL_LABELS_PATH") {
            if !path.trim().is_empty() {
                self.labels.path = Some(PathBuf::from(path));
            }
        }
        if let Some(value) = env_f32("ODOL_ASSOC_IOU")? {
            self.thresholds.association_iou = value;
        }
        if let Some(value) = env_f32("ODOL_DUP_IOU")? {
            self.thresholds.duplicate_iou = value;
        }
        if let Some(value) = env_f32("ODOL_MIN_CONFIDENCE")? {
            self.min_confidence = value;
        }
        if let Ok(url) = std::env::var("ODOL_SOURCE_URL") {
            if !url.trim().is_empty() {
                self.source.url = url;
            }
        }
        if let Ok(secs) = std::env::var("ODOL_REPORT_SECS") {
            if !secs.trim().is_empty() {
                let seconds: u64 = secs.trim().parse().map_err(|_| {
                    anyhow!("ODOL_REPORT_SECS must be an integer number of seconds")
                })?;
                self.report_interval = Duration::from_secs(seconds);
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("association_iou", self.thresholds.association_iou),
            ("duplicate_iou", self.thresholds.duplicate_iou),
            ("min_confidence", self.min_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(anyhow!("{} must be within [0, 1], got {}", name, value));
            }
        }
        if self.labels.vehicles.is_empty() {
            return Err(anyhow!("at least one vehicle label is required"));
        }
        if self.labels.vehicles.iter().any(|l| l.trim().is_empty()) {
            return Err(anyhow!("vehicle labels must not be blank"));
        }
        if self.labels.cargo.trim().is_empty() {
            return Err(anyhow!("cargo label must not be empty"));
        }
        if self.labels.vehicles.contains(&self.labels.cargo) {
            return Err(anyhow!(
                "cargo label '{}' is also listed as a vehicle label",
                self.labels.cargo
            ));
        }
        if self.report_interval.is_zero() {
            return Err(anyhow!("report interval must be greater than zero"));
        }
        if self.source.target_fps == 0 {
            return Err(anyhow!("source target_fps must be >= 1"));
        }
        if self.source.width == 0 || self.source.height == 0 {
            return Err(anyhow!("source frame size must be non-zero"));
        }
        if self.source.width > MAX_FRAME_DIMENSION || self.source.height > MAX_FRAME_DIMENSION {
            return Err(anyhow!(
                "source frame size {}x{} exceeds {} pixels per side",
                self.source.width,
                self.source.height,
                MAX_FRAME_DIMENSION
            ));
        }
        Ok(())
    }

    pub fn classifier(&self) -> FrameClassifier {
        FrameClassifier::new(
            self.labels.vehicles.clone(),
            self.labels.cargo.clone(),
            self.thresholds.association_iou,
        )
    }

    /// Pause between captures for the configured frame rate.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs(1) / self.source.target_fps.max(1)
    }
}

fn default_vehicle_labels() -> BTreeSet<String> {
    DEFAULT_VEHICLE_LABELS.iter().map(|l| l.to_string()).collect()
}

fn read_config_file(path: &Path) -> Result<CounterConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg: CounterConfigFile = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn env_f32(key: &str) -> Result<Option<f32>> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| anyhow!("{} must be a number, got '{}'", key, value)),
        _ => Ok(None),
    }
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.to_string())
        .collect()
}
