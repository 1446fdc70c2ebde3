//! JSON configuration and report helpers for batch ring detection.

use crate::{
    FrameStats, OverlayMode, RingDetectError, RingDetection, RingDetector, RingDetectorParams,
};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(thiserror::Error, Debug)]
pub enum RingIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

const DEFAULT_REPORT_PATH: &str = "ringtrack_report.json";

/// Configuration for running one detector over a sequence of frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RingDetectConfig {
    /// Frame images, processed in order so tracking carries over.
    #[serde(default)]
    pub frames: Vec<String>,
    #[serde(default)]
    pub params: RingDetectorParams,
    #[serde(default)]
    pub report_path: Option<String>,
    /// Directory for per-frame overlay images. No overlays when unset.
    #[serde(default)]
    pub overlay_dir: Option<String>,
    #[serde(default)]
    pub overlay_mode: OverlayMode,
}

impl RingDetectConfig {
    pub fn new(frames: Vec<String>, params: RingDetectorParams) -> Self {
        Self {
            frames,
            params,
            report_path: None,
            overlay_dir: None,
            overlay_mode: OverlayMode::default(),
        }
    }

    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, RingIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), RingIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Resolve the output report path.
    pub fn report_path(&self) -> PathBuf {
        self.report_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_REPORT_PATH))
    }

    /// Overlay output for frame number `index`, named after the frame file.
    pub fn overlay_path(&self, index: usize, frame_path: &str) -> Option<PathBuf> {
        let dir = self.overlay_dir.as_ref()?;
        let stem = Path::new(frame_path)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "frame".to_string());
        Some(Path::new(dir).join(format!("{index:04}_{stem}_overlay.png")))
    }

    /// Build a detector for frames of the given size.
    pub fn build_detector(&self, width: usize, height: usize) -> Result<RingDetector, RingDetectError> {
        RingDetector::new(width, height, self.params.clone())
    }
}

/// Outcome for one frame of a batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameReport {
    pub frame_path: String,
    #[serde(default)]
    pub detection: Option<RingDetection>,
    #[serde(default)]
    pub stats: Option<FrameStats>,
    /// Consecutive failures after this frame.
    #[serde(default)]
    pub failures: u32,
    #[serde(default)]
    pub overlay_path: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl FrameReport {
    /// Snapshot of the detector right after it processed `frame_path`.
    pub fn from_detector(frame_path: &str, detector: &RingDetector) -> Self {
        Self {
            frame_path: frame_path.to_string(),
            detection: Some(*detector.last_detection()),
            stats: Some(*detector.last_stats()),
            failures: detector.failures(),
            overlay_path: None,
            error: None,
        }
    }

    /// A frame that could not be processed.
    pub fn failed(frame_path: &str, error: impl ToString) -> Self {
        Self {
            frame_path: frame_path.to_string(),
            detection: None,
            stats: None,
            failures: 0,
            overlay_path: None,
            error: Some(error.to_string()),
        }
    }

    pub fn is_detected(&self) -> bool {
        self.detection.is_some_and(|d| d.valid)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RingDetectReport {
    #[serde(default)]
    pub config_path: Option<String>,
    pub params: RingDetectorParams,
    pub frames: Vec<FrameReport>,
    /// Frames with a valid detection.
    pub detected: usize,
}

impl RingDetectReport {
    pub fn new(cfg: &RingDetectConfig, config_path: Option<&Path>) -> Self {
        Self {
            config_path: config_path.map(|p| p.to_string_lossy().into_owned()),
            params: cfg.params.clone(),
            frames: Vec::with_capacity(cfg.frames.len()),
            detected: 0,
        }
    }

    pub fn push(&mut self, frame: FrameReport) {
        if frame.is_detected() {
            self.detected += 1;
        }
        self.frames.push(frame);
    }

    /// Load a report from JSON on disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, RingIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this report to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), RingIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
