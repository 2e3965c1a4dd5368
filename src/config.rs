use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CAMERA_URL: &str = "http://127.0.0.1:8080/video";
const DEFAULT_CAMERA_FPS: u32 = 10;
const DEFAULT_INPUT_SIZE: u32 = 640;
const DEFAULT_CAPTURE_DIR: &str = "captured_images";
const DEFAULT_LOG_PATH: &str = "bottle_detection_log.csv";
const DEFAULT_BATCH_INPUT: &str = "NEWD";
const DEFAULT_BATCH_OUTPUT: &str = "RESD";
const DEFAULT_CYCLE_DELAY_MS: u64 = 10;

#[derive(Debug, Deserialize, Default)]
struct AppConfigFile {
    camera: Option<CameraConfigFile>,
    detector: Option<DetectorConfigFile>,
    capture: Option<CaptureConfigFile>,
    batch: Option<BatchConfigFile>,
    display: Option<DisplayConfigFile>,
    cycle_delay_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    url: Option<String>,
    target_fps: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    backend: Option<String>,
    model_path: Option<PathBuf>,
    labels_path: Option<PathBuf>,
    input_size: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct CaptureConfigFile {
    image_dir: Option<PathBuf>,
    log_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct BatchConfigFile {
    input_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct DisplayConfigFile {
    preview_path: Option<PathBuf>,
    font_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub camera: CameraSettings,
    pub detector: DetectorSettings,
    pub capture: CaptureSettings,
    pub batch: BatchSettings,
    pub display: DisplaySettings,
    pub cycle_delay: Duration,
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    pub url: String,
    pub target_fps: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Stub,
    Tract,
}

impl BackendKind {
    fn parse(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "stub" => Ok(Self::Stub),
            "tract" => Ok(Self::Tract),
            other => Err(anyhow!(
                "unknown detector backend '{}'; expected stub or tract",
                other
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub backend: BackendKind,
    pub model_path: Option<PathBuf>,
    pub labels_path: Option<PathBuf>,
    pub input_size: u32,
}

#[derive(Debug, Clone)]
pub struct CaptureSettings {
    pub image_dir: PathBuf,
    pub log_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct BatchSettings {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct DisplaySettings {
    pub preview_path: Option<PathBuf>,
    pub font_path: Option<PathBuf>,
}

impl AppConfig {
    /// Load from `BOTTLE_COUNTER_CONFIG` (if set), then apply env overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("BOTTLE_COUNTER_CONFIG").ok();
        Self::load_from(config_path.as_deref().map(Path::new))
    }

    /// Load from an explicit file path, then apply env overrides.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: AppConfigFile) -> Result<Self> {
        let camera = CameraSettings {
            url: file
                .camera
                .as_ref()
                .and_then(|camera| camera.url.clone())
                .unwrap_or_else(|| DEFAULT_CAMERA_URL.to_string()),
            target_fps: file
                .camera
                .as_ref()
                .and_then(|camera| camera.target_fps)
                .unwrap_or(DEFAULT_CAMERA_FPS),
        };

        let detector_file = file.detector.unwrap_or_default();
        let backend = match detector_file.backend.as_deref() {
            Some(name) => BackendKind::parse(name)?,
            None if detector_file.model_path.is_some() => BackendKind::Tract,
            None => BackendKind::Stub,
        };
        let detector = DetectorSettings {
            backend,
            model_path: detector_file.model_path,
            labels_path: detector_file.labels_path,
            input_size: detector_file.input_size.unwrap_or(DEFAULT_INPUT_SIZE),
        };

        let capture = CaptureSettings {
            image_dir: file
                .capture
                .as_ref()
                .and_then(|capture| capture.image_dir.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CAPTURE_DIR)),
            log_path: file
                .capture
                .and_then(|capture| capture.log_path)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_PATH)),
        };
        let batch = BatchSettings {
            input_dir: file
                .batch
                .as_ref()
                .and_then(|batch| batch.input_dir.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_BATCH_INPUT)),
            output_dir: file
                .batch
                .and_then(|batch| batch.output_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_BATCH_OUTPUT)),
        };
        let display = file
            .display
            .map(|display| DisplaySettings {
                preview_path: display.preview_path,
                font_path: display.font_path,
            })
            .unwrap_or_default();
        let cycle_delay =
            Duration::from_millis(file.cycle_delay_ms.unwrap_or(DEFAULT_CYCLE_DELAY_MS));

        Ok(Self {
            camera,
            detector,
            capture,
            batch,
            display,
            cycle_delay,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("BOTTLE_COUNTER_CAMERA_URL") {
            if !url.trim().is_empty() {
                self.camera.url = url;
            }
        }
        if let Ok(model) = std::env::var("BOTTLE_COUNTER_MODEL") {
            if !model.trim().is_empty() {
                self.detector.model_path = Some(PathBuf::from(model));
                self.detector.backend = BackendKind::Tract;
            }
        }
        if let Ok(labels) = std::env::var("BOTTLE_COUNTER_LABELS") {
            if !labels.trim().is_empty() {
                self.detector.labels_path = Some(PathBuf::from(labels));
            }
        }
        if let Ok(dir) = std::env::var("BOTTLE_COUNTER_CAPTURE_DIR") {
            if !dir.trim().is_empty() {
                self.capture.image_dir = PathBuf::from(dir);
            }
        }
        if let Ok(path) = std::env::var("BOTTLE_COUNTER_LOG_PATH") {
            if !path.trim().is_empty() {
                self.capture.log_path = PathBuf::from(path);
            }
        }
        if let Ok(delay) = std::env::var("BOTTLE_COUNTER_CYCLE_DELAY_MS") {
            let millis: u64 = delay.parse().map_err(|_| {
                anyhow!("BOTTLE_COUNTER_CYCLE_DELAY_MS must be an integer number of milliseconds")
            })?;
            self.cycle_delay = Duration::from_millis(millis);
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        if self.camera.url.trim().is_empty() {
            return Err(anyhow!("camera url must not be empty"));
        }
        if self.camera.target_fps == 0 {
            return Err(anyhow!("camera target_fps must be greater than zero"));
        }
        if self.detector.input_size == 0 {
            return Err(anyhow!("detector input_size must be greater than zero"));
        }
        if self.detector.backend == BackendKind::Tract && self.detector.model_path.is_none() {
            return Err(anyhow!("detector backend 'tract' requires model_path"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<AppConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}
