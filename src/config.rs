use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AgentConfig {
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub system: SystemConfig,
}

/// Which platform probe enumerates cameras
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    /// Pick from the running platform
    Auto,
    Linux,
    Windows,
    None,
}

/// What the scheduler does when a tick fires while a cycle is still in flight
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OverlapPolicy {
    /// Drop the tick; at most one cycle runs at a time
    Skip,
    /// Start another cycle regardless; commits may interleave
    Allow,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DiscoveryConfig {
    /// Probe selection
    #[serde(default = "default_probe")]
    pub probe: ProbeKind,

    /// Stream port of camera 0; camera N listens on base_port + N
    #[serde(default = "default_base_port")]
    pub base_port: u16,

    /// Path to the v4l2-ctl executable (Linux probe)
    #[serde(default = "default_v4l2_ctl_path")]
    pub v4l2_ctl_path: String,

    /// Path to the ffmpeg executable (Windows probe)
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,

    /// Device groups whose header contains any of these are not cameras
    #[serde(default = "default_ignore_patterns")]
    pub ignore_patterns: Vec<String>,

    /// Deadline for the enumeration utility
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CaptureConfig {
    /// Path to the ffmpeg executable used for frame extraction
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,

    /// Seconds to wait for a single frame before giving up
    #[serde(default = "default_capture_timeout_secs")]
    pub timeout_secs: u64,

    /// JPEG quality scale passed to ffmpeg (2 = best, 31 = worst)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct InferenceConfig {
    /// Base URL of the inference service
    #[serde(default = "default_inference_url")]
    pub base_url: String,

    #[serde(default = "default_predict_path")]
    pub predict_path: String,

    #[serde(default = "default_models_path")]
    pub models_path: String,

    #[serde(default = "default_health_path")]
    pub health_path: String,

    /// Explicit rotation; when empty the service catalog is queried
    #[serde(default)]
    pub models: Vec<String>,

    /// Rotation used when the catalog cannot be fetched
    #[serde(default = "default_fallback_models")]
    pub fallback_models: Vec<String>,

    /// Optional confidence threshold forwarded with every prediction
    #[serde(default)]
    pub threshold: Option<f32>,

    /// HTTP request timeout
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Catalog refresh period in seconds (0 disables refreshing)
    #[serde(default)]
    pub catalog_refresh_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SchedulerConfig {
    /// Milliseconds between capture cycles
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    #[serde(default = "default_overlap_policy")]
    pub overlap_policy: OverlapPolicy,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HistoryConfig {
    #[serde(default = "default_max_predictions")]
    pub max_predictions: usize,

    #[serde(default = "default_max_errors")]
    pub max_errors: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SystemConfig {
    /// Event bus capacity
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,

    /// Seconds each component gets to stop during shutdown
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

impl AgentConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("edgewatch.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("discovery.probe", "auto")?
            .set_default("discovery.base_port", default_base_port() as i64)?
            .set_default("discovery.v4l2_ctl_path", default_v4l2_ctl_path())?
            .set_default("discovery.ffmpeg_path", default_ffmpeg_path())?
            .set_default("discovery.ignore_patterns", default_ignore_patterns())?
            .set_default(
                "discovery.probe_timeout_secs",
                default_probe_timeout_secs() as i64,
            )?
            .set_default("capture.ffmpeg_path", default_ffmpeg_path())?
            .set_default("capture.timeout_secs", default_capture_timeout_secs() as i64)?
            .set_default("capture.jpeg_quality", default_jpeg_quality() as i64)?
            .set_default("inference.base_url", default_inference_url())?
            .set_default("inference.predict_path", default_predict_path())?
            .set_default("inference.models_path", default_models_path())?
            .set_default("inference.health_path", default_health_path())?
            .set_default("inference.fallback_models", default_fallback_models())?
            .set_default(
                "inference.request_timeout_secs",
                default_request_timeout_secs() as i64,
            )?
            .set_default("inference.catalog_refresh_secs", 0i64)?
            .set_default("scheduler.interval_ms", default_interval_ms() as i64)?
            .set_default("scheduler.overlap_policy", "skip")?
            .set_default("history.max_predictions", default_max_predictions() as i64)?
            .set_default("history.max_errors", default_max_errors() as i64)?
            .set_default(
                "system.event_bus_capacity",
                default_event_bus_capacity() as i64,
            )?
            .set_default(
                "system.shutdown_timeout_secs",
                default_shutdown_timeout_secs() as i64,
            )?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // EDGEWATCH_SCHEDULER__INTERVAL_MS=500 style overrides
            .add_source(
                Environment::with_prefix("EDGEWATCH")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: AgentConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Parse configuration from a TOML document, filling omitted values with defaults
    pub fn from_toml_str(contents: &str) -> crate::error::Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Render the configuration as a TOML document
    pub fn to_toml_string(&self) -> crate::error::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scheduler.interval_ms == 0 {
            return Err(ConfigError::Message(
                "Scheduler interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.capture.timeout_secs == 0 {
            return Err(ConfigError::Message(
                "Capture timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.discovery.probe_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "Discovery probe_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.history.max_predictions == 0 || self.history.max_errors == 0 {
            return Err(ConfigError::Message(
                "History capacities must be greater than 0".to_string(),
            ));
        }

        if self.inference.request_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "Inference request_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.inference.base_url.trim().is_empty() {
            return Err(ConfigError::Message(
                "Inference base_url must not be empty".to_string(),
            ));
        }

        if let Some(threshold) = self.inference.threshold {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(ConfigError::Message(
                    "Inference threshold must be between 0.0 and 1.0".to_string(),
                ));
            }
        }

        if self.system.event_bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        if self.discovery.base_port == u16::MAX {
            return Err(ConfigError::Message(
                "Discovery base_port leaves no room for camera ports".to_string(),
            ));
        }

        Ok(())
    }
}

impl CaptureConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl InferenceConfig {
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl SchedulerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            discovery: DiscoveryConfig::default(),
            capture: CaptureConfig::default(),
            inference: InferenceConfig::default(),
            scheduler: SchedulerConfig::default(),
            history: HistoryConfig::default(),
            system: SystemConfig::default(),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            probe: default_probe(),
            base_port: default_base_port(),
            v4l2_ctl_path: default_v4l2_ctl_path(),
            ffmpeg_path: default_ffmpeg_path(),
            ignore_patterns: default_ignore_patterns(),
            probe_timeout_secs: default_probe_timeout_secs(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            timeout_secs: default_capture_timeout_secs(),
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: default_inference_url(),
            predict_path: default_predict_path(),
            models_path: default_models_path(),
            health_path: default_health_path(),
            models: Vec::new(),
            fallback_models: default_fallback_models(),
            threshold: None,
            request_timeout_secs: default_request_timeout_secs(),
            catalog_refresh_secs: 0,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            overlap_policy: default_overlap_policy(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_predictions: default_max_predictions(),
            max_errors: default_max_errors(),
        }
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            event_bus_capacity: default_event_bus_capacity(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

// Default value functions
fn default_probe() -> ProbeKind {
    ProbeKind::Auto
}
fn default_base_port() -> u16 {
    8090
}
fn default_v4l2_ctl_path() -> String {
    "v4l2-ctl".to_string()
}
fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}
fn default_ignore_patterns() -> Vec<String> {
    ["bcm2835-codec", "bcm2835-isp", "rpi-hevc-dec", "rpivid", "pispbe"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_probe_timeout_secs() -> u64 {
    5
}

fn default_capture_timeout_secs() -> u64 {
    10
}
fn default_jpeg_quality() -> u32 {
    3
}

fn default_inference_url() -> String {
    "http://localhost:8081".to_string()
}
fn default_predict_path() -> String {
    "/predict".to_string()
}
fn default_models_path() -> String {
    "/models".to_string()
}
fn default_health_path() -> String {
    "/health".to_string()
}
fn default_fallback_models() -> Vec<String> {
    vec![
        "yolov8n".to_string(),
        "yolov8s".to_string(),
        "yolov8m".to_string(),
    ]
}
fn default_request_timeout_secs() -> u64 {
    15
}

fn default_interval_ms() -> u64 {
    2000
}
fn default_overlap_policy() -> OverlapPolicy {
    OverlapPolicy::Skip
}

fn default_max_predictions() -> usize {
    100
}
fn default_max_errors() -> usize {
    50
}

fn default_event_bus_capacity() -> usize {
    100
}
fn default_shutdown_timeout_secs() -> u64 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AgentConfig::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.discovery.base_port, 8090);
        assert_eq!(config.capture.timeout(), Duration::from_secs(10));
        assert_eq!(config.scheduler.interval(), Duration::from_secs(2));
        assert_eq!(config.history.max_predictions, 100);
        assert_eq!(config.history.max_errors, 50);
        assert_eq!(config.scheduler.overlap_policy, OverlapPolicy::Skip);
    }

    #[test]
    fn test_config_validation() {
        let mut config = AgentConfig::default();
        config.scheduler.interval_ms = 0;
        assert!(config.validate().is_err());

        config.scheduler.interval_ms = 500;
        assert!(config.validate().is_ok());

        config.inference.threshold = Some(1.5);
        assert!(config.validate().is_err());

        config.inference.threshold = Some(0.4);
        config.history.max_errors = 0;
        assert!(config.validate().is_err());

        config.history.max_errors = 50;
        config.inference.request_timeout_secs = 0;
        assert!(config.validate().is_err());

        config.inference.request_timeout_secs = 15;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = AgentConfig::from_toml_str(
            r#"
            [inference]
            base_url = "http://10.0.0.5:8081/"
            models = ["helmet", "fire"]

            [scheduler]
            overlap_policy = "allow"
            "#,
        )
        .unwrap();

        assert_eq!(config.inference.models, vec!["helmet", "fire"]);
        assert_eq!(
            config.inference.endpoint(&config.inference.predict_path),
            "http://10.0.0.5:8081/predict"
        );
        assert_eq!(config.scheduler.overlap_policy, OverlapPolicy::Allow);
        assert_eq!(config.scheduler.interval_ms, 2000);
        assert_eq!(config.discovery.probe, ProbeKind::Auto);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[discovery]\nbase_port = 9100\nprobe = \"none\"\n\n[capture]\ntimeout_secs = 4"
        )
        .unwrap();

        let config = AgentConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.discovery.base_port, 9100);
        assert_eq!(config.discovery.probe, ProbeKind::None);
        assert_eq!(config.capture.timeout_secs, 4);
        assert_eq!(config.history.max_predictions, 100);
    }

    #[test]
    fn test_default_config_round_trips_through_toml() {
        let rendered = AgentConfig::default().to_toml_string().unwrap();
        let parsed = AgentConfig::from_toml_str(&rendered).unwrap();
        assert_eq!(parsed.inference.fallback_models, default_fallback_models());
    }
}
