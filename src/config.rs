use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BioCaptureConfig {
    pub backend: BackendConfig,
    pub fingerprint: FingerprintDeviceConfig,
    pub media: MediaConfig,
    pub operator: OperatorConfig,
    pub system: SystemConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BackendConfig {
    /// Base URL of the imaging backend (paths are appended to it)
    #[serde(default = "default_backend_url")]
    pub base_url: String,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Optional request timeout; the transport default applies when unset
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FingerprintDeviceConfig {
    /// Base URL of the local scanner service
    #[serde(default = "default_fingerprint_url")]
    pub base_url: String,

    /// Upper bound for a single capture, the user has to place a finger
    #[serde(default = "default_capture_timeout")]
    pub capture_timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MediaConfig {
    /// Camera device identifier
    #[serde(default = "default_media_device")]
    pub device: String,

    /// Requested capture resolution (width, height)
    #[serde(default = "default_media_resolution")]
    pub resolution: (u32, u32),
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct OperatorConfig {
    /// User name recorded on approvals and rejections
    #[serde(default = "default_operator_name")]
    pub name: String,

    /// Workstation host name recorded on approvals
    #[serde(default = "default_hostname")]
    pub hostname: String,

    /// Workstation address recorded on approvals
    #[serde(default = "default_terminal_ip")]
    pub terminal_ip: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SystemConfig {
    /// Event bus capacity
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,
}

impl BioCaptureConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("biocapture.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("backend.base_url", default_backend_url())?
            .set_default("backend.user_agent", default_user_agent())?
            .set_default("fingerprint.base_url", default_fingerprint_url())?
            .set_default(
                "fingerprint.capture_timeout_seconds",
                default_capture_timeout(),
            )?
            .set_default("media.device", default_media_device())?
            .set_default(
                "media.resolution",
                vec![default_media_resolution().0, default_media_resolution().1],
            )?
            .set_default("operator.name", default_operator_name())?
            .set_default("operator.hostname", default_hostname())?
            .set_default("operator.terminal_ip", default_terminal_ip())?
            .set_default(
                "system.event_bus_capacity",
                default_event_bus_capacity() as i64,
            )?
            .add_source(File::with_name(&path_str).required(false))
            // BIOCAPTURE__BACKEND__BASE_URL style overrides
            .add_source(Environment::with_prefix("BIOCAPTURE").separator("__"))
            .build()?;

        let config: BioCaptureConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, url) in [
            ("backend.base_url", &self.backend.base_url),
            ("fingerprint.base_url", &self.fingerprint.base_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Message(format!(
                    "{} must be an http(s) URL, got '{}'",
                    name, url
                )));
            }
        }

        if self.backend.timeout_seconds == Some(0) {
            return Err(ConfigError::Message(
                "Backend timeout must be greater than 0 when set".to_string(),
            ));
        }

        if self.fingerprint.capture_timeout_seconds == 0 {
            return Err(ConfigError::Message(
                "Fingerprint capture timeout must be greater than 0".to_string(),
            ));
        }

        if self.media.resolution.0 == 0 || self.media.resolution.1 == 0 {
            return Err(ConfigError::Message(
                "Media resolution must be greater than 0".to_string(),
            ));
        }

        if self.system.event_bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Serialize as TOML, used by `--print-config`
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl Default for BioCaptureConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig {
                base_url: default_backend_url(),
                user_agent: default_user_agent(),
                timeout_seconds: None,
            },
            fingerprint: FingerprintDeviceConfig {
                base_url: default_fingerprint_url(),
                capture_timeout_seconds: default_capture_timeout(),
            },
            media: MediaConfig {
                device: default_media_device(),
                resolution: default_media_resolution(),
            },
            operator: OperatorConfig {
                name: default_operator_name(),
                hostname: default_hostname(),
                terminal_ip: default_terminal_ip(),
            },
            system: SystemConfig {
                event_bus_capacity: default_event_bus_capacity(),
            },
        }
    }
}

// Default value functions
fn default_backend_url() -> String {
    "http://localhost:8000".to_string()
}
fn default_user_agent() -> String {
    format!("biocapture/{}", env!("CARGO_PKG_VERSION"))
}

fn default_fingerprint_url() -> String {
    "http://127.0.0.1:15896".to_string()
}
fn default_capture_timeout() -> u64 {
    30
}

fn default_media_device() -> String {
    "default".to_string()
}
fn default_media_resolution() -> (u32, u32) {
    (640, 480)
}

fn default_operator_name() -> String {
    "operator".to_string()
}
fn default_hostname() -> String {
    "localhost".to_string()
}
fn default_terminal_ip() -> String {
    "127.0.0.1".to_string()
}

fn default_event_bus_capacity() -> usize {
    64
}
