use super::{MediaDevice, MediaStream};
use crate::config::MediaConfig;
use crate::error::MediaError;
use crate::image::{load_image_file, DataUrl};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{debug, info};

/// Device that serves a still image from disk as its only frame.
///
/// Used by the command-line front end, where there is no live camera.
pub struct StillImageDevice {
    name: String,
    path: PathBuf,
}

impl StillImageDevice {
    pub fn new(config: &MediaConfig, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        info!(
            "Still image device '{}' serving {} (requested {}x{})",
            config.device,
            path.display(),
            config.resolution.0,
            config.resolution.1
        );
        Self {
            name: config.device.clone(),
            path,
        }
    }
}

#[async_trait]
impl MediaDevice for StillImageDevice {
    fn name(&self) -> &str {
        &self.name
    }

    async fn open(&self) -> Result<Box<dyn MediaStream>, MediaError> {
        let frame = load_image_file(&self.path)
            .await
            .map_err(|e| MediaError::DeviceOpen {
                details: e.to_string(),
            })?;
        debug!("Opened still stream with {}", frame);
        Ok(Box::new(StillStream { frame: Some(frame) }))
    }
}

struct StillStream {
    frame: Option<DataUrl>,
}

#[async_trait]
impl MediaStream for StillStream {
    async fn snapshot(&self) -> Result<DataUrl, MediaError> {
        self.frame.clone().ok_or(MediaError::NotCapturing)
    }

    fn stop_all_tracks(&mut self) {
        self.frame = None;
    }

    fn is_live(&self) -> bool {
        self.frame.is_some()
    }
}
