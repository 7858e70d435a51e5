use super::{MediaDevice, MediaStream};
use crate::error::MediaError;
use crate::events::{EnrollmentEvent, EventBus};
use crate::image::DataUrl;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Owns one open stream and stops its tracks when dropped
pub struct StreamGuard {
    stream: Option<Box<dyn MediaStream>>,
    device: String,
    event_bus: Arc<EventBus>,
}

impl StreamGuard {
    fn new(stream: Box<dyn MediaStream>, device: String, event_bus: Arc<EventBus>) -> Self {
        Self {
            stream: Some(stream),
            device,
            event_bus,
        }
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub async fn snapshot(&self) -> Result<DataUrl, MediaError> {
        match &self.stream {
            Some(stream) => stream.snapshot().await,
            None => Err(MediaError::NotCapturing),
        }
    }

    /// Stop all tracks now; later calls and the drop are no-ops
    pub fn release(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop_all_tracks();
            debug!("Stopped all tracks on {}", self.device);
            let _ = self.event_bus.publish(EnrollmentEvent::MediaReleased {
                device: self.device.clone(),
                timestamp: Utc::now(),
            });
        }
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.release();
    }
}

/// How the current capture field is being filled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    Idle,
    Camera,
    Upload,
}

/// Holds at most one open stream for a capture field.
///
/// Entering camera mode acquires a stream; leaving it, switching to upload,
/// or dropping the controller releases it.
pub struct CaptureController {
    device: Arc<dyn MediaDevice>,
    event_bus: Arc<EventBus>,
    active: Option<StreamGuard>,
    mode: CaptureMode,
}

impl CaptureController {
    pub fn new(device: Arc<dyn MediaDevice>, event_bus: Arc<EventBus>) -> Self {
        Self {
            device,
            event_bus,
            active: None,
            mode: CaptureMode::Idle,
        }
    }

    pub fn mode(&self) -> CaptureMode {
        self.mode
    }

    pub fn is_capturing(&self) -> bool {
        self.active.is_some()
    }

    /// Open the device, releasing any stream still held first
    pub async fn enter_capture(&mut self) -> Result<(), MediaError> {
        self.release();

        let stream = match self.device.open().await {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Failed to open {}: {}", self.device.name(), e);
                self.mode = CaptureMode::Idle;
                return Err(e);
            }
        };
        let device = self.device.name().to_string();
        info!("Media stream acquired on {}", device);
        let _ = self.event_bus.publish(EnrollmentEvent::MediaAcquired {
            device: device.clone(),
            timestamp: Utc::now(),
        });

        self.active = Some(StreamGuard::new(stream, device, Arc::clone(&self.event_bus)));
        self.mode = CaptureMode::Camera;
        Ok(())
    }

    pub async fn snapshot(&self) -> Result<DataUrl, MediaError> {
        match &self.active {
            Some(guard) => guard.snapshot().await,
            None => Err(MediaError::NotCapturing),
        }
    }

    /// Take a frame and leave capture mode, whatever the snapshot result
    pub async fn capture_and_leave(&mut self) -> Result<DataUrl, MediaError> {
        let result = self.snapshot().await;
        self.leave_capture();
        result
    }

    pub fn switch_to_upload(&mut self) {
        self.release();
        self.mode = CaptureMode::Upload;
    }

    pub fn leave_capture(&mut self) {
        self.release();
        self.mode = CaptureMode::Idle;
    }

    fn release(&mut self) {
        if let Some(mut guard) = self.active.take() {
            guard.release();
        }
    }
}
