mod controller;
mod mock;
mod still;
#[cfg(test)]
mod tests;

pub use controller::{CaptureController, CaptureMode, StreamGuard};
pub use mock::MockMediaDevice;
pub use still::StillImageDevice;

use crate::error::MediaError;
use crate::image::DataUrl;
use async_trait::async_trait;

/// A camera-like source that can be opened into a live stream
#[async_trait]
pub trait MediaDevice: Send + Sync {
    /// Label used in logs and media events
    fn name(&self) -> &str;

    async fn open(&self) -> Result<Box<dyn MediaStream>, MediaError>;
}

/// An open stream holding the device until every track is stopped
#[async_trait]
pub trait MediaStream: Send + Sync {
    /// Grab the current frame
    async fn snapshot(&self) -> Result<DataUrl, MediaError>;

    /// Stop every track; must be idempotent
    fn stop_all_tracks(&mut self);

    fn is_live(&self) -> bool;
}
