use super::{MediaDevice, MediaStream};
use crate::error::MediaError;
use crate::image::DataUrl;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

const MOCK_FRAME: &str = "data:image/png;base64,iVBORw0KGgo=";

/// Mock camera for testing without real hardware
#[derive(Clone)]
pub struct MockMediaDevice {
    name: String,
    live_streams: Arc<AtomicUsize>,
    opened: Arc<AtomicUsize>,
    fail_open: Arc<AtomicBool>,
}

impl MockMediaDevice {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            live_streams: Arc::new(AtomicUsize::new(0)),
            opened: Arc::new(AtomicUsize::new(0)),
            fail_open: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Streams opened and not yet stopped
    pub fn live_streams(&self) -> usize {
        self.live_streams.load(Ordering::SeqCst)
    }

    pub fn times_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Make subsequent opens fail, as a denied permission would
    pub fn set_fail_open(&self, fail: bool) {
        self.fail_open.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl MediaDevice for MockMediaDevice {
    fn name(&self) -> &str {
        &self.name
    }

    async fn open(&self) -> Result<Box<dyn MediaStream>, MediaError> {
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(MediaError::DeviceOpen {
                details: "permission denied".to_string(),
            });
        }

        self.opened.fetch_add(1, Ordering::SeqCst);
        self.live_streams.fetch_add(1, Ordering::SeqCst);
        debug!("Mock stream opened on {}", self.name);
        Ok(Box::new(MockStream {
            live_streams: Arc::clone(&self.live_streams),
            stopped: false,
        }))
    }
}

struct MockStream {
    live_streams: Arc<AtomicUsize>,
    stopped: bool,
}

#[async_trait]
impl MediaStream for MockStream {
    async fn snapshot(&self) -> Result<DataUrl, MediaError> {
        if self.stopped {
            return Err(MediaError::NotCapturing);
        }
        DataUrl::parse(MOCK_FRAME).map_err(|e| MediaError::Snapshot {
            details: e.to_string(),
        })
    }

    fn stop_all_tracks(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.live_streams.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn is_live(&self) -> bool {
        !self.stopped
    }
}
