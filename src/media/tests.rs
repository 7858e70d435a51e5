use super::*;
use crate::config::MediaConfig;
use crate::events::{EnrollmentEvent, EventBus};
use std::io::Write;
use std::sync::Arc;

fn controller(device: &MockMediaDevice) -> (CaptureController, Arc<EventBus>) {
    let event_bus = Arc::new(EventBus::new(16));
    let controller = CaptureController::new(Arc::new(device.clone()), Arc::clone(&event_bus));
    (controller, event_bus)
}

#[tokio::test]
async fn test_enter_and_leave_capture() {
    let device = MockMediaDevice::new("mock-camera");
    let (mut controller, _bus) = controller(&device);

    controller.enter_capture().await.unwrap();
    assert!(controller.is_capturing());
    assert_eq!(controller.mode(), CaptureMode::Camera);
    assert_eq!(device.live_streams(), 1);

    let frame = controller.snapshot().await.unwrap();
    assert_eq!(frame.mime_type(), Some("image/png"));

    controller.leave_capture();
    assert!(!controller.is_capturing());
    assert_eq!(controller.mode(), CaptureMode::Idle);
    assert_eq!(device.live_streams(), 0);
}

#[tokio::test]
async fn test_reentering_holds_one_stream() {
    let device = MockMediaDevice::new("mock-camera");
    let (mut controller, _bus) = controller(&device);

    controller.enter_capture().await.unwrap();
    controller.enter_capture().await.unwrap();
    controller.enter_capture().await.unwrap();

    assert_eq!(device.times_opened(), 3);
    assert_eq!(device.live_streams(), 1);
}

#[tokio::test]
async fn test_switch_to_upload_releases() {
    let device = MockMediaDevice::new("mock-camera");
    let (mut controller, _bus) = controller(&device);

    controller.enter_capture().await.unwrap();
    controller.switch_to_upload();

    assert_eq!(controller.mode(), CaptureMode::Upload);
    assert_eq!(device.live_streams(), 0);
    assert!(matches!(
        controller.snapshot().await,
        Err(crate::error::MediaError::NotCapturing)
    ));
}

#[tokio::test]
async fn test_drop_releases() {
    let device = MockMediaDevice::new("mock-camera");
    {
        let (mut controller, _bus) = controller(&device);
        controller.enter_capture().await.unwrap();
        assert_eq!(device.live_streams(), 1);
    }
    assert_eq!(device.live_streams(), 0);
}

#[tokio::test]
async fn test_capture_and_leave_releases() {
    let device = MockMediaDevice::new("mock-camera");
    let (mut controller, _bus) = controller(&device);

    controller.enter_capture().await.unwrap();
    let frame = controller.capture_and_leave().await.unwrap();

    assert!(!frame.payload().is_empty());
    assert_eq!(device.live_streams(), 0);
}

#[tokio::test]
async fn test_open_failure_leaves_nothing_held() {
    let device = MockMediaDevice::new("mock-camera");
    let (mut controller, _bus) = controller(&device);

    controller.enter_capture().await.unwrap();
    device.set_fail_open(true);

    assert!(controller.enter_capture().await.is_err());
    assert!(!controller.is_capturing());
    assert_eq!(controller.mode(), CaptureMode::Idle);
    assert_eq!(device.live_streams(), 0);
}

#[tokio::test]
async fn test_media_events_published() {
    let device = MockMediaDevice::new("mock-camera");
    let (mut controller, bus) = controller(&device);
    let mut receiver = bus.subscribe();

    controller.enter_capture().await.unwrap();
    controller.leave_capture();

    match receiver.recv().await.unwrap() {
        EnrollmentEvent::MediaAcquired { device, .. } => assert_eq!(device, "mock-camera"),
        other => panic!("Expected MediaAcquired, got {:?}", other),
    }
    match receiver.recv().await.unwrap() {
        EnrollmentEvent::MediaReleased { device, .. } => assert_eq!(device, "mock-camera"),
        other => panic!("Expected MediaReleased, got {:?}", other),
    }
}

#[tokio::test]
async fn test_still_image_device() {
    let mut file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
    file.write_all(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A]).unwrap();

    let config = MediaConfig {
        device: "still".to_string(),
        resolution: (640, 480),
    };
    let device: Arc<dyn MediaDevice> = Arc::new(StillImageDevice::new(&config, file.path()));
    let mut controller = CaptureController::new(device, Arc::new(EventBus::new(4)));

    controller.enter_capture().await.unwrap();
    let frame = controller.capture_and_leave().await.unwrap();
    assert_eq!(frame.mime_type(), Some("image/png"));
}
