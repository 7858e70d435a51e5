pub mod activity;
pub mod api;
pub mod config;
pub mod enrollment;
pub mod error;
pub mod events;
pub mod image;
pub mod media;
pub mod route;
pub mod session;
pub mod steps;
pub mod views;

pub use activity::{Activity, ActivityConfig};
pub use api::{
    FingerprintDevice, FingerprintScanner, ImagingBackend, ImagingClient, LookupOutcome,
    LookupStatus, SubmitOutcome,
};
pub use config::BioCaptureConfig;
pub use enrollment::{EnrollmentController, SubmitError};
pub use error::{
    ApiError, BioCaptureError, EventBusError, MediaError, Result, RouteError, ValidationError,
};
pub use events::{EnrollmentEvent, EventBus, EventFilter, EventReceiver};
pub use image::DataUrl;
pub use media::{CaptureController, CaptureMode, MediaDevice, MediaStream, MockMediaDevice};
pub use route::{Route, RouteAction};
pub use session::{SessionAction, SessionState, SessionStore};
pub use steps::{compute_visible_steps, Step};
pub use views::{render_step, StepView};
