mod error;
mod lock;
mod rpicam;
mod types;

use std::time::Duration;

pub use error::CaptureError;
pub use rpicam::{RpicamStill, DEFAULT_LOCK_PATH, DEFAULT_PROGRAM};
pub use types::{
    Annotation, AnnotationStyle, CameraSettings, CaptureRequest, ExposureMode, FileNaming,
};

/// The camera device as seen by the controller.
pub trait Camera {
    fn acquire(&mut self) -> Result<(), CaptureError>;
    fn configure(&mut self, settings: &CameraSettings) -> Result<(), CaptureError>;
    /// Lets auto white balance settle. Returns once the period has passed,
    /// so the next moment is the moment of the shot.
    async fn warm_up(&mut self, period: Duration) -> Result<(), CaptureError>;
    async fn capture(&mut self, request: &CaptureRequest) -> Result<(), CaptureError>;
    fn release(&mut self);
}

/// Scoped hold on a [`Camera`]. The device is released when the session is
/// dropped, whichever way the capture ended.
pub struct CameraSession<'a, C: Camera> {
    camera: &'a mut C,
}

impl<'a, C: Camera> CameraSession<'a, C> {
    pub fn open(camera: &'a mut C) -> Result<Self, CaptureError> {
        camera.acquire()?;
        Ok(Self { camera })
    }

    pub fn configure(&mut self, settings: &CameraSettings) -> Result<(), CaptureError> {
        self.camera.configure(settings)
    }

    pub async fn warm_up(&mut self, period: Duration) -> Result<(), CaptureError> {
        self.camera.warm_up(period).await
    }

    pub async fn capture(&mut self, request: &CaptureRequest) -> Result<(), CaptureError> {
        self.camera.capture(request).await
    }
}

impl<C: Camera> Drop for CameraSession<'_, C> {
    fn drop(&mut self) {
        self.camera.release();
    }
}
