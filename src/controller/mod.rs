//! The polling loop: dark and active means take a picture, then wait for
//! the next slot either way.

use std::path::PathBuf;
use std::time::Duration;

use chrono::Local;
use serde::Deserialize;
use thiserror::Error;

use crate::activity::{ActivityOracle, IndexSource};
use crate::camera::{
    Annotation, AnnotationStyle, Camera, CameraSession, CameraSettings, CaptureError,
    CaptureRequest, FileNaming,
};
use crate::config::Config;
use crate::journal::{Event, Journal};
use crate::schedule::{wait_for_next_slot, Timer};
use crate::sky::{DarknessOracle, SolarError};


/// What a failed capture does to the loop.
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OnFail {
    /// Stop the loop; the process exits and its supervisor restarts it.
    #[default]
    Abort,
    /// Log and carry on with the next slot.
    Continue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Capturing,
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("solar computation failed: {0}")]
    Solar(#[from] SolarError),
    #[error("capture failed: {0}")]
    Capture(#[from] CaptureError),
}

/// How and when to shoot, fixed for the life of the loop.
#[derive(Debug, Clone)]
pub struct CapturePlan {
    pub settings: CameraSettings,
    pub naming: FileNaming,
    pub annotation: AnnotationStyle,
    pub on_fail: OnFail,
    pub slot_interval: Duration,
}

impl CapturePlan {
    pub fn from_config(config: &Config) -> Self {
        Self {
            settings: config.camera.settings.clone(),
            naming: config.camera.output.clone(),
            annotation: config.camera.annotation.clone(),
            on_fail: config.camera.on_fail,
            slot_interval: config.schedule.interval,
        }
    }
}

pub struct Controller<T, S, C, J> {
    timer: T,
    darkness: DarknessOracle,
    activity: ActivityOracle<S>,
    camera: C,
    journal: J,
    plan: CapturePlan,
    state: ControllerState,
}

impl<T, S, C, J> Controller<T, S, C, J>
where
    T: Timer,
    S: IndexSource,
    C: Camera,
    J: Journal,
{
    pub fn new(
        timer: T,
        darkness: DarknessOracle,
        activity: ActivityOracle<S>,
        camera: C,
        journal: J,
        plan: CapturePlan,
    ) -> Self {
        Self {
            timer,
            darkness,
            activity,
            camera,
            journal,
            plan,
            state: ControllerState::Idle,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Polls forever. Returns only on a fatal error.
    pub async fn run(&mut self) -> Result<(), ControllerError> {
        self.journal.record(Event::Started {
            at: self.timer.now(),
        });
        loop {
            self.step().await?;
        }
    }

    /// One iteration: poll, then wait for the next slot.
    pub async fn step(&mut self) -> Result<Option<PathBuf>, ControllerError> {
        let captured = self.poll().await?;
        wait_for_next_slot(&self.timer, self.plan.slot_interval, &self.journal).await;
        Ok(captured)
    }

    /// Checks both conditions and captures when they hold. The activity
    /// feed is only fetched once it is known to be dark.
    pub async fn poll(&mut self) -> Result<Option<PathBuf>, ControllerError> {
        let now = self.timer.now();
        let go = self.darkness.is_dark(now, &self.journal)?
            && self.activity.index_is_high(&self.journal).await;
        if !go {
            return Ok(None);
        }

        self.state = ControllerState::Capturing;
        let result = self.capture().await;
        self.state = ControllerState::Idle;

        match result {
            Ok(path) => Ok(Some(path)),
            Err(e) => {
                self.journal.record(Event::CaptureFailed {
                    cause: e.to_string(),
                });
                match self.plan.on_fail {
                    OnFail::Abort => Err(e.into()),
                    OnFail::Continue => Ok(None),
                }
            }
        }
    }

    /// Takes one photo regardless of conditions. The file name and the
    /// annotation carry the time the warm-up ended.
    pub async fn capture(&mut self) -> Result<PathBuf, CaptureError> {
        let mut session = CameraSession::open(&mut self.camera)?;
        session.configure(&self.plan.settings)?;
        session.warm_up(self.plan.settings.warm_up).await?;

        let stamp = self.timer.now().with_timezone(&Local);
        let request = CaptureRequest {
            settings: self.plan.settings.clone(),
            annotation: Annotation::stamped(&stamp, &self.plan.annotation),
            path: self.plan.naming.path_for(&stamp),
        };
        session.capture(&request).await?;

        self.journal.record(Event::Captured {
            path: request.path.clone(),
        });
        Ok(request.path)
    }

    #[cfg(test)]
    fn parts(&self) -> (&T, &S, &C, &J) {
        (
            &self.timer,
            self.activity.source(),
            &self.camera,
            &self.journal,
        )
    }
}
