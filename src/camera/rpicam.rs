use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::json;
use tokio::process::Command;

use super::lock::DeviceLock;
use crate::camera::{
    Annotation, Camera, CameraSettings, CaptureError, CaptureRequest, ExposureMode,
};
use crate::journal::{Event, Journal};

pub const DEFAULT_PROGRAM: &str = "rpicam-still";
pub const DEFAULT_LOCK_PATH: &str = "/tmp/aurora-cam.lock";

/// Preview time given to the process itself. The warm-up has already been
/// waited out by then, so the shot is taken as soon as a frame is ready.
const SHOT_TIMEOUT_MS: &str = "1";

/// OpenCV's Hershey font is about 22 pixels tall at scale 1.
const PIXELS_PER_FONT_SCALE: f64 = 22.0;

/// Raspberry Pi camera driven through `rpicam-still`, one process per shot.
///
/// The annotation is drawn by the `annotate_cv` post-processing stage
/// (rpicam-apps built with OpenCV) and also stored as the EXIF image
/// description.
#[derive(Debug)]
pub struct RpicamStill<J> {
    program: PathBuf,
    lock_path: PathBuf,
    post_process_path: PathBuf,
    lock: Option<DeviceLock>,
    settings: Option<CameraSettings>,
    journal: J,
}

impl<J: Journal> RpicamStill<J> {
    pub fn new(program: PathBuf, lock_path: PathBuf, journal: J) -> Self {
        Self {
            program,
            post_process_path: lock_path.with_extension("annotate.json"),
            lock_path,
            lock: None,
            settings: None,
            journal,
        }
    }

    fn program_name(&self) -> String {
        self.program.display().to_string()
    }

    async fn write_post_process(&self, annotation: &Annotation) -> Result<(), CaptureError> {
        tokio::fs::write(&self.post_process_path, annotate_stage(annotation).to_string())
            .await
            .map_err(|source| CaptureError::Output {
                path: self.post_process_path.clone(),
                source,
            })
    }
}

impl<J: Journal> Camera for RpicamStill<J> {
    fn acquire(&mut self) -> Result<(), CaptureError> {
        self.lock = Some(DeviceLock::acquire(&self.lock_path, &self.journal)?);
        Ok(())
    }

    fn configure(&mut self, settings: &CameraSettings) -> Result<(), CaptureError> {
        if self.lock.is_none() {
            return Err(CaptureError::NotAcquired);
        }
        self.settings = Some(settings.clone());
        Ok(())
    }

    async fn warm_up(&mut self, period: Duration) -> Result<(), CaptureError> {
        if self.lock.is_none() {
            return Err(CaptureError::NotAcquired);
        }
        tokio::time::sleep(period).await;
        Ok(())
    }

    async fn capture(&mut self, request: &CaptureRequest) -> Result<(), CaptureError> {
        if self.lock.is_none() {
            return Err(CaptureError::NotAcquired);
        }
        let settings = self.settings.as_ref().ok_or(CaptureError::NotConfigured)?;
        ensure_parent(&request.path).await?;

        let annotated = !request.annotation.text.is_empty();
        if annotated {
            self.write_post_process(&request.annotation).await?;
        }
        let post_process = annotated.then_some(self.post_process_path.as_path());
        let args = still_args(settings, request, post_process);
        self.journal.record(Event::CameraCommand {
            line: format!("{} {}", self.program_name(), args.join(" ")),
        });

        let output = Command::new(&self.program)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| CaptureError::Spawn {
                program: self.program_name(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CaptureError::Backend {
                program: self.program_name(),
                status: output.status.to_string(),
                stderr: last_line(&stderr).to_string(),
            });
        }
        Ok(())
    }

    fn release(&mut self) {
        self.settings = None;
        if let Some(lock) = self.lock.take() {
            if let Err(e) = lock.release() {
                self.journal.record(Event::LockNotRemoved {
                    path: self.lock_path.clone(),
                    cause: e.to_string(),
                });
            }
        }
    }
}

async fn ensure_parent(path: &Path) -> Result<(), CaptureError> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| CaptureError::Output {
                path: dir.to_path_buf(),
                source,
            }),
        _ => Ok(()),
    }
}

fn last_line(text: &str) -> &str {
    text.lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("")
        .trim()
}

/// `annotate_cv` stage drawing the text in the top left corner. The stage
/// expands `%` directives itself, so literal percent signs are doubled.
fn annotate_stage(annotation: &Annotation) -> serde_json::Value {
    json!({
        "annotate_cv": {
            "text": annotation.text.replace('%', "%%"),
            "fg": annotation.colour.luma(),
            "bg": 0,
            "scale": f64::from(annotation.size) / PIXELS_PER_FONT_SCALE,
            "thickness": (annotation.size / 16).max(1),
            "alpha": 0.0
        }
    })
}

/// Command line for one still. ISO maps onto analogue gain at 100 per unit.
fn still_args(
    settings: &CameraSettings,
    request: &CaptureRequest,
    post_process: Option<&Path>,
) -> Vec<String> {
    let mut args = vec![
        "--nopreview".to_string(),
        "--width".to_string(),
        settings.resolution.width.to_string(),
        "--height".to_string(),
        settings.resolution.height.to_string(),
        "--framerate".to_string(),
        format!("{:.6}", settings.framerate.as_f64()),
        "--shutter".to_string(),
        settings.shutter_us.to_string(),
        "--gain".to_string(),
        format!("{}", f64::from(settings.iso) / 100.0),
        "--awb".to_string(),
        "auto".to_string(),
        "--timeout".to_string(),
        SHOT_TIMEOUT_MS.to_string(),
    ];
    if settings.exposure_mode != ExposureMode::Off {
        args.push("--exposure".to_string());
        args.push(settings.exposure_mode.to_string());
    }
    if let Some(path) = post_process {
        args.push("--post-process-file".to_string());
        args.push(path.display().to_string());
    }
    if !request.annotation.text.is_empty() {
        args.push("--exif".to_string());
        args.push(format!("IFD0.ImageDescription={}", request.annotation.text));
    }
    args.push("--output".to_string());
    args.push(request.path.display().to_string());
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::types::TextColour;
    use crate::camera::{AnnotationStyle, CameraSession};
    use crate::journal::testing::MemoryJournal;
    use chrono::{TimeZone, Utc};

    fn request(path: PathBuf) -> CaptureRequest {
        let stamp = Utc.with_ymd_and_hms(2016, 1, 11, 23, 45, 0).unwrap();
        CaptureRequest {
            settings: CameraSettings::default(),
            annotation: Annotation::stamped(&stamp, &AnnotationStyle::default()),
            path,
        }
    }

    fn camera(program: impl Into<PathBuf>, dir: &Path) -> RpicamStill<MemoryJournal> {
        RpicamStill::new(program.into(), dir.join("cam.lock"), MemoryJournal::default())
    }

    #[test]
    fn default_settings_command_line() {
        let args = still_args(
            &CameraSettings::default(),
            &request(PathBuf::from("ESKAuroraCam.jpg")),
            Some(Path::new("/tmp/aurora-cam.annotate.json")),
        );
        assert_eq!(
            args,
            [
                "--nopreview",
                "--width",
                "1280",
                "--height",
                "720",
                "--framerate",
                "0.166667",
                "--shutter",
                "6000000",
                "--gain",
                "8",
                "--awb",
                "auto",
                "--timeout",
                "1",
                "--post-process-file",
                "/tmp/aurora-cam.annotate.json",
                "--exif",
                "IFD0.ImageDescription=2016-01-11 23:45:00",
                "--output",
                "ESKAuroraCam.jpg",
            ]
        );
    }

    #[test]
    fn automatic_exposure_modes_are_passed_through() {
        let settings = CameraSettings {
            exposure_mode: ExposureMode::Long,
            ..Default::default()
        };
        let args = still_args(&settings, &request("a.jpg".into()), None);
        let at = args.iter().position(|a| a == "--exposure").unwrap();
        assert_eq!(args[at + 1], "long");
        assert!(!args.iter().any(|a| a == "--post-process-file"));
    }

    #[test]
    fn annotation_stage_draws_yellow_text() {
        let stage = annotate_stage(&Annotation {
            text: "50% cloud".into(),
            colour: TextColour::Yellow,
            size: 22,
        });
        let params = &stage["annotate_cv"];
        assert_eq!(params["text"], "50%% cloud");
        assert_eq!(params["fg"], 226);
        assert_eq!(params["scale"], 1.0);
        assert_eq!(params["thickness"], 1);
    }

    #[tokio::test]
    async fn warm_up_waits_before_the_shot() {
        let dir = tempfile::tempdir().unwrap();
        let mut camera = camera("true", dir.path());
        let mut session = CameraSession::open(&mut camera).unwrap();
        let started = std::time::Instant::now();
        session.warm_up(Duration::from_millis(50)).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn capture_requires_acquire_and_configure() {
        let dir = tempfile::tempdir().unwrap();
        let mut camera = camera("true", dir.path());
        let req = request(dir.path().join("a.jpg"));
        assert!(matches!(
            camera.capture(&req).await,
            Err(CaptureError::NotAcquired)
        ));
        assert!(matches!(
            camera.warm_up(Duration::ZERO).await,
            Err(CaptureError::NotAcquired)
        ));

        let mut session = CameraSession::open(&mut camera).unwrap();
        assert!(matches!(
            session.capture(&req).await,
            Err(CaptureError::NotConfigured)
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn runs_the_program_and_releases_the_lock() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join("cam.lock");
        let mut camera = camera("true", dir.path());
        {
            let mut session = CameraSession::open(&mut camera).unwrap();
            assert!(lock_path.exists());
            session.configure(&CameraSettings::default()).unwrap();
            session.warm_up(Duration::from_millis(10)).await.unwrap();
            session
                .capture(&request(dir.path().join("night").join("a.jpg")))
                .await
                .unwrap();
        }
        assert!(!lock_path.exists());
        assert!(dir.path().join("night").is_dir());
        assert!(camera
            .journal
            .events()
            .iter()
            .any(|e| matches!(e, Event::CameraCommand { line } if line.starts_with("true --nopreview"))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn program_receives_the_annotation_stage() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-still");
        std::fs::write(
            &script,
            "#!/bin/sh\n\
             while [ $# -gt 0 ]; do\n\
               case \"$1\" in\n\
                 --post-process-file) stage=\"$2\"; shift ;;\n\
                 --output) out=\"$2\"; shift ;;\n\
               esac\n\
               shift\n\
             done\n\
             cp \"$stage\" \"$out\"\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let mut camera = camera(script, dir.path());
        let output = dir.path().join("a.jpg");
        {
            let mut session = CameraSession::open(&mut camera).unwrap();
            session.configure(&CameraSettings::default()).unwrap();
            session.capture(&request(output.clone())).await.unwrap();
        }

        let stage: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(stage["annotate_cv"]["text"], "2016-01-11 23:45:00");
        assert_eq!(stage["annotate_cv"]["fg"], 226);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_program_is_a_backend_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut camera = camera("false", dir.path());
        let mut session = CameraSession::open(&mut camera).unwrap();
        session.configure(&CameraSettings::default()).unwrap();
        let result = session.capture(&request(dir.path().join("a.jpg"))).await;
        assert!(matches!(result, Err(CaptureError::Backend { .. })));
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut camera = camera(dir.path().join("no-such-camera-program"), dir.path());
        let mut session = CameraSession::open(&mut camera).unwrap();
        session.configure(&CameraSettings::default()).unwrap();
        let result = session.capture(&request(dir.path().join("a.jpg"))).await;
        assert!(matches!(result, Err(CaptureError::Spawn { .. })));
    }
}
