use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, TimeZone};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

/// Frames per second as an exact fraction, e.g. `1/6`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct FrameRate {
    numerator: u32,
    denominator: u32,
}

impl FrameRate {
    pub fn new(numerator: u32, denominator: u32) -> Option<Self> {
        (numerator > 0 && denominator > 0).then_some(Self {
            numerator,
            denominator,
        })
    }

    pub fn as_f64(&self) -> f64 {
        f64::from(self.numerator) / f64::from(self.denominator)
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.denominator == 1 {
            write!(f, "{}", self.numerator)
        } else {
            write!(f, "{}/{}", self.numerator, self.denominator)
        }
    }
}

impl FromStr for FrameRate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (num, den) = match s.split_once('/') {
            Some((num, den)) => (num.trim(), den.trim()),
            None => (s.trim(), "1"),
        };
        let parse = |part: &str| {
            part.parse::<u32>()
                .map_err(|e| format!("invalid frame rate {s:?}: {e}"))
        };
        Self::new(parse(num)?, parse(den)?)
            .ok_or_else(|| format!("invalid frame rate {s:?}: must be positive"))
    }
}

impl TryFrom<String> for FrameRate {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExposureMode {
    /// Manual exposure: shutter and gain stay where they were set.
    #[default]
    Off,
    Normal,
    Sport,
    Long,
}

impl fmt::Display for ExposureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExposureMode::Off => "off",
            ExposureMode::Normal => "normal",
            ExposureMode::Sport => "sport",
            ExposureMode::Long => "long",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub resolution: Resolution,
    pub framerate: FrameRate,
    pub shutter_us: u64,
    pub iso: u32,
    pub exposure_mode: ExposureMode,
    /// Time given to auto white balance before the shot.
    #[serde(with = "crate::utils::duration_str")]
    pub warm_up: Duration,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            resolution: Resolution {
                width: 1280,
                height: 720,
            },
            framerate: FrameRate {
                numerator: 1,
                denominator: 6,
            },
            shutter_us: 6_000_000,
            iso: 800,
            exposure_mode: ExposureMode::Off,
            warm_up: Duration::from_secs(10),
        }
    }
}

/// Where images go and how they are named.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FileNaming {
    pub dir: PathBuf,
    pub prefix: String,
    /// `strftime` pattern, rendered in local time.
    pub timestamp_format: String,
}

impl Default for FileNaming {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            prefix: "ESKAuroraCam".to_string(),
            timestamp_format: "%Y-%m-%-d%-H-%M-%S".to_string(),
        }
    }
}

impl FileNaming {
    pub fn path_for<Tz: TimeZone>(&self, stamp: &DateTime<Tz>) -> PathBuf
    where
        Tz::Offset: fmt::Display,
    {
        self.dir.join(format!(
            "{}{}.jpg",
            self.prefix,
            stamp.format(&self.timestamp_format)
        ))
    }
}

/// Named text colours for the on-frame timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextColour {
    White,
    #[default]
    Yellow,
    Cyan,
    Green,
    Red,
    Blue,
    Black,
}

impl TextColour {
    fn rgb(self) -> (u32, u32, u32) {
        match self {
            TextColour::White => (255, 255, 255),
            TextColour::Yellow => (255, 255, 0),
            TextColour::Cyan => (0, 255, 255),
            TextColour::Green => (0, 255, 0),
            TextColour::Red => (255, 0, 0),
            TextColour::Blue => (0, 0, 255),
            TextColour::Black => (0, 0, 0),
        }
    }

    /// BT.601 brightness. The overlay is drawn on the luma plane, so this is
    /// all of the colour that survives.
    pub fn luma(self) -> u8 {
        let (r, g, b) = self.rgb();
        let y = (299 * r + 587 * g + 114 * b + 500) / 1000;
        u8::try_from(y).unwrap_or(u8::MAX)
    }
}

impl fmt::Display for TextColour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TextColour::White => "white",
            TextColour::Yellow => "yellow",
            TextColour::Cyan => "cyan",
            TextColour::Green => "green",
            TextColour::Red => "red",
            TextColour::Blue => "blue",
            TextColour::Black => "black",
        };
        f.write_str(name)
    }
}

/// How the timestamp drawn on each frame looks.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnnotationStyle {
    /// `strftime` pattern, rendered in local time.
    pub format: String,
    pub colour: TextColour,
    /// Text height in pixels.
    pub size: u32,
}

impl Default for AnnotationStyle {
    fn default() -> Self {
        Self {
            format: "%Y-%m-%d %H:%M:%S".to_string(),
            colour: TextColour::Yellow,
            size: 12,
        }
    }
}

/// Text drawn onto the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub text: String,
    pub colour: TextColour,
    pub size: u32,
}

impl Annotation {
    pub fn stamped<Tz: TimeZone>(stamp: &DateTime<Tz>, style: &AnnotationStyle) -> Self
    where
        Tz::Offset: fmt::Display,
    {
        Self {
            text: stamp.format(&style.format).to_string(),
            colour: style.colour,
            size: style.size,
        }
    }
}

/// Everything needed for one shot. Built right before the capture.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureRequest {
    pub settings: CameraSettings,
    pub annotation: Annotation,
    pub path: PathBuf,
}
