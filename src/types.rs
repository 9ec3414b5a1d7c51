//! Core value types shared by the facade, the session context and the
//! capture collaborators.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Physical position of a capture device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Front,
    Back,
}

impl Position {
    pub fn opposite(self) -> Self {
        match self {
            Position::Front => Position::Back,
            Position::Back => Position::Front,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Position::Front => "front",
            Position::Back => "back",
        }
    }
}

/// Resolution preset applied to the session when it is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionPreset {
    Photo,
    High,
    Medium,
    Low,
    Vga640x480,
    Hd1280x720,
    Hd1920x1080,
    Uhd3840x2160,
}

impl ResolutionPreset {
    /// Frame dimensions for fixed-size presets.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match self {
            ResolutionPreset::Vga640x480 => Some((640, 480)),
            ResolutionPreset::Hd1280x720 => Some((1280, 720)),
            ResolutionPreset::Hd1920x1080 => Some((1920, 1080)),
            ResolutionPreset::Uhd3840x2160 => Some((3840, 2160)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashMode {
    #[default]
    Off,
    On,
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FocusMode {
    Locked,
    AutoFocus,
    ContinuousAutoFocus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExposureMode {
    Locked,
    AutoExpose,
    ContinuousAutoExposure,
}

/// Normalized point of interest, `(0,0)` top-left to `(1,1)` bottom-right.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn center() -> Self {
        Self::new(0.5, 0.5)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Orientation reported by the capture connection for each frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VideoOrientation {
    #[default]
    Portrait,
    PortraitUpsideDown,
    LandscapeRight,
    LandscapeLeft,
}

impl VideoOrientation {
    pub fn degrees(&self) -> u16 {
        match self {
            VideoOrientation::Portrait => 0,
            VideoOrientation::LandscapeRight => 90,
            VideoOrientation::PortraitUpsideDown => 180,
            VideoOrientation::LandscapeLeft => 270,
        }
    }

    pub(crate) fn to_u8(self) -> u8 {
        match self {
            VideoOrientation::Portrait => 1,
            VideoOrientation::PortraitUpsideDown => 2,
            VideoOrientation::LandscapeRight => 3,
            VideoOrientation::LandscapeLeft => 4,
        }
    }
}

/// Orientation of the hosting UI. Sessions are locked to portrait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UiOrientation {
    #[default]
    Portrait,
}

impl UiOrientation {
    pub fn degrees(&self) -> u16 {
        match self {
            UiOrientation::Portrait => 0,
        }
    }
}

/// Clockwise rotation a sink applies to display a frame upright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rotation {
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn from_degrees(degrees: u16) -> Self {
        match degrees % 360 {
            0..=44 | 315..=359 => Rotation::Deg0,
            45..=134 => Rotation::Deg90,
            135..=224 => Rotation::Deg180,
            _ => Rotation::Deg270,
        }
    }

    pub fn degrees(&self) -> u16 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }
}

/// Opaque pixel buffer handed through to preview sinks. Never inspected here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    pub width: u32,
    pub height: u32,
    pub data: Bytes,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32, data: impl Into<Bytes>) -> Self {
        Self {
            width,
            height,
            data: data.into(),
        }
    }
}

/// Per-frame display hints computed on the delivery context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameHints {
    pub mirrored: bool,
    pub rotation: Rotation,
    pub orientation: VideoOrientation,
}

/// Which preview slot a sink occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SinkKind {
    Node,
    View,
}

/// One decoded machine-readable code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeRecord {
    pub symbology: String,
    pub payload: String,
    pub bounds: Rect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceObservation {
    pub bounds: Rect,
    pub landmarks: Vec<Point>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoResult {
    /// Encoded image, `None` if the capture failed.
    pub data: Option<Bytes>,
    pub orientation: VideoOrientation,
    pub flash_mode: FlashMode,
}

/// Identifier of a finished recording.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactId(pub String);

impl ArtifactId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_opposite() {
        assert_eq!(Position::Front.opposite(), Position::Back);
        assert_eq!(Position::Back.opposite().opposite(), Position::Back);
    }

    #[test]
    fn test_rotation_from_degrees_snaps() {
        assert_eq!(Rotation::from_degrees(0), Rotation::Deg0);
        assert_eq!(Rotation::from_degrees(90), Rotation::Deg90);
        assert_eq!(Rotation::from_degrees(450), Rotation::Deg90);
        assert_eq!(Rotation::from_degrees(270), Rotation::Deg270);
    }

    #[test]
    fn test_orientation_tags_are_distinct() {
        let tags: std::collections::HashSet<u8> = [
            VideoOrientation::Portrait,
            VideoOrientation::PortraitUpsideDown,
            VideoOrientation::LandscapeRight,
            VideoOrientation::LandscapeLeft,
        ]
        .iter()
        .map(|o| o.to_u8())
        .collect();
        assert_eq!(tags.len(), 4);
        assert!(!tags.contains(&0));
    }
}
