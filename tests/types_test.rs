//! Tests for camera-session value types and configuration

use camera_session::config::SessionConfig;
use camera_session::types::{
    ArtifactId, CodeRecord, FlashMode, Point, Position, Rect, ResolutionPreset, Rotation,
    VideoOrientation,
};
use std::time::Duration;

#[cfg(test)]
mod position_tests {
    use super::*;

    #[test]
    fn test_position_as_str() {
        assert_eq!(Position::Front.as_str(), "front");
        assert_eq!(Position::Back.as_str(), "back");
    }

    #[test]
    fn test_position_serialization() {
        let json = serde_json::to_string(&Position::Front).unwrap();
        assert_eq!(json, "\"front\"");
        let back: Position = serde_json::from_str("\"back\"").unwrap();
        assert_eq!(back, Position::Back);
    }
}

#[cfg(test)]
mod capture_type_tests {
    use super::*;

    #[test]
    fn test_flash_mode_default_is_off() {
        assert_eq!(FlashMode::default(), FlashMode::Off);
        assert_eq!(serde_json::to_string(&FlashMode::Auto).unwrap(), "\"auto\"");
    }

    #[test]
    fn test_fixed_presets_have_dimensions() {
        assert_eq!(ResolutionPreset::Hd1920x1080.dimensions(), Some((1920, 1080)));
        assert_eq!(ResolutionPreset::Vga640x480.dimensions(), Some((640, 480)));
        assert_eq!(ResolutionPreset::High.dimensions(), None);
    }

    #[test]
    fn test_orientation_angles() {
        assert_eq!(VideoOrientation::default(), VideoOrientation::Portrait);
        assert_eq!(VideoOrientation::LandscapeRight.degrees(), 90);
        assert_eq!(VideoOrientation::PortraitUpsideDown.degrees(), 180);
        assert_eq!(VideoOrientation::LandscapeLeft.degrees(), 270);
        assert_eq!(Rotation::from_degrees(180).degrees(), 180);
    }

    #[test]
    fn test_code_record_serialization() {
        let code = CodeRecord {
            symbology: "ean13".to_string(),
            payload: "4006381333931".to_string(),
            bounds: Rect {
                x: 0.1,
                y: 0.2,
                width: 0.3,
                height: 0.1,
            },
        };
        let json = serde_json::to_string(&code).unwrap();
        let parsed: CodeRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, code);
        assert!(json.contains("4006381333931"));
    }

    #[test]
    fn test_artifact_ids_are_unique() {
        let first = ArtifactId::generate();
        let second = ArtifactId::generate();
        assert_ne!(first, second);
        assert_eq!(first.to_string(), first.0);
    }

    #[test]
    fn test_point_center() {
        assert_eq!(Point::center(), Point::new(0.5, 0.5));
        assert_eq!(Point::default(), Point::new(0.0, 0.0));
    }
}

#[cfg(test)]
mod config_tests {
    use super::*;

    #[test]
    fn test_default_matches_standard() {
        let config = SessionConfig::default();
        assert_eq!(config, SessionConfig::standard());
        assert_eq!(config.position, Position::Back);
        assert_eq!(config.settle_delay(), Duration::from_millis(500));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = SessionConfig::from_toml_str("position = \"front\"\naudio_enabled = true\n")
            .unwrap();
        assert_eq!(config.position, Position::Front);
        assert!(config.audio_enabled);
        assert_eq!(config.preset, ResolutionPreset::High);
        assert!(config.photo_enabled);
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("camera-session.toml");
        let config = SessionConfig::standard()
            .with_preset(ResolutionPreset::Hd1280x720)
            .with_metadata(true)
            .with_settle_delay(Duration::from_millis(250));

        config.save_to_file(&path).unwrap();
        assert_eq!(SessionConfig::load_from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_settle_delay_bounds() {
        let too_long = SessionConfig::standard().with_settle_delay(Duration::from_secs(60));
        assert!(too_long.validate().is_err());
        let zero = SessionConfig::standard().with_settle_delay(Duration::ZERO);
        assert!(zero.validate().is_err());
    }
}
