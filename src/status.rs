//! Light engine status snapshots.

use serde::{Deserialize, Serialize};

use crate::frame::Frame;
use crate::types::{ColorRgbw, Mode};

/// The last state written (or queued) for a light engine, as far as the
/// local frame is aware.
///
/// This is a plain value snapshot intended for host integrations and
/// diagnostics; it carries no connection state.
#[serde_with::skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct EngineStatus {
    pub name: Option<String>,
    pub power: bool,
    pub mode: Mode,
    pub color: ColorRgbw,
    pub brightness: u8,
    /// Twinkle motor speed; 0 while twinkle is disabled.
    pub twinkle_speed: u8,
    /// Microphone sensitivity; 0 outside sound-activated mode.
    pub music_level: u8,
}

impl EngineStatus {
    pub(crate) fn new(frame: &Frame, name: Option<&str>) -> Self {
        EngineStatus {
            name: name.map(String::from),
            power: frame.power(),
            mode: frame.mode(),
            color: frame.color(),
            brightness: frame.brightness(),
            twinkle_speed: frame.twinkle_speed(),
            music_level: frame.music_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_tracks_frame() {
        let mut frame = Frame::new();
        frame.set_color_brightness_power(80, ColorRgbw::rgb(0, 0, 255), true);
        frame.set_twinkle(2);

        let status = EngineStatus::new(&frame, None);
        assert!(status.power);
        assert_eq!(status.brightness, 80);
        assert_eq!(status.color, ColorRgbw::rgb(0, 0, 255));
        assert_eq!(status.twinkle_speed, 2);
        assert_eq!(status.music_level, 0);
    }

    #[test]
    fn test_name_omitted_when_unset() {
        let status = EngineStatus::new(&Frame::new(), None);
        let value = serde_json::to_value(&status).unwrap();
        assert!(value.get("name").is_none());
    }
}
