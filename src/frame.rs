//! The fixed 20-byte command frame written to a light engine.
//!
//! The peripheral firmware keeps no state of its own between writes: every
//! write carries the complete desired state of the engine. [`Frame`] is the
//! locally owned source of truth for that state, and [`Frame::encode`]
//! produces the exact byte image the characteristic expects.

use crate::errors::Error;
use crate::types::{ColorRgbw, Mode};

/// Total on-wire size of a command frame.
pub const FRAME_LEN: usize = 20;

/// Constant marker byte opening every frame.
const HEADER: u8 = 0xA5;

/// Constant trailer closing every frame.
const FOOTER: [u8; 5] = [0xFF, 0x00, 0x05, 0x00, 0xAA];

/// Marker pair written while the engine is in sound-activated mode.
const MUSIC_MARKER_ACTIVE: [u8; 2] = [0xFF, 0x13];

const BRIGHTNESS_MIN: u8 = 0x01;
const BRIGHTNESS_MAX: u8 = 0x64;
const FUNCTION_SPEED_MAX: u8 = 10;
const TWINKLE_SPEED_MIN: u8 = 1;
const TWINKLE_SPEED_MAX: u8 = 4;
const MIC_SENSITIVITY_MIN: u8 = 1;
const MIC_SENSITIVITY_MAX: u8 = 9;

/// The complete desired state of one light engine.
///
/// All setters clamp out-of-range inputs to the nearest valid bound rather
/// than failing; an out-of-range value is defined behavior, not an error.
///
/// # Examples
///
/// ```
/// use rgbw_lights_rs::{ColorRgbw, Frame};
///
/// let mut frame = Frame::new();
/// frame.set_color_brightness_power(150, ColorRgbw::rgb(255, 0, 0), true);
/// assert_eq!(frame.brightness(), 100); // clamped
/// assert_eq!(frame.encode()[1], 0xFF); // power byte
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    power: bool,
    mode: Mode,
    function: u8,
    function_speed: u8,
    color: ColorRgbw,
    brightness: u8,
    music_active: bool,
    mic_sensitivity: u8,
    twinkle: bool,
    twinkle_speed: u8,
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

impl Frame {
    /// Create a frame holding the power-on defaults the firmware expects:
    /// off, steady mode, full-brightness white.
    pub fn new() -> Self {
        Frame {
            power: false,
            mode: Mode::SteadyOn,
            function: 0,
            function_speed: 8,
            color: ColorRgbw::new(0xFF, 0xFF, 0xFF, 0x00),
            brightness: BRIGHTNESS_MAX,
            music_active: false,
            mic_sensitivity: MIC_SENSITIVITY_MAX,
            twinkle: false,
            twinkle_speed: TWINKLE_SPEED_MIN,
        }
    }

    pub fn power(&self) -> bool {
        self.power
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Zero-based effect index; meaningful only in [`Mode::Effect`].
    pub fn function(&self) -> u8 {
        self.function
    }

    pub fn function_speed(&self) -> u8 {
        self.function_speed
    }

    pub fn color(&self) -> ColorRgbw {
        self.color
    }

    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    /// Twinkle motor speed, or 0 when twinkle is disabled.
    pub fn twinkle_speed(&self) -> u8 {
        if self.twinkle { self.twinkle_speed } else { 0 }
    }

    /// Microphone sensitivity, or 0 outside sound-activated mode.
    pub fn music_level(&self) -> u8 {
        if self.mode == Mode::SoundActivated {
            self.mic_sensitivity
        } else {
            0
        }
    }

    /// Set the power flag without touching any other field.
    pub fn set_power(&mut self, on: bool) {
        self.power = on;
    }

    /// Atomically update color, brightness, and power.
    ///
    /// This is the single entry point a host integration needs for ordinary
    /// state writes. Brightness is clamped to 1..=100; 0 is never encoded.
    pub fn set_color_brightness_power(&mut self, brightness: u8, color: ColorRgbw, power: bool) {
        self.brightness = brightness.clamp(BRIGHTNESS_MIN, BRIGHTNESS_MAX);
        self.color = color;
        self.power = power;
    }

    /// Set the color channels without touching brightness or power.
    pub fn set_color(&mut self, color: ColorRgbw) {
        self.color = color;
    }

    /// Set brightness, clamped to 1..=100.
    pub fn set_brightness(&mut self, brightness: u8) {
        self.brightness = brightness.clamp(BRIGHTNESS_MIN, BRIGHTNESS_MAX);
    }

    /// Select an animated effect by its one-based index, or return to steady
    /// output with `index` 0.
    ///
    /// Effect playback always drives the white channel at full intensity;
    /// the firmware ignores effects on a dark white channel, so the channel
    /// is forced to 255 here. `speed` is clamped to 0..=10.
    pub fn set_effect(&mut self, index: u8, speed: u8) {
        if index == 0 {
            self.mode = Mode::SteadyOn;
            self.function = 0;
        } else {
            self.mode = Mode::Effect;
            self.function = index - 1;
            self.color.white = 0xFF;
        }
        self.function_speed = speed.min(FUNCTION_SPEED_MAX);
    }

    /// Enable twinkle at the given motor speed (clamped to 1..=4), or
    /// disable it with `speed` 0.
    pub fn set_twinkle(&mut self, speed: u8) {
        if speed == 0 {
            self.twinkle = false;
        } else {
            self.twinkle = true;
            self.twinkle_speed = speed.clamp(TWINKLE_SPEED_MIN, TWINKLE_SPEED_MAX);
        }
    }

    /// Enable sound-activated mode with the given microphone sensitivity
    /// (clamped to 1..=9), or return to steady output with `level` 0.
    ///
    /// The two marker bytes are always written as a unit: active together
    /// with the mode, cleared together when the mode is left.
    pub fn set_music_mode(&mut self, level: u8) {
        if level == 0 {
            self.mode = Mode::SteadyOn;
            self.music_active = false;
        } else {
            self.mode = Mode::SoundActivated;
            self.mic_sensitivity = level.clamp(MIC_SENSITIVITY_MIN, MIC_SENSITIVITY_MAX);
            self.music_active = true;
        }
    }

    /// Produce the exact byte image written to the control characteristic.
    ///
    /// The layout is a contiguous sequence with no padding:
    /// header, power, mode, function, function speed, r, g, b, w,
    /// brightness, music marker pair, mic sensitivity, twinkle flag,
    /// twinkle speed, footer.
    pub fn encode(&self) -> [u8; FRAME_LEN] {
        let mut bytes = [0u8; FRAME_LEN];
        bytes[0] = HEADER;
        bytes[1] = if self.power { 0xFF } else { 0x00 };
        bytes[2] = self.mode.id();
        bytes[3] = self.function;
        bytes[4] = self.function_speed;
        bytes[5] = self.color.red;
        bytes[6] = self.color.green;
        bytes[7] = self.color.blue;
        bytes[8] = self.color.white;
        bytes[9] = self.brightness;
        if self.music_active {
            bytes[10..12].copy_from_slice(&MUSIC_MARKER_ACTIVE);
        }
        bytes[12] = self.mic_sensitivity;
        bytes[13] = if self.twinkle { 0xFF } else { 0x00 };
        bytes[14] = self.twinkle_speed;
        bytes[15..].copy_from_slice(&FOOTER);
        bytes
    }

    /// Decode a frame previously produced by [`Frame::encode`].
    pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() != FRAME_LEN {
            return Err(Error::InvalidFrame(format!(
                "expected {FRAME_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        if bytes[0] != HEADER {
            return Err(Error::InvalidFrame(format!(
                "bad header byte {:#04x}",
                bytes[0]
            )));
        }
        if bytes[15..] != FOOTER {
            return Err(Error::InvalidFrame("bad footer".into()));
        }
        let mode = Mode::create(bytes[2])
            .ok_or_else(|| Error::InvalidFrame(format!("unknown mode byte {:#04x}", bytes[2])))?;
        let music_active = match [bytes[10], bytes[11]] {
            [0x00, 0x00] => false,
            m if m == MUSIC_MARKER_ACTIVE => true,
            m => {
                return Err(Error::InvalidFrame(format!(
                    "bad music marker {:#04x} {:#04x}",
                    m[0], m[1]
                )));
            }
        };
        Ok(Frame {
            power: bytes[1] != 0,
            mode,
            function: bytes[3],
            function_speed: bytes[4],
            color: ColorRgbw::new(bytes[5], bytes[6], bytes[7], bytes[8]),
            brightness: bytes[9],
            music_active,
            mic_sensitivity: bytes[12],
            twinkle: bytes[13] != 0,
            twinkle_speed: bytes[14],
        })
    }
}
