//! Operating modes of the light engine firmware.

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

/// Operating mode byte understood by the light engine firmware.
///
/// The discriminants are the on-wire values; note that 2 and 3 are not
/// assigned by the firmware.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, EnumIter, PartialEq, Eq)]
pub enum Mode {
    /// Play the animated effect selected by the frame's function index.
    Effect = 0,
    /// Steady output of the current color and brightness.
    SteadyOn = 1,
    /// Sound-activated output driven by the built-in microphone.
    SoundActivated = 4,
}

impl Mode {
    /// Look up a mode from its wire value.
    ///
    /// # Examples
    ///
    /// ```
    /// use rgbw_lights_rs::Mode;
    ///
    /// assert_eq!(Mode::create(1), Some(Mode::SteadyOn));
    /// assert_eq!(Mode::create(2), None);
    /// ```
    pub fn create(value: u8) -> Option<Self> {
        Mode::iter().find(|mode| *mode as u8 == value)
    }

    /// The on-wire byte for this mode.
    pub fn id(&self) -> u8 {
        *self as u8
    }
}
