//! RGBW color representation.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::errors::Error;

/// An RGBW color: red, green, blue, and a dedicated white channel (0-255 each).
///
/// The light engines drive the white channel independently of the RGB
/// channels; effect playback forces it to full intensity.
#[derive(Default, Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct ColorRgbw {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub white: u8,
}

impl ColorRgbw {
    /// Create a color with the given channel values.
    pub fn new(red: u8, green: u8, blue: u8, white: u8) -> Self {
        Self {
            red,
            green,
            blue,
            white,
        }
    }

    /// Create an RGB color with the white channel off.
    ///
    /// # Examples
    ///
    /// ```
    /// use rgbw_lights_rs::ColorRgbw;
    ///
    /// let red = ColorRgbw::rgb(255, 0, 0);
    /// assert_eq!(red.white, 0);
    /// ```
    pub fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self::new(red, green, blue, 0)
    }
}

impl FromStr for ColorRgbw {
    type Err = Error;

    /// Parse from a comma-separated string (e.g., "255,128,0,0").
    ///
    /// # Examples
    ///
    /// ```
    /// use std::str::FromStr;
    /// use rgbw_lights_rs::ColorRgbw;
    ///
    /// let color = ColorRgbw::from_str("255,128,0,32").unwrap();
    /// assert_eq!(color, ColorRgbw::new(255, 128, 0, 32));
    /// assert!(ColorRgbw::from_str("255,128").is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Error> {
        let parts: Vec<u8> = s
            .split(',')
            .map(|c| c.trim().parse().unwrap_or(0))
            .collect();
        if parts.len() == 4 {
            Ok(Self::new(parts[0], parts[1], parts[2], parts[3]))
        } else {
            Err(Error::InvalidColorString(format!(
                "expected r,g,b,w but got {s:?}"
            )))
        }
    }
}
