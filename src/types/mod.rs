//! Value types for light engine control parameters.

mod color;
mod mode;

pub use color::ColorRgbw;
pub use mode::Mode;
