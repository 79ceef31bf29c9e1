//! # rgbw_lights_rs
//!
//! An async Rust library for controlling BLE RGBW fiber-optic light engines.
//!
//! This crate discovers light engine peripherals over a BLE scan, tracks
//! per-device connection health with automatic backoff-based recovery, and
//! translates high-level light commands (power, color, brightness, animated
//! effects, twinkle, sound-activated mode) into the fixed 20-byte command
//! frame the engine firmware understands.
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::time::Duration;
//! use rgbw_lights_rs::{ColorRgbw, FleetManager};
//!
//! async fn run(transport: std::sync::Arc<impl rgbw_lights_rs::Transport>) {
//!     let mut fleet = FleetManager::new(transport);
//!
//!     // Scan for up to four engines, ten seconds max.
//!     fleet.start(4, Duration::from_secs(10)).await.unwrap();
//!
//!     // Engines are addressed by discovery index, ordered by BLE address.
//!     if let Some(light) = fleet.light_mut(0) {
//!         light.set_color_brightness_power(80, ColorRgbw::rgb(255, 0, 0), true).await;
//!     }
//!
//!     // Drive reconnection from a once-per-second tick.
//!     loop {
//!         tokio::time::sleep(Duration::from_secs(1)).await;
//!         fleet.tick().await;
//!     }
//! }
//! ```
//!
//! ## Features
//!
//! - **Discovery**: timed BLE scan with deterministic, address-sorted
//!   results via [`discover_lights`]
//! - **Connection health**: fleet-wide escalating backoff and per-handle
//!   retry caps driven by [`FleetManager::tick`]
//! - **RGBW Colors**: four independent channels with [`ColorRgbw`]
//! - **Effects**: animated effect selection and speed with
//!   [`Light::set_effect`]
//! - **Twinkle & Music Mode**: the engine's extra sub-modes, exposed as
//!   independent toggles
//! - **Pluggable transport**: BLE stack injected through the
//!   [`Transport`] trait pair, testable with an in-memory double
//!
//! ## Communication
//!
//! Each engine is driven by writing the complete 20-byte state frame to a
//! fixed GATT characteristic ([`transport::CHARACTERISTIC_UUID`]) on a fixed
//! service ([`transport::SERVICE_UUID`]). The peripheral keeps no state
//! between writes, so the locally owned [`Frame`] is the source of truth and
//! is replayed in full after every reconnection.

mod discovery;
mod errors;
mod fleet;
mod frame;
mod light;
mod status;
pub mod transport;
mod types;

// Re-export public API
pub use discovery::discover_lights;
pub use errors::Error;
pub use fleet::{FailureCallback, FleetManager, MAX_RETRIES};
pub use frame::{FRAME_LEN, Frame};
pub use light::{Light, LinkState};
pub use status::EngineStatus;
pub use transport::{Advertisement, ConnectionFlag, Transport, TransportClient, TransportScanner};
pub use types::{ColorRgbw, Mode};
