//! Transport abstraction over the BLE link layer.
//!
//! The crate never talks to a radio directly. Scanning and link operations
//! are injected through the [`Transport`] trait pair, which keeps the
//! discovery and connection logic testable with an in-memory double and
//! independent of any particular BLE stack.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use uuid::Uuid;

use crate::errors::Error;

type Result<T> = std::result::Result<T, Error>;

/// GATT service advertised by every compatible light engine.
pub const SERVICE_UUID: Uuid = Uuid::from_u128(0x0000ffb0_0000_1000_8000_00805f9b34fb);

/// Characteristic on [`SERVICE_UUID`] that accepts command frames.
pub const CHARACTERISTIC_UUID: Uuid = Uuid::from_u128(0x0000ffb1_0000_1000_8000_00805f9b34fb);

/// One advertisement delivered by the scanner during discovery.
#[derive(Debug, Clone)]
pub struct Advertisement<D> {
    /// Link-layer address of the advertiser, e.g. `"A4:C1:38:0A:1B:2C"`.
    pub address: String,
    /// Service UUIDs carried in the advertisement packet.
    pub services: Vec<Uuid>,
    /// Opaque reference used to connect to the advertiser later.
    pub device: D,
}

impl<D> Advertisement<D> {
    /// Whether this advertiser claims the light engine control service.
    pub fn is_light_engine(&self) -> bool {
        self.services.contains(&SERVICE_UUID)
    }
}

/// Live link state shared between a transport's connection callback and the
/// handle that owns the connection.
///
/// The transport side is the only writer; everything else reads. A single
/// atomic boolean is used so observers never see a torn state.
#[derive(Debug, Clone, Default)]
pub struct ConnectionFlag(Arc<AtomicBool>);

impl ConnectionFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called by the transport's connection callback on link up/down.
    pub fn set_up(&self, up: bool) {
        self.0.store(up, Ordering::SeqCst);
    }

    /// Whether the underlying link is currently up.
    pub fn is_up(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Factory for the scanner and per-connection clients of one BLE stack.
pub trait Transport: Send + Sync {
    /// Opaque reference to an advertiser, produced by the scanner and
    /// consumed by [`TransportClient::connect_link`].
    type DeviceRef: Clone + Send + Sync;
    type Scanner: TransportScanner<DeviceRef = Self::DeviceRef> + Send;
    type Client: TransportClient<DeviceRef = Self::DeviceRef> + Send;

    /// Obtain the advertisement scanner.
    fn scanner(&self) -> Result<Self::Scanner>;

    /// Create a fresh link client whose connection callback writes `link`.
    fn create_client(&self, link: ConnectionFlag) -> Result<Self::Client>;
}

/// Advertisement scanning primitives.
pub trait TransportScanner {
    type DeviceRef;

    /// Begin a scan window of the given duration; `active` requests active
    /// scanning (scan requests, not just passive listening).
    fn start_scan(&mut self, duration: Duration, active: bool)
    -> impl Future<Output = Result<()>> + Send;

    /// Next advertisement, or `None` once the scan window has closed.
    ///
    /// May stay pending arbitrarily long while the air is quiet; callers
    /// bound the wait themselves.
    fn next_advertisement(
        &mut self,
    ) -> impl Future<Output = Result<Option<Advertisement<Self::DeviceRef>>>> + Send;

    /// Stop the scan before its window closes.
    fn stop_scan(&mut self) -> impl Future<Output = Result<()>> + Send;
}

/// Link-layer client for a single connection.
pub trait TransportClient {
    type DeviceRef;

    /// Attempt to establish the link. Returns `false` on a (transient)
    /// connect failure; the transport's own timeout bounds the wait.
    fn connect_link(&mut self, device: &Self::DeviceRef)
    -> impl Future<Output = Result<bool>> + Send;

    /// Tear the link down.
    fn disconnect_link(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Whether the connected peer exposes the given GATT service.
    fn has_service(&mut self, service: Uuid) -> impl Future<Output = Result<bool>> + Send;

    /// Whether the located service exposes the given characteristic.
    fn has_characteristic(
        &mut self,
        characteristic: Uuid,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// Write a full command frame to the control characteristic.
    fn write_characteristic(&mut self, bytes: &[u8]) -> impl Future<Output = Result<()>> + Send;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_flag_is_shared() {
        let flag = ConnectionFlag::new();
        let observer = flag.clone();
        assert!(!observer.is_up());
        flag.set_up(true);
        assert!(observer.is_up());
    }

    #[test]
    fn test_advertisement_service_match() {
        let adv = Advertisement {
            address: "A1:B2:C3:D4:E5:F6".to_string(),
            services: vec![SERVICE_UUID],
            device: (),
        };
        assert!(adv.is_light_engine());

        let other = Advertisement {
            address: "A1:B2:C3:D4:E5:F7".to_string(),
            services: vec![Uuid::from_u128(0x1234)],
            device: (),
        };
        assert!(!other.is_light_engine());
    }
}
